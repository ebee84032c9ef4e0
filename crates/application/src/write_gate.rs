use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

/// 跨集合写操作共用的互斥门
///
/// "先校验房间/用户存在，再写入" 这类跨集合序列必须在门内完成，
/// 否则并发的删除房间可能插在校验和写入之间。
#[derive(Clone, Default)]
pub struct WriteGate(Arc<Mutex<()>>);

impl WriteGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enter(&self) -> MutexGuard<'_, ()> {
        self.0.lock().await
    }
}
