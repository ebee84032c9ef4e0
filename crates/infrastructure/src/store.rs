//! JSON 文件集合
//!
//! 每个集合在内存中保存全部记录，由一把读写锁守护：读可以并发，写独占。
//! 写入成功后在同一临界区内把快照落盘，读方永远看不到只应用了一半的修改。
//! 落盘失败只记录日志，内存状态仍然是权威数据。
//!
//! 已分配的最大 ID 单独保存在旁路序列文件（`<数据文件>.seq`）中，
//! 删除末尾记录后重启也不会复用其 ID。

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use domain::RepositoryResult;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::RwLock;

/// 可存入集合的记录，需要暴露其数字 ID 以便恢复 ID 序列。
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn record_id(&self) -> u64;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sequence {
    last_id: u64,
}

/// 数据文件对应的序列文件路径。
pub fn sequence_path(path: &Path) -> PathBuf {
    let mut seq = path.as_os_str().to_owned();
    seq.push(".seq");
    PathBuf::from(seq)
}

/// 集合在写锁内的可变视图。
#[derive(Debug)]
pub struct CollectionState<T> {
    records: Vec<T>,
    last_id: u64,
    synced_id: u64,
}

impl<T: Record> CollectionState<T> {
    /// `last_issued` 为序列文件中记录的最大 ID；取它与现存记录最大 ID 中的较大者。
    fn new(records: Vec<T>, last_issued: u64) -> Self {
        let last_id = records
            .iter()
            .map(Record::record_id)
            .max()
            .unwrap_or(0)
            .max(last_issued);
        Self {
            records,
            last_id,
            synced_id: last_issued,
        }
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut Vec<T> {
        &mut self.records
    }

    /// 分配下一个 ID。只在写锁内调用，因此严格递增且不会复用，与集合长度无关。
    pub fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}

pub struct JsonCollection<T> {
    name: &'static str,
    path: Option<PathBuf>,
    state: RwLock<CollectionState<T>>,
}

impl<T: Record> JsonCollection<T> {
    /// 不落盘的集合，用于测试和 `persist = false` 的部署。
    pub fn in_memory(name: &'static str) -> Self {
        Self {
            name,
            path: None,
            state: RwLock::new(CollectionState::new(Vec::new(), 0)),
        }
    }

    /// 打开（必要时创建）JSON 文件。
    ///
    /// 文件不可读或内容损坏时先把原文件改名保留，再以空集合启动，
    /// 后续写入不会覆盖原有数据。
    pub async fn open(name: &'static str, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (records, intact) = match tokio::fs::read(&path).await {
            Ok(bytes) => match parse_records(&bytes) {
                Ok(records) => (records, true),
                Err(err) => {
                    tracing::error!(
                        collection = name,
                        path = %path.display(),
                        error = %err,
                        "data file is corrupt"
                    );
                    (Vec::new(), quarantine(name, &path).await)
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                if let Err(err) = write_atomically(&path, b"[]").await {
                    tracing::error!(
                        collection = name,
                        path = %path.display(),
                        error = %err,
                        "failed to initialize data file"
                    );
                } else {
                    tracing::info!(collection = name, path = %path.display(), "data file created");
                }
                (Vec::new(), true)
            }
            Err(err) => {
                tracing::error!(
                    collection = name,
                    path = %path.display(),
                    error = %err,
                    "failed to read data file"
                );
                (Vec::new(), quarantine(name, &path).await)
            }
        };

        let last_issued = load_sequence(name, &sequence_path(&path)).await;
        tracing::debug!(
            collection = name,
            count = records.len(),
            last_id = last_issued,
            "collection loaded"
        );

        // 原文件无法移走时不再落盘，避免覆盖
        if !intact {
            tracing::error!(
                collection = name,
                path = %path.display(),
                "persistence disabled for collection"
            );
        }

        Self {
            name,
            path: intact.then_some(path),
            state: RwLock::new(CollectionState::new(records, last_issued)),
        }
    }

    pub async fn read<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        let state = self.state.read().await;
        f(state.records())
    }

    /// 串行化的写路径。闭包必须先校验再修改：返回错误时不会落盘。
    pub async fn write<R>(
        &self,
        f: impl FnOnce(&mut CollectionState<T>) -> RepositoryResult<R>,
    ) -> RepositoryResult<R> {
        let mut state = self.state.write().await;
        let result = f(&mut *state)?;
        self.persist(&mut *state).await;
        Ok(result)
    }

    async fn persist(&self, state: &mut CollectionState<T>) {
        let Some(path) = &self.path else {
            return;
        };

        // 序列先于记录落盘：中途失败时序列只会偏大，不会偏小
        if state.last_id > state.synced_id {
            let sequence = Sequence {
                last_id: state.last_id,
            };
            match serde_json::to_vec(&sequence) {
                Ok(bytes) => match write_atomically(&sequence_path(path), &bytes).await {
                    Ok(()) => state.synced_id = state.last_id,
                    Err(err) => {
                        tracing::error!(
                            collection = self.name,
                            error = %err,
                            "failed to write id sequence"
                        )
                    }
                },
                Err(err) => {
                    tracing::error!(
                        collection = self.name,
                        error = %err,
                        "failed to serialize id sequence"
                    )
                }
            }
        }

        let bytes = match serde_json::to_vec_pretty(state.records()) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(
                    collection = self.name,
                    error = %err,
                    "failed to serialize collection"
                );
                return;
            }
        };

        if let Err(err) = write_atomically(path, &bytes).await {
            tracing::error!(
                collection = self.name,
                path = %path.display(),
                error = %err,
                "failed to write data file"
            );
        }
    }
}

fn parse_records<T: Record>(bytes: &[u8]) -> serde_json::Result<Vec<T>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(bytes)
}

/// 读取序列文件；缺失时返回 0，由现存记录决定起点。
async fn load_sequence(name: &str, path: &Path) -> u64 {
    match tokio::fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<Sequence>(&bytes) {
            Ok(sequence) => sequence.last_id,
            Err(err) => {
                tracing::warn!(
                    collection = name,
                    path = %path.display(),
                    error = %err,
                    "id sequence is corrupt, falling back to records"
                );
                quarantine(name, path).await;
                0
            }
        },
        Err(err) if err.kind() == io::ErrorKind::NotFound => 0,
        Err(err) => {
            tracing::warn!(
                collection = name,
                path = %path.display(),
                error = %err,
                "failed to read id sequence, falling back to records"
            );
            0
        }
    }
}

/// 把无法加载的文件改名为 `<文件>.corrupt-<时间戳>` 保留原始内容，成功时返回 `true`。
async fn quarantine(name: &str, path: &Path) -> bool {
    let mut aside = path.as_os_str().to_owned();
    aside.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3f")));
    let aside = PathBuf::from(aside);

    match tokio::fs::rename(path, &aside).await {
        Ok(()) => {
            tracing::warn!(
                collection = name,
                path = %path.display(),
                moved_to = %aside.display(),
                "unreadable file moved aside, starting empty"
            );
            true
        }
        Err(err) => {
            tracing::error!(
                collection = name,
                path = %path.display(),
                error = %err,
                "failed to move unreadable file aside"
            );
            false
        }
    }
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}
