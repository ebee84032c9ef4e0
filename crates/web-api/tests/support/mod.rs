#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use application::{ChatServices, ChatServicesDependencies, SystemClock};
use axum::Router;
use infrastructure::Infrastructure;
use tokio::{net::TcpListener, sync::oneshot, time::sleep};
use web_api::{router, AppState};

pub fn build_services() -> ChatServices {
    let infra = Infrastructure::in_memory();
    ChatServices::new(ChatServicesDependencies {
        user_repository: infra.user_repository(),
        room_repository: infra.room_repository(),
        message_repository: infra.message_repository(),
        clock: Arc::new(SystemClock),
    })
}

pub fn build_router() -> Router {
    router(AppState::new(build_services()))
}

/// 绑定随机端口启动真实服务，返回地址与关闭开关。
pub async fn spawn_server() -> (SocketAddr, oneshot::Sender<()>) {
    let router = build_router();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    // allow server to start
    sleep(Duration::from_millis(100)).await;
    (addr, shutdown_tx)
}
