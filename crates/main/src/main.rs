//! 主应用程序入口
//!
//! 加载配置、打开数据文件、启动 Axum HTTP / WebSocket 服务。

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use application::{ChatServices, ChatServicesDependencies, Clock, SystemClock};
use config::AppConfig;
use infrastructure::Infrastructure;
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let infra = Infrastructure::open(&config.storage).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let services = ChatServices::new(ChatServicesDependencies {
        user_repository: infra.user_repository(),
        room_repository: infra.room_repository(),
        message_repository: infra.message_repository(),
        clock: clock.clone(),
    });

    services
        .rooms
        .ensure_default_room()
        .await
        .context("failed to seed default room")?;

    if config.session.reaper_enabled() {
        services.sessions.clone().spawn_reaper(
            clock,
            Duration::from_secs(config.session.idle_timeout_secs),
            Duration::from_secs(config.session.reap_interval_secs),
        );
        tracing::info!(
            idle_timeout_secs = config.session.idle_timeout_secs,
            "idle session reaper started"
        );
    }

    let app = router(AppState::new(services));
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("聊天服务启动在 http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
