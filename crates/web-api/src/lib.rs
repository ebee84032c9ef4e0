//! Web API 层。
//!
//! 提供 Axum 路由，将 HTTP / WebSocket 请求委托给应用层的目录、消息存储与投递引擎。

mod error;
mod extract;
mod routes;
mod state;
mod ws_connection;

pub use error::{ApiError, ErrorBody};
pub use routes::router;
pub use state::AppState;
