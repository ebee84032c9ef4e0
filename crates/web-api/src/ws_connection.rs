use application::EventReceiver;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use domain::{ClientEvent, ConnectionId, ServerEvent, UserId};
use futures_util::{SinkExt, StreamExt};

use crate::state::AppState;

const MALFORMED_FRAME_MESSAGE: &str = "Evento inválido.";

/// 单个 WebSocket 连接
///
/// 连接建立时在会话注册表中登记，出站事件来自会话的专属通道；
/// 任一方向结束即视为断开，会话随之移除。
pub struct WebSocketConnection {
    state: AppState,
    connection_id: ConnectionId,
    events: EventReceiver,
}

impl WebSocketConnection {
    /// 登记新会话。升级请求里带了 `userId` 时立即声明身份。
    pub async fn open(state: AppState, claimed: Option<UserId>) -> Self {
        let (session, events) = state.delivery.connect().await;
        let connection_id = session.connection_id;

        if let Some(user_id) = claimed {
            if let Err(err) = state.delivery.identify(connection_id, user_id).await {
                state.delivery.reject(connection_id, &err).await;
            }
        }

        Self {
            state,
            connection_id,
            events,
        }
    }

    pub async fn run(self, socket: WebSocket) {
        let Self {
            state,
            connection_id,
            mut events,
        } = self;
        let (mut sender, mut incoming) = socket.split();

        // 发送任务：会话通道关闭（断开或被回收）时结束
        let mut send_task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let payload = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to serialize websocket payload");
                        continue;
                    }
                };
                if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            let _ = sender.send(WsMessage::Close(None)).await;
        });

        let mut recv_task = {
            let state = state.clone();
            tokio::spawn(async move {
                while let Some(Ok(message)) = incoming.next().await {
                    match message {
                        WsMessage::Text(text) => {
                            handle_text(&state, connection_id, text.as_str()).await;
                        }
                        WsMessage::Binary(_) => {
                            state
                                .sessions
                                .send_to(connection_id, ServerEvent::error(MALFORMED_FRAME_MESSAGE))
                                .await;
                        }
                        WsMessage::Close(_) => break,
                        WsMessage::Ping(_) | WsMessage::Pong(_) => {
                            state.sessions.touch(connection_id, state.clock.now()).await;
                        }
                    }
                }
            })
        };

        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }

        state.delivery.disconnect(connection_id).await;
    }
}

async fn handle_text(state: &AppState, connection_id: ConnectionId, text: &str) {
    state.sessions.touch(connection_id, state.clock.now()).await;

    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(err) => {
            tracing::debug!(
                connection_id = %connection_id,
                error = %err,
                "malformed websocket frame"
            );
            state
                .sessions
                .send_to(connection_id, ServerEvent::error(MALFORMED_FRAME_MESSAGE))
                .await;
            return;
        }
    };

    match event.into_command() {
        Ok(command) => state.delivery.handle(connection_id, command).await,
        Err(err) => state.delivery.reject(connection_id, &err.into()).await,
    }
}
