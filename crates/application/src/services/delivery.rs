//! 投递引擎
//!
//! 把入站指令落到目录和消息存储上，再把结果扇出给对应的实时会话：
//! 房间消息推送给该房间的全部订阅者（包括发送者自己），私信只推送给身份为接收者的会话。

use std::sync::Arc;

use domain::{
    ChatRoom, ClientCommand, ConnectionId, Message, RoomId, ServerEvent, Session, UserId,
};
use tokio::sync::Mutex;

use crate::{
    clock::Clock,
    error::ApplicationError,
    services::{
        message_store::{AppendDirectMessageRequest, AppendRoomMessageRequest, MessageStore},
        room_directory::RoomDirectory,
        user_directory::UserDirectory,
    },
    session::{EventReceiver, SessionRegistry},
};

const INTERNAL_ERROR_MESSAGE: &str = "Erro interno do servidor.";

/// 一次扇出的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message: Message,
    /// 实际收到事件的会话数
    pub recipients: usize,
}

pub struct DeliveryEngine {
    users: Arc<UserDirectory>,
    rooms: Arc<RoomDirectory>,
    messages: Arc<MessageStore>,
    sessions: Arc<SessionRegistry>,
    clock: Arc<dyn Clock>,
    // 追加与扇出在同一临界区内，保证每个订阅者看到的顺序与追加顺序一致
    fanout: Mutex<()>,
}

impl DeliveryEngine {
    pub fn new(
        users: Arc<UserDirectory>,
        rooms: Arc<RoomDirectory>,
        messages: Arc<MessageStore>,
        sessions: Arc<SessionRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            rooms,
            messages,
            sessions,
            clock,
            fanout: Mutex::new(()),
        }
    }

    pub async fn connect(&self) -> (Session, EventReceiver) {
        let (session, receiver) = self.sessions.connect(self.clock.now()).await;
        tracing::info!(connection_id = %session.connection_id, "client connected");
        (session, receiver)
    }

    /// 显式身份声明。用户必须存在，后一次声明覆盖前一次。
    pub async fn identify(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
    ) -> Result<Session, ApplicationError> {
        self.users.get_by_id(user_id).await?;
        let session = self.sessions.identify(connection_id, user_id).await?;
        self.sessions
            .send_to(connection_id, ServerEvent::identified(user_id))
            .await;
        tracing::info!(connection_id = %connection_id, user_id = %user_id, "client identified");
        Ok(session)
    }

    /// 加入房间并订阅，通知其他订阅者，向发起连接确认。
    pub async fn join_room(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<ChatRoom, ApplicationError> {
        let _fanout = self.fanout.lock().await;
        let room = self
            .rooms
            .join_with_session(connection_id, room_id, user_id)
            .await?;

        let notified = self
            .sessions
            .deliver_to_room(
                room_id,
                ServerEvent::user_joined(room_id, user_id),
                Some(connection_id),
            )
            .await;
        self.sessions
            .send_to(connection_id, ServerEvent::RoomJoined(room.clone()))
            .await;

        tracing::info!(
            connection_id = %connection_id,
            room_id = %room_id,
            user_id = %user_id,
            notified,
            "joined room"
        );
        Ok(room)
    }

    /// 离开房间并取消订阅，通知剩余订阅者。
    pub async fn leave_room(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<ChatRoom, ApplicationError> {
        let _fanout = self.fanout.lock().await;
        let room = self
            .rooms
            .leave_with_session(connection_id, room_id, user_id)
            .await?;

        let notified = self
            .sessions
            .deliver_to_room(room_id, ServerEvent::user_left(room_id, user_id), None)
            .await;
        self.sessions
            .send_to(connection_id, ServerEvent::room_left(room_id))
            .await;

        tracing::info!(
            connection_id = %connection_id,
            room_id = %room_id,
            user_id = %user_id,
            notified,
            "left room"
        );
        Ok(room)
    }

    /// 断开连接只清理实时订阅，不改动房间成员关系，也不发送离开通知。
    pub async fn disconnect(&self, connection_id: ConnectionId) -> Option<Session> {
        let session = self.sessions.disconnect(connection_id).await;
        if let Some(session) = &session {
            tracing::info!(
                connection_id = %connection_id,
                user_id = ?session.user_id,
                subscriptions = session.subscribed_room_ids.len(),
                "client disconnected"
            );
        }
        session
    }

    pub async fn send_room_message(
        &self,
        request: AppendRoomMessageRequest,
    ) -> Result<Delivery, ApplicationError> {
        let _fanout = self.fanout.lock().await;
        let room_id = request.room_id;
        let message = self.messages.append_room_message(request).await?;

        let recipients = self
            .sessions
            .deliver_to_room(room_id, ServerEvent::new_message(message.clone()), None)
            .await;

        tracing::debug!(
            message_id = %message.id,
            room_id = %room_id,
            recipients,
            "room message delivered"
        );
        Ok(Delivery {
            message,
            recipients,
        })
    }

    pub async fn send_direct_message(
        &self,
        request: AppendDirectMessageRequest,
    ) -> Result<Delivery, ApplicationError> {
        let _fanout = self.fanout.lock().await;
        let receiver_id = request.receiver_id;
        let message = self.messages.append_direct_message(request).await?;

        let recipients = self
            .sessions
            .deliver_to_user(receiver_id, ServerEvent::new_message(message.clone()))
            .await;

        tracing::debug!(
            message_id = %message.id,
            receiver_id = %receiver_id,
            recipients,
            "direct message delivered"
        );
        Ok(Delivery {
            message,
            recipients,
        })
    }

    /// 删除房间。订阅者先收到 `roomDeleted`，之后不再收到该房间的消息。
    pub async fn delete_room(&self, room_id: RoomId) -> Result<ChatRoom, ApplicationError> {
        let _fanout = self.fanout.lock().await;
        self.rooms.delete_room(room_id).await
    }

    /// 处理一条已校验的实时指令。
    ///
    /// 成功时以指令携带的用户为连接声明身份；失败时只向发起连接回送 `error` 事件。
    pub async fn handle(&self, connection_id: ConnectionId, command: ClientCommand) {
        let claimed = command.claimed_user();
        let outcome = match command {
            ClientCommand::Identify { user_id } => {
                self.identify(connection_id, user_id).await.map(|_| ())
            }
            ClientCommand::JoinRoom { room_id, user_id } => self
                .join_room(connection_id, room_id, user_id)
                .await
                .map(|_| ()),
            ClientCommand::LeaveRoom { room_id, user_id } => self
                .leave_room(connection_id, room_id, user_id)
                .await
                .map(|_| ()),
            ClientCommand::SendRoomMessage {
                room_id,
                sender_id,
                body,
            } => self
                .send_room_message(AppendRoomMessageRequest {
                    room_id,
                    sender_id,
                    body: body.into_inner(),
                })
                .await
                .map(|_| ()),
            ClientCommand::SendDirectMessage {
                receiver_id,
                sender_id,
                body,
            } => self
                .send_direct_message(AppendDirectMessageRequest {
                    receiver_id,
                    sender_id,
                    body: body.into_inner(),
                })
                .await
                .map(|_| ()),
        };

        match outcome {
            Ok(()) => {
                if let Err(err) = self.sessions.identify(connection_id, claimed).await {
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %err,
                        "identity claim skipped"
                    );
                }
            }
            Err(err) => self.reject(connection_id, &err).await,
        }
    }

    /// 只向发起连接回送错误，不广播。
    pub async fn reject(&self, connection_id: ConnectionId, err: &ApplicationError) {
        let message = match err.kind() {
            Some(_) => err.to_string(),
            None => {
                tracing::error!(connection_id = %connection_id, error = %err, "command failed");
                INTERNAL_ERROR_MESSAGE.to_owned()
            }
        };
        self.sessions
            .send_to(connection_id, ServerEvent::error(message))
            .await;
    }
}
