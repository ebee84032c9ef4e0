use std::collections::HashMap;
use std::sync::Arc;

use domain::{
    ChatRoomRepository, DomainError, Message, MessageBody, MessageRepository, MessageTarget,
    NewMessage, RepositoryResult, RoomId, UserId, UserRepository, UNKNOWN_SENDER_LOGIN,
};

use crate::{clock::Clock, error::ApplicationError, write_gate::WriteGate};

#[derive(Debug, Clone)]
pub struct AppendRoomMessageRequest {
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct AppendDirectMessageRequest {
    pub receiver_id: UserId,
    pub sender_id: UserId,
    pub body: String,
}

/// 只追加的消息日志，附带历史查询。
pub struct MessageStore {
    messages: Arc<dyn MessageRepository>,
    users: Arc<dyn UserRepository>,
    rooms: Arc<dyn ChatRoomRepository>,
    clock: Arc<dyn Clock>,
    gate: WriteGate,
}

impl MessageStore {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        users: Arc<dyn UserRepository>,
        rooms: Arc<dyn ChatRoomRepository>,
        clock: Arc<dyn Clock>,
        gate: WriteGate,
    ) -> Self {
        Self {
            messages,
            users,
            rooms,
            clock,
            gate,
        }
    }

    pub async fn append_room_message(
        &self,
        request: AppendRoomMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let body = MessageBody::new(request.body)?;
        let _guard = self.gate.enter().await;

        if self.rooms.find_by_id(request.room_id).await?.is_none() {
            return Err(DomainError::RoomNotFound.into());
        }
        self.append(
            request.sender_id,
            MessageTarget::Room(request.room_id),
            body,
        )
        .await
    }

    pub async fn append_direct_message(
        &self,
        request: AppendDirectMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let body = MessageBody::new(request.body)?;
        let _guard = self.gate.enter().await;

        if self.users.find_by_id(request.receiver_id).await?.is_none() {
            return Err(DomainError::UserNotFound.into());
        }
        self.append(
            request.sender_id,
            MessageTarget::Direct(request.receiver_id),
            body,
        )
        .await
    }

    /// 房间历史，按追加顺序。存储故障时返回空序列。
    pub async fn room_history(&self, room_id: RoomId) -> Vec<Message> {
        let messages = self.messages.list_room(room_id).await;
        self.enrich(messages, "room").await
    }

    /// 该用户发出或收到的私信，按追加顺序。
    pub async fn direct_history(&self, user_id: UserId) -> Vec<Message> {
        let messages = self.messages.list_direct(user_id).await;
        self.enrich(messages, "direct").await
    }

    // 调用方必须持有写入门
    async fn append(
        &self,
        sender_id: UserId,
        target: MessageTarget,
        body: MessageBody,
    ) -> Result<Message, ApplicationError> {
        let sender = self
            .users
            .find_by_id(sender_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        let message = self
            .messages
            .append(NewMessage {
                sender_id,
                sender_login: sender.login,
                target,
                body,
                timestamp: self.clock.now(),
            })
            .await?;

        tracing::debug!(
            message_id = %message.id,
            sender_id = %sender_id,
            kind = ?message.kind,
            "message appended"
        );
        Ok(message)
    }

    /// 以当前用户目录解析发送者登录名，无法解析时使用 "Desconhecido"。
    async fn enrich(
        &self,
        messages: RepositoryResult<Vec<Message>>,
        history: &str,
    ) -> Vec<Message> {
        let mut messages = match messages {
            Ok(messages) => messages,
            Err(err) => {
                tracing::error!(history, error = %err, "failed to read message history");
                return Vec::new();
            }
        };

        let mut logins: HashMap<UserId, String> = HashMap::new();
        for message in &mut messages {
            if let Some(login) = logins.get(&message.sender_id) {
                message.sender_login = login.clone();
                continue;
            }

            let login = match self.users.find_by_id(message.sender_id).await {
                Ok(Some(user)) => user.login,
                Ok(None) => UNKNOWN_SENDER_LOGIN.to_owned(),
                Err(err) => {
                    tracing::warn!(
                        sender_id = %message.sender_id,
                        error = %err,
                        "sender lookup failed"
                    );
                    UNKNOWN_SENDER_LOGIN.to_owned()
                }
            };
            logins.insert(message.sender_id, login.clone());
            message.sender_login = login;
        }
        messages
    }
}
