use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{MessageBody, RoomId, UserId};

/// 客户端发来的原始事件帧：`{"event": "...", "data": {...}}`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    Identify(IdentifyPayload),
    JoinRoom(MembershipPayload),
    LeaveRoom(MembershipPayload),
    SendRoomMessage(RoomMessagePayload),
    SendDirectMessage(DirectMessagePayload),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IdentifyPayload {
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MembershipPayload {
    pub room_id: Option<RoomId>,
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoomMessagePayload {
    pub room_id: Option<RoomId>,
    pub sender_id: Option<UserId>,
    pub mensagem: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DirectMessagePayload {
    pub receiver_id: Option<UserId>,
    pub sender_id: Option<UserId>,
    pub mensagem: Option<String>,
}

/// 校验后的入站指令，所有必填字段均已存在。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Identify {
        user_id: UserId,
    },
    JoinRoom {
        room_id: RoomId,
        user_id: UserId,
    },
    LeaveRoom {
        room_id: RoomId,
        user_id: UserId,
    },
    SendRoomMessage {
        room_id: RoomId,
        sender_id: UserId,
        body: MessageBody,
    },
    SendDirectMessage {
        receiver_id: UserId,
        sender_id: UserId,
        body: MessageBody,
    },
}

impl ClientCommand {
    /// 指令携带的用户身份，用于为连接声明身份。
    pub fn claimed_user(&self) -> UserId {
        match self {
            Self::Identify { user_id }
            | Self::JoinRoom { user_id, .. }
            | Self::LeaveRoom { user_id, .. } => *user_id,
            Self::SendRoomMessage { sender_id, .. }
            | Self::SendDirectMessage { sender_id, .. } => *sender_id,
        }
    }
}

fn non_empty(text: Option<String>) -> Option<MessageBody> {
    text.and_then(|text| MessageBody::new(text).ok())
}

impl ClientEvent {
    pub fn into_command(self) -> DomainResult<ClientCommand> {
        match self {
            Self::Identify(IdentifyPayload { user_id }) => user_id
                .map(|user_id| ClientCommand::Identify { user_id })
                .ok_or_else(|| DomainError::validation("userId", "userId é obrigatório.")),
            Self::JoinRoom(MembershipPayload { room_id, user_id }) => room_id
                .zip(user_id)
                .map(|(room_id, user_id)| ClientCommand::JoinRoom { room_id, user_id })
                .ok_or_else(|| {
                    DomainError::validation("roomId", "roomId e userId são obrigatórios.")
                }),
            Self::LeaveRoom(MembershipPayload { room_id, user_id }) => room_id
                .zip(user_id)
                .map(|(room_id, user_id)| ClientCommand::LeaveRoom { room_id, user_id })
                .ok_or_else(|| {
                    DomainError::validation("roomId", "roomId e userId são obrigatórios.")
                }),
            Self::SendRoomMessage(RoomMessagePayload {
                room_id,
                sender_id,
                mensagem,
            }) => match (room_id, sender_id, non_empty(mensagem)) {
                (Some(room_id), Some(sender_id), Some(body)) => {
                    Ok(ClientCommand::SendRoomMessage {
                        room_id,
                        sender_id,
                        body,
                    })
                }
                _ => Err(DomainError::validation(
                    "mensagem",
                    "roomId, senderId e mensagem são obrigatórios.",
                )),
            },
            Self::SendDirectMessage(DirectMessagePayload {
                receiver_id,
                sender_id,
                mensagem,
            }) => match (receiver_id, sender_id, non_empty(mensagem)) {
                (Some(receiver_id), Some(sender_id), Some(body)) => {
                    Ok(ClientCommand::SendDirectMessage {
                        receiver_id,
                        sender_id,
                        body,
                    })
                }
                _ => Err(DomainError::validation(
                    "mensagem",
                    "receiverId, senderId e mensagem são obrigatórios.",
                )),
            },
        }
    }
}
