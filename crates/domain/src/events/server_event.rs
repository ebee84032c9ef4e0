use serde::{Deserialize, Serialize};

use crate::chat_room::ChatRoom;
use crate::message::{Message, MessageKind};
use crate::value_objects::{RoomId, UserId};

/// 推送给客户端的事件帧：`{"event": "...", "data": {...}}`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// 身份声明成功（仅发给发起连接）
    Identified(IdentityNotice),
    /// 加入房间成功（仅发给发起连接）
    RoomJoined(ChatRoom),
    /// 离开房间成功（仅发给发起连接）
    RoomLeft(RoomNotice),
    UserJoined(MembershipNotice),
    UserLeft(MembershipNotice),
    NewRoomMessage(Message),
    NewDirectMessage(Message),
    /// 房间已删除，订阅随之取消
    RoomDeleted(RoomNotice),
    /// 错误只发给发起连接，从不广播
    Error(ErrorNotice),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityNotice {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomNotice {
    pub room_id: RoomId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipNotice {
    pub room_id: RoomId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub error: String,
}

impl ServerEvent {
    pub fn user_joined(room_id: RoomId, user_id: UserId) -> Self {
        Self::UserJoined(MembershipNotice { room_id, user_id })
    }

    pub fn user_left(room_id: RoomId, user_id: UserId) -> Self {
        Self::UserLeft(MembershipNotice { room_id, user_id })
    }

    pub fn room_left(room_id: RoomId) -> Self {
        Self::RoomLeft(RoomNotice { room_id })
    }

    pub fn room_deleted(room_id: RoomId) -> Self {
        Self::RoomDeleted(RoomNotice { room_id })
    }

    pub fn identified(user_id: UserId) -> Self {
        Self::Identified(IdentityNotice { user_id })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorNotice {
            error: message.into(),
        })
    }

    /// 根据消息类型选择推送事件。
    pub fn new_message(message: Message) -> Self {
        match message.kind {
            MessageKind::Room => Self::NewRoomMessage(message),
            MessageKind::Direct => Self::NewDirectMessage(message),
        }
    }
}
