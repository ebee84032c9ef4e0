use serde::{Deserialize, Serialize};

use crate::value_objects::{MessageBody, MessageId, RoomId, Timestamp, UserId};

/// 发送者无法解析时在历史记录中展示的登录名。
pub const UNKNOWN_SENDER_LOGIN: &str = "Desconhecido";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Room,
    Direct,
}

/// 消息的投递目标：房间广播或点对点。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTarget {
    Room(RoomId),
    Direct(UserId),
}

impl MessageTarget {
    pub fn kind(self) -> MessageKind {
        match self {
            Self::Room(_) => MessageKind::Room,
            Self::Direct(_) => MessageKind::Direct,
        }
    }
}

/// 待追加的消息，ID 由消息存储在追加时分配。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub sender_login: String,
    pub target: MessageTarget,
    pub body: MessageBody,
    pub timestamp: Timestamp,
}

/// 消息记录。只追加，不编辑，不删除。
///
/// `room_id` 仅在房间消息中出现，`receiver_id` 仅在私信中出现。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub sender_id: UserId,
    /// 发送时刻的登录名快照
    #[serde(default)]
    pub sender_login: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<UserId>,
    #[serde(rename = "conteudo")]
    pub body: String,
    pub timestamp: Timestamp,
}

impl Message {
    pub fn compose(id: MessageId, new: NewMessage) -> Self {
        let (room_id, receiver_id) = match new.target {
            MessageTarget::Room(room_id) => (Some(room_id), None),
            MessageTarget::Direct(receiver_id) => (None, Some(receiver_id)),
        };

        Self {
            id,
            kind: new.target.kind(),
            sender_id: new.sender_id,
            sender_login: new.sender_login,
            room_id,
            receiver_id,
            body: new.body.into_inner(),
            timestamp: new.timestamp,
        }
    }

    pub fn is_in_room(&self, room_id: RoomId) -> bool {
        self.kind == MessageKind::Room && self.room_id == Some(room_id)
    }

    /// 私信的发送方或接收方是否为该用户。
    pub fn involves(&self, user_id: UserId) -> bool {
        self.kind == MessageKind::Direct
            && (self.sender_id == user_id || self.receiver_id == Some(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn draft(target: MessageTarget) -> NewMessage {
        NewMessage {
            sender_id: UserId::new(1),
            sender_login: "alice".into(),
            target,
            body: MessageBody::new("oi").unwrap(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn room_message_carries_room_id_only() {
        let message = Message::compose(MessageId::new(5), draft(MessageTarget::Room(RoomId::new(2))));
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["type"], "room");
        assert_eq!(value["roomId"], "2");
        assert!(value.get("receiverId").is_none());
        assert_eq!(value["conteudo"], "oi");
        assert_eq!(value["senderLogin"], "alice");
        assert!(message.is_in_room(RoomId::new(2)));
        assert!(!message.involves(UserId::new(1)));
    }

    #[test]
    fn direct_message_carries_receiver_only() {
        let message =
            Message::compose(MessageId::new(6), draft(MessageTarget::Direct(UserId::new(9))));
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["type"], "direct");
        assert_eq!(value["receiverId"], "9");
        assert!(value.get("roomId").is_none());
        assert!(message.involves(UserId::new(1)));
        assert!(message.involves(UserId::new(9)));
        assert!(!message.involves(UserId::new(3)));
    }

    #[test]
    fn legacy_records_without_sender_login_still_load() {
        let raw = r#"{"id":"1","type":"room","roomId":"1","senderId":"2","conteudo":"ola","timestamp":"2024-05-01T10:00:00Z"}"#;
        let message: Message = serde_json::from_str(raw).unwrap();
        assert!(message.sender_login.is_empty());
        assert_eq!(message.room_id, Some(RoomId::new(1)));
    }
}
