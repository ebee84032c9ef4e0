use std::collections::HashSet;

use crate::value_objects::{ConnectionId, RoomId, Timestamp, UserId};

/// 会话的身份状态。房间订阅与身份状态相互独立。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Identified(UserId),
}

/// 单个存活连接的运行时状态。断开即销毁，不持久化。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub user_id: Option<UserId>,
    pub subscribed_room_ids: HashSet<RoomId>,
    pub connected_at: Timestamp,
    pub last_seen: Timestamp,
}

impl Session {
    pub fn connect(connection_id: ConnectionId, now: Timestamp) -> Self {
        Self {
            connection_id,
            user_id: None,
            subscribed_room_ids: HashSet::new(),
            connected_at: now,
            last_seen: now,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.user_id {
            Some(user_id) => SessionState::Identified(user_id),
            None => SessionState::Anonymous,
        }
    }

    /// 声明身份，后一次声明覆盖前一次。
    pub fn identify(&mut self, user_id: UserId) {
        self.user_id = Some(user_id);
    }

    pub fn is_identified_as(&self, user_id: UserId) -> bool {
        self.user_id == Some(user_id)
    }

    pub fn subscribe(&mut self, room_id: RoomId) -> bool {
        self.subscribed_room_ids.insert(room_id)
    }

    pub fn unsubscribe(&mut self, room_id: RoomId) -> bool {
        self.subscribed_room_ids.remove(&room_id)
    }

    pub fn is_subscribed(&self, room_id: RoomId) -> bool {
        self.subscribed_room_ids.contains(&room_id)
    }

    pub fn touch(&mut self, now: Timestamp) {
        self.last_seen = now;
    }
}
