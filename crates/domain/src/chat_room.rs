use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::value_objects::{RoomId, RoomName, Timestamp, UserId};

/// 房间目录为空时自动创建的默认房间名称。
pub const DEFAULT_ROOM_NAME: &str = "Sala Padrão";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: RoomId,
    #[serde(rename = "nome")]
    pub name: String,
    /// 持久的成员集合，与实时订阅分开维护
    #[serde(rename = "usuarios", default)]
    pub member_ids: BTreeSet<UserId>,
    #[serde(rename = "criadoEm")]
    pub created_at: Timestamp,
}

impl ChatRoom {
    pub fn new(id: RoomId, name: RoomName, created_at: Timestamp) -> Self {
        Self {
            id,
            name: name.into_inner(),
            member_ids: BTreeSet::new(),
            created_at,
        }
    }

    /// 幂等加入，返回成员集合是否发生变化。
    pub fn add_member(&mut self, user_id: UserId) -> bool {
        self.member_ids.insert(user_id)
    }

    /// 幂等移除，移除非成员不算错误。
    pub fn remove_member(&mut self, user_id: UserId) -> bool {
        self.member_ids.remove(&user_id)
    }

    pub fn has_member(&self, user_id: UserId) -> bool {
        self.member_ids.contains(&user_id)
    }
}

/// 成员集合的变更指令。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Add(UserId),
    Remove(UserId),
}

impl MembershipChange {
    pub fn apply(self, room: &mut ChatRoom) -> bool {
        match self {
            Self::Add(user_id) => room.add_member(user_id),
            Self::Remove(user_id) => room.remove_member(user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn room() -> ChatRoom {
        ChatRoom::new(RoomId::new(1), RoomName::parse("geral").unwrap(), Utc::now())
    }

    #[test]
    fn membership_changes_are_idempotent() {
        let mut room = room();
        let alice = UserId::new(1);

        assert!(MembershipChange::Add(alice).apply(&mut room));
        assert!(!MembershipChange::Add(alice).apply(&mut room));
        assert_eq!(room.member_ids.len(), 1);

        assert!(MembershipChange::Remove(alice).apply(&mut room));
        assert!(!MembershipChange::Remove(alice).apply(&mut room));
        assert!(room.member_ids.is_empty());
    }

    #[test]
    fn serializes_with_product_field_names() {
        let mut room = room();
        room.add_member(UserId::new(3));
        let value = serde_json::to_value(&room).unwrap();

        assert_eq!(value["id"], "1");
        assert_eq!(value["nome"], "geral");
        assert_eq!(value["usuarios"], serde_json::json!(["3"]));
        assert!(value.get("criadoEm").is_some());
    }
}
