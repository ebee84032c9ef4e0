use serde::{Deserialize, Serialize};

use crate::value_objects::{Login, Timestamp, UserId};

/// 用户记录。创建后不可变，系统不提供更新或删除操作。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub login: String,
    #[serde(rename = "criadoEm")]
    pub created_at: Timestamp,
}

impl User {
    pub fn register(id: UserId, login: Login, now: Timestamp) -> Self {
        Self {
            id,
            login: login.into_inner(),
            created_at: now,
        }
    }
}
