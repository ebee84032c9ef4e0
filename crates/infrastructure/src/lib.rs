//! 基础设施层实现。
//!
//! 以 JSON 文件实现领域层定义的仓储接口：users.json、rooms.json、messages.json。

pub mod builder;
pub mod repository;
pub mod store;

pub use builder::{Infrastructure, InfrastructureError, MESSAGES_FILE, ROOMS_FILE, USERS_FILE};
pub use repository::{JsonChatRoomRepository, JsonMessageRepository, JsonUserRepository};
pub use store::{sequence_path, CollectionState, JsonCollection, Record};
