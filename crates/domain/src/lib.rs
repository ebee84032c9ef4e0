//! 聊天服务核心领域模型
//!
//! 包含用户、聊天室、消息、会话等实体，实时事件定义，以及仓储接口。

pub mod chat_room;
pub mod errors;
pub mod events;
pub mod message;
pub mod repository;
pub mod session;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use chat_room::{ChatRoom, MembershipChange, DEFAULT_ROOM_NAME};
pub use errors::{DomainError, DomainResult, ErrorKind, RepositoryError};
pub use events::*;
pub use message::{Message, MessageKind, MessageTarget, NewMessage, UNKNOWN_SENDER_LOGIN};
pub use repository::{
    ChatRoomRepository, MessageRepository, NewRoom, NewUser, RepositoryResult, UserRepository,
};
pub use session::{Session, SessionState};
pub use user::User;
pub use value_objects::{
    ConnectionId, Login, MessageBody, MessageId, RoomId, RoomName, Timestamp, UserId,
};

#[cfg(feature = "testing")]
pub use repository::{MockChatRoomRepository, MockMessageRepository, MockUserRepository};
