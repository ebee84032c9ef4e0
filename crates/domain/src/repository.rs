//! 仓储接口
//!
//! 每个集合只有一条串行化的写路径：唯一性检查、ID 分配与写入在同一个临界区内完成。
//! 落盘方式属于实现细节，隐藏在这些接口之后。

use async_trait::async_trait;

use crate::chat_room::{ChatRoom, MembershipChange};
use crate::errors::RepositoryError;
use crate::message::{Message, NewMessage};
use crate::user::User;
use crate::value_objects::{Login, RoomId, RoomName, Timestamp, UserId};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub login: Login,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoom {
    pub name: RoomName,
    pub created_at: Timestamp,
}

#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 登录名重复时返回 [`RepositoryError::Conflict`]。
    async fn create(&self, user: NewUser) -> RepositoryResult<User>;
    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>>;
    async fn find_by_login(&self, login: &str) -> RepositoryResult<Option<User>>;
}

#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ChatRoomRepository: Send + Sync {
    async fn create(&self, room: NewRoom) -> RepositoryResult<ChatRoom>;
    /// 按创建顺序返回
    async fn list(&self) -> RepositoryResult<Vec<ChatRoom>>;
    async fn find_by_id(&self, id: RoomId) -> RepositoryResult<Option<ChatRoom>>;
    /// 房间不存在时返回 [`RepositoryError::NotFound`]。
    async fn delete(&self, id: RoomId) -> RepositoryResult<ChatRoom>;
    /// 房间不存在时返回 [`RepositoryError::NotFound`]。
    async fn update_members(
        &self,
        id: RoomId,
        change: MembershipChange,
    ) -> RepositoryResult<ChatRoom>;
}

#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 分配严格递增的消息 ID 并追加。
    async fn append(&self, message: NewMessage) -> RepositoryResult<Message>;
    /// 房间消息，按追加顺序
    async fn list_room(&self, room_id: RoomId) -> RepositoryResult<Vec<Message>>;
    /// 该用户发出或收到的私信，按追加顺序
    async fn list_direct(&self, user_id: UserId) -> RepositoryResult<Vec<Message>>;
}
