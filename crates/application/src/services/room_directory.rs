use std::sync::Arc;

use domain::{
    ChatRoom, ChatRoomRepository, ConnectionId, DomainError, MembershipChange, NewRoom,
    RepositoryError, RoomId, RoomName, UserId, UserRepository, DEFAULT_ROOM_NAME,
};

use crate::{
    clock::Clock, error::ApplicationError, session::SessionRegistry, write_gate::WriteGate,
};

#[derive(Debug, Clone)]
pub struct CreateRoomRequest {
    pub name: String,
}

fn room_not_found(err: RepositoryError) -> ApplicationError {
    match err {
        RepositoryError::NotFound => DomainError::RoomNotFound.into(),
        other => other.into(),
    }
}

pub struct RoomDirectory {
    rooms: Arc<dyn ChatRoomRepository>,
    users: Arc<dyn UserRepository>,
    sessions: Arc<SessionRegistry>,
    clock: Arc<dyn Clock>,
    gate: WriteGate,
}

impl RoomDirectory {
    pub fn new(
        rooms: Arc<dyn ChatRoomRepository>,
        users: Arc<dyn UserRepository>,
        sessions: Arc<SessionRegistry>,
        clock: Arc<dyn Clock>,
        gate: WriteGate,
    ) -> Self {
        Self {
            rooms,
            users,
            sessions,
            clock,
            gate,
        }
    }

    /// 房间目录为空时创建默认房间，只会发生一次。
    pub async fn ensure_default_room(&self) -> Result<Option<ChatRoom>, ApplicationError> {
        let _guard = self.gate.enter().await;
        if !self.rooms.list().await?.is_empty() {
            return Ok(None);
        }

        let room = self
            .rooms
            .create(NewRoom {
                name: RoomName::parse(DEFAULT_ROOM_NAME)?,
                created_at: self.clock.now(),
            })
            .await?;
        tracing::info!(room_id = %room.id, name = %room.name, "default room created");
        Ok(Some(room))
    }

    pub async fn create_room(
        &self,
        request: CreateRoomRequest,
    ) -> Result<ChatRoom, ApplicationError> {
        let name = RoomName::parse(request.name)?;
        let room = self
            .rooms
            .create(NewRoom {
                name,
                created_at: self.clock.now(),
            })
            .await?;
        tracing::info!(room_id = %room.id, name = %room.name, "room created");
        Ok(room)
    }

    /// 按创建顺序列出房间。存储故障时记录日志并返回空列表。
    pub async fn list_rooms(&self) -> Vec<ChatRoom> {
        self.rooms.list().await.unwrap_or_else(|err| {
            tracing::error!(error = %err, "failed to list rooms");
            Vec::new()
        })
    }

    pub async fn find_room(&self, room_id: RoomId) -> Result<ChatRoom, ApplicationError> {
        self.rooms
            .find_by_id(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound.into())
    }

    /// 删除房间并级联取消所有会话对它的订阅。
    pub async fn delete_room(&self, room_id: RoomId) -> Result<ChatRoom, ApplicationError> {
        let _guard = self.gate.enter().await;
        let room = self.rooms.delete(room_id).await.map_err(room_not_found)?;
        let unsubscribed = self.sessions.drop_room(room_id).await;
        tracing::info!(room_id = %room_id, unsubscribed, "room deleted");
        Ok(room)
    }

    /// 幂等加入。未知用户同样返回 `UserNotFound`。
    pub async fn join(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<ChatRoom, ApplicationError> {
        self.change_membership(room_id, MembershipChange::Add(user_id), None)
            .await
    }

    /// 幂等移除，只在房间不存在时失败。
    pub async fn leave(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<ChatRoom, ApplicationError> {
        self.change_membership(room_id, MembershipChange::Remove(user_id), None)
            .await
    }

    pub async fn admin_remove_user(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<ChatRoom, ApplicationError> {
        let room = self.leave(room_id, user_id).await?;
        tracing::info!(room_id = %room_id, user_id = %user_id, "user removed from room by admin");
        Ok(room)
    }

    /// 加入房间并同时订阅该连接，两者在同一临界区内完成。
    pub(crate) async fn join_with_session(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<ChatRoom, ApplicationError> {
        self.change_membership(room_id, MembershipChange::Add(user_id), Some(connection_id))
            .await
    }

    pub(crate) async fn leave_with_session(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<ChatRoom, ApplicationError> {
        self.change_membership(
            room_id,
            MembershipChange::Remove(user_id),
            Some(connection_id),
        )
        .await
    }

    async fn change_membership(
        &self,
        room_id: RoomId,
        change: MembershipChange,
        connection_id: Option<ConnectionId>,
    ) -> Result<ChatRoom, ApplicationError> {
        let _guard = self.gate.enter().await;

        if self.rooms.find_by_id(room_id).await?.is_none() {
            return Err(DomainError::RoomNotFound.into());
        }
        if let MembershipChange::Add(user_id) = change {
            if self.users.find_by_id(user_id).await?.is_none() {
                return Err(DomainError::UserNotFound.into());
            }
        }
        if let Some(connection_id) = connection_id {
            if self.sessions.get(connection_id).await.is_none() {
                return Err(DomainError::SessionNotFound.into());
            }
        }

        let room = self
            .rooms
            .update_members(room_id, change)
            .await
            .map_err(room_not_found)?;

        if let Some(connection_id) = connection_id {
            let subscription = match change {
                MembershipChange::Add(_) => self.sessions.subscribe(connection_id, room_id).await,
                MembershipChange::Remove(_) => {
                    self.sessions.unsubscribe(connection_id, room_id).await
                }
            };
            // 连接可能在校验之后断开，成员关系照常保留
            if let Err(err) = subscription {
                tracing::debug!(
                    connection_id = %connection_id,
                    error = %err,
                    "session vanished during membership change"
                );
            }
        }

        Ok(room)
    }
}
