use async_trait::async_trait;
use domain::{
    ChatRoom, ChatRoomRepository, MembershipChange, Message, MessageId, MessageRepository,
    NewMessage, NewRoom, NewUser, RepositoryError, RepositoryResult, RoomId, User, UserId,
    UserRepository,
};

use crate::store::{JsonCollection, Record};

impl Record for User {
    fn record_id(&self) -> u64 {
        self.id.value()
    }
}

impl Record for ChatRoom {
    fn record_id(&self) -> u64 {
        self.id.value()
    }
}

impl Record for Message {
    fn record_id(&self) -> u64 {
        self.id.value()
    }
}

pub struct JsonUserRepository {
    users: JsonCollection<User>,
}

impl JsonUserRepository {
    pub fn new(users: JsonCollection<User>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserRepository for JsonUserRepository {
    async fn create(&self, user: NewUser) -> RepositoryResult<User> {
        self.users
            .write(|state| {
                if state
                    .records()
                    .iter()
                    .any(|existing| existing.login == user.login.as_str())
                {
                    return Err(RepositoryError::Conflict);
                }
                let created =
                    User::register(UserId::new(state.next_id()), user.login, user.created_at);
                state.records_mut().push(created.clone());
                Ok(created)
            })
            .await
    }

    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
        Ok(self
            .users
            .read(|users| users.iter().find(|user| user.id == id).cloned())
            .await)
    }

    async fn find_by_login(&self, login: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .users
            .read(|users| users.iter().find(|user| user.login == login).cloned())
            .await)
    }
}

pub struct JsonChatRoomRepository {
    rooms: JsonCollection<ChatRoom>,
}

impl JsonChatRoomRepository {
    pub fn new(rooms: JsonCollection<ChatRoom>) -> Self {
        Self { rooms }
    }
}

#[async_trait]
impl ChatRoomRepository for JsonChatRoomRepository {
    async fn create(&self, room: NewRoom) -> RepositoryResult<ChatRoom> {
        self.rooms
            .write(|state| {
                let created =
                    ChatRoom::new(RoomId::new(state.next_id()), room.name, room.created_at);
                state.records_mut().push(created.clone());
                Ok(created)
            })
            .await
    }

    async fn list(&self) -> RepositoryResult<Vec<ChatRoom>> {
        Ok(self.rooms.read(|rooms| rooms.to_vec()).await)
    }

    async fn find_by_id(&self, id: RoomId) -> RepositoryResult<Option<ChatRoom>> {
        Ok(self
            .rooms
            .read(|rooms| rooms.iter().find(|room| room.id == id).cloned())
            .await)
    }

    async fn delete(&self, id: RoomId) -> RepositoryResult<ChatRoom> {
        self.rooms
            .write(|state| {
                let index = state
                    .records()
                    .iter()
                    .position(|room| room.id == id)
                    .ok_or(RepositoryError::NotFound)?;
                Ok(state.records_mut().remove(index))
            })
            .await
    }

    async fn update_members(
        &self,
        id: RoomId,
        change: MembershipChange,
    ) -> RepositoryResult<ChatRoom> {
        self.rooms
            .write(|state| {
                let room = state
                    .records_mut()
                    .iter_mut()
                    .find(|room| room.id == id)
                    .ok_or(RepositoryError::NotFound)?;
                change.apply(room);
                Ok(room.clone())
            })
            .await
    }
}

pub struct JsonMessageRepository {
    messages: JsonCollection<Message>,
}

impl JsonMessageRepository {
    pub fn new(messages: JsonCollection<Message>) -> Self {
        Self { messages }
    }
}

#[async_trait]
impl MessageRepository for JsonMessageRepository {
    async fn append(&self, message: NewMessage) -> RepositoryResult<Message> {
        self.messages
            .write(|state| {
                let appended = Message::compose(MessageId::new(state.next_id()), message);
                state.records_mut().push(appended.clone());
                Ok(appended)
            })
            .await
    }

    async fn list_room(&self, room_id: RoomId) -> RepositoryResult<Vec<Message>> {
        Ok(self
            .messages
            .read(|messages| {
                messages
                    .iter()
                    .filter(|message| message.is_in_room(room_id))
                    .cloned()
                    .collect()
            })
            .await)
    }

    async fn list_direct(&self, user_id: UserId) -> RepositoryResult<Vec<Message>> {
        Ok(self
            .messages
            .read(|messages| {
                messages
                    .iter()
                    .filter(|message| message.involves(user_id))
                    .cloned()
                    .collect()
            })
            .await)
    }
}
