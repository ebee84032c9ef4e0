use std::sync::Arc;

use domain::{ChatRoomRepository, MessageRepository, UserRepository};

use crate::{
    clock::Clock,
    services::{DeliveryEngine, MessageStore, RoomDirectory, UserDirectory},
    session::SessionRegistry,
    write_gate::WriteGate,
};

pub struct ChatServicesDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub room_repository: Arc<dyn ChatRoomRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub clock: Arc<dyn Clock>,
}

/// 组装好的应用服务。所有服务共享同一个会话注册表和写入门。
#[derive(Clone)]
pub struct ChatServices {
    pub users: Arc<UserDirectory>,
    pub rooms: Arc<RoomDirectory>,
    pub messages: Arc<MessageStore>,
    pub sessions: Arc<SessionRegistry>,
    pub delivery: Arc<DeliveryEngine>,
    pub clock: Arc<dyn Clock>,
}

impl ChatServices {
    pub fn new(deps: ChatServicesDependencies) -> Self {
        let gate = WriteGate::new();
        let sessions = Arc::new(SessionRegistry::new());

        let users = Arc::new(UserDirectory::new(
            deps.user_repository.clone(),
            deps.clock.clone(),
        ));
        let rooms = Arc::new(RoomDirectory::new(
            deps.room_repository.clone(),
            deps.user_repository.clone(),
            sessions.clone(),
            deps.clock.clone(),
            gate.clone(),
        ));
        let messages = Arc::new(MessageStore::new(
            deps.message_repository,
            deps.user_repository,
            deps.room_repository,
            deps.clock.clone(),
            gate,
        ));
        let delivery = Arc::new(DeliveryEngine::new(
            users.clone(),
            rooms.clone(),
            messages.clone(),
            sessions.clone(),
            deps.clock.clone(),
        ));

        Self {
            users,
            rooms,
            messages,
            sessions,
            delivery,
            clock: deps.clock,
        }
    }
}
