use std::sync::Arc;

use application::{
    ChatServices, Clock, DeliveryEngine, MessageStore, RoomDirectory, SessionRegistry,
    UserDirectory,
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserDirectory>,
    pub rooms: Arc<RoomDirectory>,
    pub messages: Arc<MessageStore>,
    pub sessions: Arc<SessionRegistry>,
    pub delivery: Arc<DeliveryEngine>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(services: ChatServices) -> Self {
        Self {
            users: services.users,
            rooms: services.rooms,
            messages: services.messages,
            sessions: services.sessions,
            delivery: services.delivery,
            clock: services.clock,
        }
    }
}
