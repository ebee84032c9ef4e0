use std::path::PathBuf;
use std::sync::Arc;

use config::StorageConfig;
use domain::{ChatRoomRepository, MessageRepository, UserRepository};
use thiserror::Error;

use crate::repository::{JsonChatRoomRepository, JsonMessageRepository, JsonUserRepository};
use crate::store::JsonCollection;

pub const USERS_FILE: &str = "users.json";
pub const ROOMS_FILE: &str = "rooms.json";
pub const MESSAGES_FILE: &str = "messages.json";

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("failed to prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone)]
pub struct Infrastructure {
    pub users: Arc<JsonUserRepository>,
    pub rooms: Arc<JsonChatRoomRepository>,
    pub messages: Arc<JsonMessageRepository>,
}

impl Infrastructure {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(JsonUserRepository::new(JsonCollection::in_memory("users"))),
            rooms: Arc::new(JsonChatRoomRepository::new(JsonCollection::in_memory("rooms"))),
            messages: Arc::new(JsonMessageRepository::new(JsonCollection::in_memory(
                "messages",
            ))),
        }
    }

    pub async fn open(config: &StorageConfig) -> Result<Self, InfrastructureError> {
        if !config.persist {
            tracing::warn!("persistence disabled, all state lives in memory");
            return Ok(Self::in_memory());
        }

        let dir = &config.data_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| InfrastructureError::DataDir {
                path: dir.clone(),
                source,
            })?;

        tracing::info!(data_dir = %dir.display(), "opening data files");

        Ok(Self {
            users: Arc::new(JsonUserRepository::new(
                JsonCollection::open("users", dir.join(USERS_FILE)).await,
            )),
            rooms: Arc::new(JsonChatRoomRepository::new(
                JsonCollection::open("rooms", dir.join(ROOMS_FILE)).await,
            )),
            messages: Arc::new(JsonMessageRepository::new(
                JsonCollection::open("messages", dir.join(MESSAGES_FILE)).await,
            )),
        })
    }

    pub fn user_repository(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    pub fn room_repository(&self) -> Arc<dyn ChatRoomRepository> {
        self.rooms.clone()
    }

    pub fn message_repository(&self) -> Arc<dyn MessageRepository> {
        self.messages.clone()
    }
}
