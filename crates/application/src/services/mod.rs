pub mod delivery;
pub mod message_store;
pub mod room_directory;
pub mod user_directory;

pub use delivery::{Delivery, DeliveryEngine};
pub use message_store::{AppendDirectMessageRequest, AppendRoomMessageRequest, MessageStore};
pub use room_directory::{CreateRoomRequest, RoomDirectory};
pub use user_directory::{AuthenticateUserRequest, RegisterUserRequest, UserDirectory};
