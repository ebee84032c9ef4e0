//! 应用层实现。
//!
//! 用户目录、房间目录、消息存储围绕领域仓储完成校验与写入，
//! 会话注册表与投递引擎负责把结果实时扇出给在线连接。

pub mod clock;
pub mod container;
pub mod error;
pub mod services;
pub mod session;
pub mod write_gate;

pub use clock::{Clock, SystemClock};
pub use container::{ChatServices, ChatServicesDependencies};
pub use error::ApplicationError;
pub use services::{
    AppendDirectMessageRequest, AppendRoomMessageRequest, AuthenticateUserRequest,
    CreateRoomRequest, Delivery, DeliveryEngine, MessageStore, RegisterUserRequest,
    RoomDirectory, UserDirectory,
};
pub use session::{EventReceiver, EventSender, SessionRegistry};
pub use write_gate::WriteGate;
