//! 实时连接上的事件定义
//!
//! 入站事件在边界处一次性完成必填字段校验，转换为 [`ClientCommand`] 后再交给投递引擎。

pub mod client_event;
pub mod server_event;

pub use client_event::*;
pub use server_event::*;
