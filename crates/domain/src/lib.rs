//! 聊天室系统核心领域模型
//!
//! 包含用户、房间名、聊天消息等核心实体与值对象，以及领域层错误定义。

pub mod errors;
pub mod message;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use errors::*;
pub use message::{ChatMessage, NewChatMessage};
pub use user::User;
pub use value_objects::*;
