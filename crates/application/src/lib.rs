//! 应用层实现。
//!
//! 实时会话与房间在线状态核心：连接认证、房间成员跟踪、事件扇出以及断线清理。
//! 身份校验、用户查询、消息持久化和传输层都以 trait 的形式抽象，由外层 crate 提供实现。

pub mod broadcaster;
pub mod clock;
pub mod disconnect;
pub mod error;
pub mod events;
pub mod gateway;
pub mod identity;
pub mod presence;
pub mod repository;
pub mod router;
pub mod services;
pub mod session;

#[cfg(test)]
mod test_support;

pub use broadcaster::{BroadcastError, RoomBroadcaster};
pub use clock::{Clock, SystemClock};
pub use disconnect::DisconnectReconciler;
pub use error::{ApplicationError, AuthFailure};
pub use events::{
    ClientEvent, MessageView, RoomPayload, SeenNotice, SendMessagePayload, ServerEvent,
    TypingNotice, TypingPayload,
};
pub use gateway::{ChatGateway, GatewayDependencies};
pub use identity::{CredentialVerifier, Principal};
pub use presence::PresenceRegistry;
pub use repository::{MessageRepository, UserRepository};
pub use router::{DropReason, EventOutcome, RoomEventRouter};
pub use services::{ChatService, ChatServiceDependencies, PostMessageRequest};
pub use session::{Handshake, Session, SessionBinder, SessionStore};
