//! Web API 层。
//!
//! 提供 Axum 路由：WebSocket 实时网关入口，以及聊天历史与发送的 HTTP 接口。

mod auth;
mod error;
mod routes;
mod state;
mod websocket;
mod ws_connection;

pub use auth::{bearer_token, Claims, JwtService};
pub use config::JwtConfig;
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
