//! WebSocket 升级入口
//!
//! 握手阶段不做认证：升级完成后由连接循环调用网关认证，失败时直接关闭连接。

use application::Handshake;
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;

use crate::{auth::bearer_token, state::AppState, ws_connection::WebSocketConnection};

/// WebSocket 连接查询参数
#[derive(Debug, Default, Deserialize)]
pub struct WebSocketQuery {
    /// JWT access token，`Authorization` 头缺失时使用
    #[serde(default)]
    pub token: Option<String>,
}

pub async fn websocket_upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WebSocketQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let handshake = Handshake {
        auth_token: bearer_token(&headers),
        query_token: query.token,
    };

    ws.on_upgrade(move |socket| WebSocketConnection::new(state, handshake).run(socket))
}
