use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use application::{MessageView, PostMessageRequest};

use crate::{error::ApiError, state::AppState, websocket::websocket_upgrade};

#[derive(Debug, Deserialize)]
struct SendMessagePayload {
    #[serde(default)]
    room: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    file: Option<String>,
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors_origins)),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(websocket_upgrade))
        .route("/chat/send", post(send_message))
        .route("/chat/{room}", get(chat_history))
}

/// `*` 表示任意来源；无法解析的来源被忽略
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn chat_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room): Path<String>,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    state.jwt_service.extract_claims(&headers)?;
    let messages = state.chat_service.recent_messages(&room).await?;
    Ok(Json(messages))
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SendMessagePayload>,
) -> Result<(StatusCode, Json<MessageView>), ApiError> {
    let claims = state.jwt_service.extract_claims(&headers)?;

    let view = state
        .chat_service
        .post_message(PostMessageRequest {
            sender: claims.username,
            avatar: claims.avatar,
            room: payload.room,
            content: payload.content,
            file: payload.file,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(view)))
}
