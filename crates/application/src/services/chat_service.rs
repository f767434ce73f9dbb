use std::sync::Arc;

use domain::{MessageContent, NewChatMessage, RoomName, Username};
use tracing::info;

use crate::{clock::Clock, error::ApplicationError, events::MessageView, repository::MessageRepository};

/// HTTP 发送消息请求。发送者与头像来自令牌声明，不由客户端提供。
#[derive(Debug, Clone)]
pub struct PostMessageRequest {
    pub sender: String,
    pub avatar: Option<String>,
    pub room: String,
    pub content: String,
    pub file: Option<String>,
}

pub struct ChatServiceDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub clock: Arc<dyn Clock>,
    /// 历史查询返回的最大条数
    pub history_limit: u32,
}

/// 聊天历史与 HTTP 发送。只落库，不向房间广播。
pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    /// 房间最近的消息，最新的在前
    pub async fn recent_messages(&self, room: &str) -> Result<Vec<MessageView>, ApplicationError> {
        let room = RoomName::parse(room)?;
        let messages = self
            .deps
            .message_repository
            .recent(&room, self.deps.history_limit)
            .await?;

        let now = self.deps.clock.now();
        Ok(messages
            .iter()
            .map(|message| MessageView::from_stored(message, message.avatar.as_deref(), now))
            .collect())
    }

    pub async fn post_message(
        &self,
        request: PostMessageRequest,
    ) -> Result<MessageView, ApplicationError> {
        let sender = Username::parse(request.sender)?;
        let room = RoomName::parse(request.room)?;
        let content = MessageContent::new(request.content)?;

        let message = NewChatMessage::new(sender, content, room, request.file, request.avatar);
        let stored = self
            .deps
            .message_repository
            .save(message)
            .await
            .map_err(ApplicationError::Persistence)?;

        info!(room = %stored.room, sender = %stored.sender, message_id = %stored.id, "HTTP 消息已保存");
        Ok(MessageView::from_stored(
            &stored,
            stored.avatar.as_deref(),
            self.deps.clock.now(),
        ))
    }
}
