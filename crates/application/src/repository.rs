use async_trait::async_trait;
use domain::{ChatMessage, NewChatMessage, RepositoryError, RoomName, User, UserId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    // 持久化一条消息，返回带 ID 和创建时间的完整记录
    async fn save(&self, message: NewChatMessage) -> Result<ChatMessage, RepositoryError>;

    // 房间最近的消息，按创建时间倒序
    async fn recent(&self, room: &RoomName, limit: u32) -> Result<Vec<ChatMessage>, RepositoryError>;
}
