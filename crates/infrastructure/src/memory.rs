//! 内存仓储
//!
//! 未配置数据库时使用，也用于端到端测试。进程退出后数据丢失。

use std::collections::HashMap;

use application::{Clock, MessageRepository, SystemClock, UserRepository};
use async_trait::async_trait;
use domain::{ChatMessage, MessageId, NewChatMessage, RepositoryError, RoomName, User, UserId};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入或覆盖用户资料
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

/// 按写入顺序保存消息，创建时间由注入的时钟决定
pub struct InMemoryMessageRepository {
    messages: RwLock<Vec<ChatMessage>>,
    clock: Box<dyn Clock>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

impl Default for InMemoryMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn save(&self, message: NewChatMessage) -> Result<ChatMessage, RepositoryError> {
        let stored = ChatMessage::from_new(MessageId::generate(), message, Some(self.clock.now()));
        self.messages.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn recent(&self, room: &RoomName, limit: u32) -> Result<Vec<ChatMessage>, RepositoryError> {
        let messages = self.messages.read().await;
        // 写入顺序即时间顺序，倒序遍历得到最新的在前
        Ok(messages
            .iter()
            .rev()
            .filter(|message| &message.room == room)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
