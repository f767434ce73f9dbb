use application::{MessageRepository, UserRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    ChatMessage, MessageContent, MessageId, NewChatMessage, RepositoryError, RoomName, User,
    UserId, Username,
};
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

/// 工作区根目录下的数据库迁移
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    RepositoryError::storage(err.to_string())
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    avatar: Option<String>,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let username =
            Username::parse(value.username).map_err(|err| invalid_data(err.to_string()))?;
        Ok(User::new(UserId::from(value.id), username, value.avatar))
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    sender: String,
    content: String,
    room: String,
    file: Option<String>,
    avatar: Option<String>,
    seen: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRecord> for ChatMessage {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let sender = Username::parse(value.sender).map_err(|err| invalid_data(err.to_string()))?;
        let content =
            MessageContent::new(value.content).map_err(|err| invalid_data(err.to_string()))?;
        let room = RoomName::parse(value.room).map_err(|err| invalid_data(err.to_string()))?;

        Ok(ChatMessage {
            id: MessageId::from(value.id),
            sender,
            content,
            room,
            file: value.file,
            avatar: value.avatar,
            seen: value.seen,
            created_at: Some(value.created_at),
        })
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, avatar
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn save(&self, message: NewChatMessage) -> Result<ChatMessage, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO chat_messages (id, sender, content, room, file, avatar)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, sender, content, room, file, avatar, seen, created_at
            "#,
        )
        .bind(Uuid::from(MessageId::generate()))
        .bind(message.sender.as_str())
        .bind(message.content.as_str())
        .bind(message.room.as_str())
        .bind(message.file.as_deref())
        .bind(message.avatar.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        ChatMessage::try_from(record)
    }

    async fn recent(&self, room: &RoomName, limit: u32) -> Result<Vec<ChatMessage>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, sender, content, room, file, avatar, seen, created_at
            FROM chat_messages
            WHERE room = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(room.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(ChatMessage::try_from).collect()
    }
}
