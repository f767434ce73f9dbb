use crate::value_objects::{MessageContent, MessageId, RoomName, Timestamp, Username};

/// 待持久化的聊天消息。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NewChatMessage {
    pub sender: Username,
    pub content: MessageContent,
    pub room: RoomName,
    pub file: Option<String>,
    /// 发送时刻发送者头像的副本
    pub avatar: Option<String>,
}

impl NewChatMessage {
    pub fn new(
        sender: Username,
        content: MessageContent,
        room: RoomName,
        file: Option<String>,
        avatar: Option<String>,
    ) -> Self {
        Self {
            sender,
            content,
            room,
            file: file.filter(|value| !value.is_empty()),
            avatar: avatar.filter(|value| !value.is_empty()),
        }
    }
}

/// 已持久化的聊天消息。创建后不再修改。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: Username,
    pub content: MessageContent,
    pub room: RoomName,
    pub file: Option<String>,
    pub avatar: Option<String>,
    pub seen: bool,
    /// 由存储层写入；部分存储可能不返回该字段
    pub created_at: Option<Timestamp>,
}

impl ChatMessage {
    /// 按存储层分配的 ID 与时间戳落地一条新消息
    pub fn from_new(id: MessageId, message: NewChatMessage, created_at: Option<Timestamp>) -> Self {
        Self {
            id,
            sender: message.sender,
            content: message.content,
            room: message.room,
            file: message.file,
            avatar: message.avatar,
            seen: false,
            created_at,
        }
    }
}
