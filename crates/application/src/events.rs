//! 实时事件定义
//!
//! 线上格式统一为 `{"event": "<name>", "data": <payload>}`。
//! 入站载荷的字段全部可缺省，缺字段由路由器判定为丢弃，而不是解析失败。

use domain::{format_timestamp, ChatMessage, Timestamp, Username};
use serde::{Deserialize, Serialize};

/// 客户端发来的事件
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ClientEvent {
    Join(RoomPayload),
    Leave(RoomPayload),
    Message(SendMessagePayload),
    Typing(TypingPayload),
    Seen(RoomPayload),
}

impl ClientEvent {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Join(_) => "join",
            ClientEvent::Leave(_) => "leave",
            ClientEvent::Message(_) => "message",
            ClientEvent::Typing(_) => "typing",
            ClientEvent::Seen(_) => "seen",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RoomPayload {
    #[serde(default)]
    pub room: Option<String>,
}

impl RoomPayload {
    pub fn new(room: impl Into<String>) -> Self {
        Self {
            room: Some(room.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SendMessagePayload {
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TypingPayload {
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub typing: bool,
}

/// 服务端推送的事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ServerEvent {
    /// 房间当前在线用户列表
    Users(Vec<Username>),
    Message(MessageView),
    Typing(TypingNotice),
    Seen(SeenNotice),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Users(_) => "users",
            ServerEvent::Message(_) => "message",
            ServerEvent::Typing(_) => "typing",
            ServerEvent::Seen(_) => "seen",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// 推送给客户端的消息记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub sender: String,
    pub content: String,
    pub file: Option<String>,
    pub room: String,
    pub seen: bool,
    pub avatar: String,
    pub created_at: String,
}

impl MessageView {
    /// `created_at` 优先使用存储层的值，缺失时退回 `now`
    pub fn from_stored(message: &ChatMessage, avatar: Option<&str>, now: Timestamp) -> Self {
        Self {
            id: message.id.to_string(),
            sender: message.sender.to_string(),
            content: message.content.as_str().to_string(),
            file: message.file.clone(),
            room: message.room.to_string(),
            seen: false,
            avatar: avatar.unwrap_or_default().to_string(),
            created_at: format_timestamp(message.created_at.unwrap_or(now)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingNotice {
    pub user: Username,
    pub typing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenNotice {
    pub by: Username,
}
