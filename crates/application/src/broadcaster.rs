use async_trait::async_trait;
use domain::{ConnectionId, RoomName};
use thiserror::Error;

use crate::events::ServerEvent;

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("broadcast failed: {0}")]
    Failed(String),
}

impl BroadcastError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// 传输层的房间广播分组。
///
/// 按房间名寻址；投递到分组内的哪些连接由实现负责，核心不跟踪连接身份。
#[async_trait]
pub trait RoomBroadcaster: Send + Sync {
    /// 把连接加入房间的广播分组
    async fn subscribe(&self, connection_id: ConnectionId, room: &RoomName) -> Result<(), BroadcastError>;

    /// 把连接移出房间的广播分组
    async fn unsubscribe(&self, connection_id: ConnectionId, room: &RoomName) -> Result<(), BroadcastError>;

    /// 推送给房间内所有连接
    async fn broadcast(&self, room: &RoomName, event: ServerEvent) -> Result<(), BroadcastError>;

    /// 推送给房间内除 `except` 以外的连接
    async fn broadcast_except(
        &self,
        room: &RoomName,
        except: ConnectionId,
        event: ServerEvent,
    ) -> Result<(), BroadcastError>;
}
