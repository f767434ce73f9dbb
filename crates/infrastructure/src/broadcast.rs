use std::collections::{HashMap, HashSet};

use application::{BroadcastError, RoomBroadcaster, ServerEvent};
use async_trait::async_trait;
use domain::{ConnectionId, RoomName};
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// 进程内的房间广播分组。
///
/// 每个连接注册一个无界发送通道，房间分组只保存连接 ID。
/// 投递是尽力而为：对端通道已关闭时直接跳过。
/// 加锁顺序固定为先 groups 后 connections。
#[derive(Debug, Default)]
pub struct LocalRoomHub {
    connections: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>,
    groups: RwLock<HashMap<RoomName, HashSet<ConnectionId>>>,
}

impl LocalRoomHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册连接，返回该连接的出站事件接收端
    pub async fn register(&self, connection_id: ConnectionId) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.write().await.insert(connection_id, tx);
        rx
    }

    /// 注销连接并把它移出所有分组
    pub async fn unregister(&self, connection_id: ConnectionId) {
        let mut groups = self.groups.write().await;
        groups.retain(|_, members| {
            members.remove(&connection_id);
            !members.is_empty()
        });
        self.connections.write().await.remove(&connection_id);
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn group_size(&self, room: &RoomName) -> usize {
        self.groups
            .read()
            .await
            .get(room)
            .map(HashSet::len)
            .unwrap_or_default()
    }

    async fn deliver(&self, room: &RoomName, except: Option<ConnectionId>, event: ServerEvent) {
        let groups = self.groups.read().await;
        let Some(members) = groups.get(room) else {
            return;
        };
        let connections = self.connections.read().await;

        for connection_id in members {
            if Some(*connection_id) == except {
                continue;
            }
            if let Some(sender) = connections.get(connection_id) {
                if sender.send(event.clone()).is_err() {
                    debug!(connection_id = %connection_id, room = %room, "连接通道已关闭，跳过投递");
                }
            }
        }
    }
}

#[async_trait]
impl RoomBroadcaster for LocalRoomHub {
    async fn subscribe(&self, connection_id: ConnectionId, room: &RoomName) -> Result<(), BroadcastError> {
        if !self.connections.read().await.contains_key(&connection_id) {
            return Err(BroadcastError::failed(format!(
                "connection {connection_id} is not registered"
            )));
        }
        self.groups
            .write()
            .await
            .entry(room.clone())
            .or_default()
            .insert(connection_id);
        Ok(())
    }

    async fn unsubscribe(&self, connection_id: ConnectionId, room: &RoomName) -> Result<(), BroadcastError> {
        let mut groups = self.groups.write().await;
        if let Some(members) = groups.get_mut(room) {
            members.remove(&connection_id);
            if members.is_empty() {
                groups.remove(room);
            }
        }
        Ok(())
    }

    async fn broadcast(&self, room: &RoomName, event: ServerEvent) -> Result<(), BroadcastError> {
        self.deliver(room, None, event).await;
        Ok(())
    }

    async fn broadcast_except(
        &self,
        room: &RoomName,
        except: ConnectionId,
        event: ServerEvent,
    ) -> Result<(), BroadcastError> {
        self.deliver(room, Some(except), event).await;
        Ok(())
    }
}
