//! 单元测试用的替身实现

use std::collections::HashSet;

use async_trait::async_trait;
use domain::{ConnectionId, RoomName, Timestamp, Username};
use tokio::sync::Mutex;

use crate::{
    broadcaster::{BroadcastError, RoomBroadcaster},
    clock::Clock,
    events::ServerEvent,
};

pub fn room(name: &str) -> RoomName {
    RoomName::parse(name).unwrap()
}

pub fn user(name: &str) -> Username {
    Username::parse(name).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub room: RoomName,
    pub except: Option<ConnectionId>,
    pub event: ServerEvent,
}

/// 记录所有分组变更与广播，不做真实投递
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    subscriptions: Mutex<HashSet<(ConnectionId, RoomName)>>,
    deliveries: Mutex<Vec<Delivery>>,
    failing_rooms: Mutex<HashSet<RoomName>>,
}

impl RecordingBroadcaster {
    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }

    pub async fn is_subscribed(&self, connection_id: ConnectionId, room: &RoomName) -> bool {
        self.subscriptions
            .lock()
            .await
            .contains(&(connection_id, room.clone()))
    }

    /// 之后对该房间的广播全部失败
    pub async fn fail_room(&self, room: RoomName) {
        self.failing_rooms.lock().await.insert(room);
    }

    async fn record(
        &self,
        room: &RoomName,
        except: Option<ConnectionId>,
        event: ServerEvent,
    ) -> Result<(), BroadcastError> {
        if self.failing_rooms.lock().await.contains(room) {
            return Err(BroadcastError::failed(format!("room {room} unavailable")));
        }
        self.deliveries.lock().await.push(Delivery {
            room: room.clone(),
            except,
            event,
        });
        Ok(())
    }
}

#[async_trait]
impl RoomBroadcaster for RecordingBroadcaster {
    async fn subscribe(&self, connection_id: ConnectionId, room: &RoomName) -> Result<(), BroadcastError> {
        self.subscriptions
            .lock()
            .await
            .insert((connection_id, room.clone()));
        Ok(())
    }

    async fn unsubscribe(&self, connection_id: ConnectionId, room: &RoomName) -> Result<(), BroadcastError> {
        self.subscriptions
            .lock()
            .await
            .remove(&(connection_id, room.clone()));
        Ok(())
    }

    async fn broadcast(&self, room: &RoomName, event: ServerEvent) -> Result<(), BroadcastError> {
        self.record(room, None, event).await
    }

    async fn broadcast_except(
        &self,
        room: &RoomName,
        except: ConnectionId,
        event: ServerEvent,
    ) -> Result<(), BroadcastError> {
        self.record(room, Some(except), event).await
    }
}

pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}
