use std::sync::Arc;

use domain::{ConnectionId, RoomName};
use tracing::{info, warn};

use crate::{
    broadcaster::RoomBroadcaster, error::ApplicationError, events::ServerEvent,
    presence::PresenceRegistry, session::SessionStore,
};

/// 断线清理：移除会话，把用户从所有房间中移除，并通知受影响的房间
pub struct DisconnectReconciler {
    sessions: Arc<SessionStore>,
    presence: Arc<PresenceRegistry>,
    broadcaster: Arc<dyn RoomBroadcaster>,
}

impl DisconnectReconciler {
    pub fn new(
        sessions: Arc<SessionStore>,
        presence: Arc<PresenceRegistry>,
        broadcaster: Arc<dyn RoomBroadcaster>,
    ) -> Self {
        Self {
            sessions,
            presence,
            broadcaster,
        }
    }

    /// 返回被通知的房间。未认证的连接什么都不做。
    ///
    /// 同名用户的其他连接仍在线时也会被移出在线列表。
    pub async fn disconnect(
        &self,
        connection_id: ConnectionId,
    ) -> Result<Vec<RoomName>, ApplicationError> {
        let Some(session) = self.sessions.remove(connection_id).await else {
            return Ok(Vec::new());
        };

        let affected = self.presence.remove_everywhere(&session.username).await;
        let mut notified = Vec::with_capacity(affected.len());

        for (room, members) in affected {
            // 单个房间广播失败不影响其余房间
            if let Err(err) = self
                .broadcaster
                .broadcast(&room, ServerEvent::Users(members))
                .await
            {
                warn!(room = %room, error = %err, "断线后广播在线列表失败");
                continue;
            }
            notified.push(room);
        }

        info!(
            connection_id = %connection_id,
            username = %session.username,
            rooms = notified.len(),
            "连接断开，已清理在线状态"
        );
        Ok(notified)
    }
}
