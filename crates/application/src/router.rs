//! 房间事件路由
//!
//! 已认证连接发来的 join / leave / message / typing / seen 事件在这里处理。
//! 缺少会话或缺少必填字段的事件被静默丢弃，对端收不到任何错误。

use std::sync::Arc;

use domain::{ConnectionId, MessageContent, NewChatMessage, RoomName};
use tracing::{debug, error, info};

use crate::{
    broadcaster::RoomBroadcaster,
    clock::Clock,
    error::ApplicationError,
    events::{
        ClientEvent, MessageView, RoomPayload, SeenNotice, SendMessagePayload, ServerEvent,
        TypingNotice, TypingPayload,
    },
    presence::PresenceRegistry,
    repository::MessageRepository,
    session::{Session, SessionStore},
};

/// 单个事件的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Delivered,
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// 连接没有已认证的会话
    Unauthenticated,
    MissingRoom,
    MissingContent,
}

pub struct RoomEventRouter {
    sessions: Arc<SessionStore>,
    presence: Arc<PresenceRegistry>,
    broadcaster: Arc<dyn RoomBroadcaster>,
    messages: Arc<dyn MessageRepository>,
    clock: Arc<dyn Clock>,
}

impl RoomEventRouter {
    pub fn new(
        sessions: Arc<SessionStore>,
        presence: Arc<PresenceRegistry>,
        broadcaster: Arc<dyn RoomBroadcaster>,
        messages: Arc<dyn MessageRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            presence,
            broadcaster,
            messages,
            clock,
        }
    }

    pub async fn dispatch(
        &self,
        connection_id: ConnectionId,
        event: ClientEvent,
    ) -> Result<EventOutcome, ApplicationError> {
        let Some(session) = self.sessions.get(connection_id).await else {
            debug!(connection_id = %connection_id, event = event.name(), "未认证连接的事件被丢弃");
            return Ok(EventOutcome::Dropped(DropReason::Unauthenticated));
        };

        match event {
            ClientEvent::Join(payload) => self.join(&session, payload).await,
            ClientEvent::Leave(payload) => self.leave(&session, payload).await,
            ClientEvent::Message(payload) => self.message(&session, payload).await,
            ClientEvent::Typing(payload) => self.typing(&session, payload).await,
            ClientEvent::Seen(payload) => self.seen(&session, payload).await,
        }
    }

    async fn join(
        &self,
        session: &Session,
        payload: RoomPayload,
    ) -> Result<EventOutcome, ApplicationError> {
        let Some(room) = required_room(payload.room) else {
            return Ok(EventOutcome::Dropped(DropReason::MissingRoom));
        };

        self.broadcaster
            .subscribe(session.connection_id, &room)
            .await?;
        let members = self.presence.join(&room, &session.username).await;
        info!(room = %room, username = %session.username, members = members.len(), "用户加入房间");

        self.broadcaster
            .broadcast(&room, ServerEvent::Users(members))
            .await?;
        Ok(EventOutcome::Delivered)
    }

    async fn leave(
        &self,
        session: &Session,
        payload: RoomPayload,
    ) -> Result<EventOutcome, ApplicationError> {
        let Some(room) = required_room(payload.room) else {
            return Ok(EventOutcome::Dropped(DropReason::MissingRoom));
        };

        self.broadcaster
            .unsubscribe(session.connection_id, &room)
            .await?;

        if let Some(members) = self.presence.leave(&room, &session.username).await {
            info!(room = %room, username = %session.username, "用户离开房间");
            self.broadcaster
                .broadcast(&room, ServerEvent::Users(members))
                .await?;
        }
        Ok(EventOutcome::Delivered)
    }

    async fn message(
        &self,
        session: &Session,
        payload: SendMessagePayload,
    ) -> Result<EventOutcome, ApplicationError> {
        let Some(room) = required_room(payload.room) else {
            return Ok(EventOutcome::Dropped(DropReason::MissingRoom));
        };
        let Some(content) = payload
            .content
            .and_then(|content| MessageContent::new(content).ok())
        else {
            return Ok(EventOutcome::Dropped(DropReason::MissingContent));
        };

        let message = NewChatMessage::new(
            session.username.clone(),
            content,
            room.clone(),
            payload.file,
            session.avatar.clone(),
        );

        let stored = match self.messages.save(message).await {
            Ok(stored) => stored,
            Err(err) => {
                error!(room = %room, sender = %session.username, error = %err, "消息持久化失败");
                return Err(ApplicationError::Persistence(err));
            }
        };

        let view = MessageView::from_stored(&stored, session.avatar.as_deref(), self.clock.now());
        self.broadcaster
            .broadcast(&room, ServerEvent::Message(view))
            .await?;
        Ok(EventOutcome::Delivered)
    }

    async fn typing(
        &self,
        session: &Session,
        payload: TypingPayload,
    ) -> Result<EventOutcome, ApplicationError> {
        let Some(room) = required_room(payload.room) else {
            return Ok(EventOutcome::Dropped(DropReason::MissingRoom));
        };

        let notice = TypingNotice {
            user: session.username.clone(),
            typing: payload.typing,
        };
        self.broadcaster
            .broadcast_except(&room, session.connection_id, ServerEvent::Typing(notice))
            .await?;
        Ok(EventOutcome::Delivered)
    }

    async fn seen(
        &self,
        session: &Session,
        payload: RoomPayload,
    ) -> Result<EventOutcome, ApplicationError> {
        let Some(room) = required_room(payload.room) else {
            return Ok(EventOutcome::Dropped(DropReason::MissingRoom));
        };

        let notice = SeenNotice {
            by: session.username.clone(),
        };
        self.broadcaster
            .broadcast(&room, ServerEvent::Seen(notice))
            .await?;
        Ok(EventOutcome::Delivered)
    }
}

fn required_room(room: Option<String>) -> Option<RoomName> {
    room.and_then(|room| RoomName::parse(room).ok())
}
