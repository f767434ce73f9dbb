use std::sync::Arc;

use domain::{ConnectionId, RoomName};

use crate::{
    broadcaster::RoomBroadcaster,
    clock::Clock,
    disconnect::DisconnectReconciler,
    error::ApplicationError,
    events::ClientEvent,
    identity::CredentialVerifier,
    presence::PresenceRegistry,
    repository::{MessageRepository, UserRepository},
    router::{EventOutcome, RoomEventRouter},
    session::{Handshake, Session, SessionBinder, SessionStore},
};

pub struct GatewayDependencies {
    pub verifier: Arc<dyn CredentialVerifier>,
    pub user_repository: Arc<dyn UserRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub broadcaster: Arc<dyn RoomBroadcaster>,
    pub clock: Arc<dyn Clock>,
}

/// 实时网关：传输层只需要调用 connect / handle / disconnect 三个入口。
///
/// 内部组件共享同一份会话表与在线状态表。
pub struct ChatGateway {
    binder: SessionBinder,
    router: RoomEventRouter,
    reconciler: DisconnectReconciler,
    presence: Arc<PresenceRegistry>,
    sessions: Arc<SessionStore>,
}

impl ChatGateway {
    pub fn new(deps: GatewayDependencies) -> Self {
        let sessions = Arc::new(SessionStore::new());
        let presence = Arc::new(PresenceRegistry::new());

        let binder = SessionBinder::new(deps.verifier, deps.user_repository, sessions.clone());
        let router = RoomEventRouter::new(
            sessions.clone(),
            presence.clone(),
            deps.broadcaster.clone(),
            deps.message_repository,
            deps.clock,
        );
        let reconciler =
            DisconnectReconciler::new(sessions.clone(), presence.clone(), deps.broadcaster);

        Self {
            binder,
            router,
            reconciler,
            presence,
            sessions,
        }
    }

    pub async fn connect(
        &self,
        connection_id: ConnectionId,
        handshake: &Handshake,
    ) -> Result<Session, ApplicationError> {
        self.binder.bind(connection_id, handshake).await
    }

    pub async fn handle(
        &self,
        connection_id: ConnectionId,
        event: ClientEvent,
    ) -> Result<EventOutcome, ApplicationError> {
        self.router.dispatch(connection_id, event).await
    }

    pub async fn disconnect(
        &self,
        connection_id: ConnectionId,
    ) -> Result<Vec<RoomName>, ApplicationError> {
        self.reconciler.disconnect(connection_id).await
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}
