//! 连接会话
//!
//! 会话在连接认证成功时创建，连接断开时由断线清理器移除。
//! 每个事件都按连接 ID 显式查表，而不是在连接对象上挂动态属性。

use std::{collections::HashMap, sync::Arc};

use domain::{ConnectionId, UserId, Username};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{
    error::{ApplicationError, AuthFailure},
    identity::CredentialVerifier,
    repository::UserRepository,
};

/// 单个在线连接的认证身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub username: Username,
    pub avatar: Option<String>,
}

/// 握手阶段携带的凭证
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handshake {
    /// 显式认证字段（`Authorization: Bearer ...`）
    pub auth_token: Option<String>,
    /// 查询参数 `?token=...`
    pub query_token: Option<String>,
}

impl Handshake {
    /// 优先取显式认证字段，其次取查询参数；空串视为缺失
    pub fn credential(&self) -> Option<&str> {
        self.auth_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .or_else(|| self.query_token.as_deref().filter(|token| !token.is_empty()))
    }
}

/// 按连接 ID 索引的会话表
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<ConnectionId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: Session) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.connection_id, session);
    }

    pub async fn get(&self, connection_id: ConnectionId) -> Option<Session> {
        self.sessions.read().await.get(&connection_id).cloned()
    }

    pub async fn remove(&self, connection_id: ConnectionId) -> Option<Session> {
        self.sessions.write().await.remove(&connection_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// 连接认证：校验凭证、查询用户资料、登记会话
pub struct SessionBinder {
    verifier: Arc<dyn CredentialVerifier>,
    users: Arc<dyn UserRepository>,
    sessions: Arc<SessionStore>,
}

impl SessionBinder {
    pub fn new(
        verifier: Arc<dyn CredentialVerifier>,
        users: Arc<dyn UserRepository>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            verifier,
            users,
            sessions,
        }
    }

    /// 认证新连接。
    ///
    /// 返回错误时不会留下任何会话状态，调用方应立即关闭连接。
    pub async fn bind(
        &self,
        connection_id: ConnectionId,
        handshake: &Handshake,
    ) -> Result<Session, ApplicationError> {
        match self.authenticate(connection_id, handshake).await {
            Ok(session) => {
                self.sessions.insert(session.clone()).await;
                info!(
                    connection_id = %connection_id,
                    user_id = %session.user_id,
                    username = %session.username,
                    "连接认证成功"
                );
                Ok(session)
            }
            Err(err) => {
                warn!(connection_id = %connection_id, error = %err, "连接认证失败");
                Err(err)
            }
        }
    }

    async fn authenticate(
        &self,
        connection_id: ConnectionId,
        handshake: &Handshake,
    ) -> Result<Session, ApplicationError> {
        let token = handshake
            .credential()
            .ok_or(AuthFailure::MissingCredential)?;

        let principal = self.verifier.verify(token).await?;

        let user = self
            .users
            .find_by_id(principal.user_id)
            .await?
            .ok_or(AuthFailure::UserNotFound)?;

        Ok(Session {
            connection_id,
            user_id: user.id,
            username: user.username,
            avatar: user.avatar,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{MockCredentialVerifier, Principal};
    use crate::repository::MockUserRepository;
    use domain::{RepositoryError, User};
    use uuid::Uuid;

    fn alice() -> User {
        User::new(
            UserId::new(Uuid::new_v4()),
            Username::parse("alice").unwrap(),
            Some("a.jpg".to_string()),
        )
    }

    fn accepting_verifier(user: &User) -> MockCredentialVerifier {
        let principal = Principal {
            user_id: user.id,
            username: user.username.to_string(),
        };
        let mut verifier = MockCredentialVerifier::new();
        verifier
            .expect_verify()
            .returning(move |_| Ok(principal.clone()));
        verifier
    }

    fn users_returning(user: Option<User>) -> MockUserRepository {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(user.clone()));
        users
    }

    fn binder(
        verifier: MockCredentialVerifier,
        users: MockUserRepository,
    ) -> (SessionBinder, Arc<SessionStore>) {
        let sessions = Arc::new(SessionStore::new());
        let binder = SessionBinder::new(Arc::new(verifier), Arc::new(users), sessions.clone());
        (binder, sessions)
    }

    #[test]
    fn credential_prefers_explicit_auth_field() {
        let handshake = Handshake {
            auth_token: Some("from-header".into()),
            query_token: Some("from-query".into()),
        };
        assert_eq!(handshake.credential(), Some("from-header"));

        let handshake = Handshake {
            auth_token: Some(String::new()),
            query_token: Some("from-query".into()),
        };
        assert_eq!(handshake.credential(), Some("from-query"));

        assert_eq!(Handshake::default().credential(), None);
    }

    #[tokio::test]
    async fn bind_attaches_identity_and_avatar() {
        let user = alice();
        let (binder, sessions) = binder(accepting_verifier(&user), users_returning(Some(user.clone())));
        let connection_id = ConnectionId::generate();

        let handshake = Handshake {
            auth_token: None,
            query_token: Some("token".into()),
        };
        let session = binder.bind(connection_id, &handshake).await.unwrap();

        assert_eq!(session.user_id, user.id);
        assert_eq!(session.username.as_str(), "alice");
        assert_eq!(session.avatar.as_deref(), Some("a.jpg"));
        assert_eq!(sessions.get(connection_id).await, Some(session));
    }

    #[tokio::test]
    async fn missing_credential_never_calls_verifier() {
        let mut verifier = MockCredentialVerifier::new();
        verifier.expect_verify().never();
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().never();
        let (binder, sessions) = binder(verifier, users);

        let err = binder
            .bind(ConnectionId::generate(), &Handshake::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::Authentication(AuthFailure::MissingCredential)
        ));
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn rejected_token_creates_no_session() {
        let mut verifier = MockCredentialVerifier::new();
        verifier
            .expect_verify()
            .withf(|token| token == "expired")
            .returning(|_| Err(AuthFailure::InvalidCredential("ExpiredSignature".into())));
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().never();
        let (binder, sessions) = binder(verifier, users);

        let handshake = Handshake {
            auth_token: Some("expired".into()),
            query_token: None,
        };
        let err = binder.bind(ConnectionId::generate(), &handshake).await.unwrap_err();

        assert!(err.is_authentication());
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_user_creates_no_session() {
        let user = alice();
        let (binder, sessions) = binder(accepting_verifier(&user), users_returning(None));

        let handshake = Handshake {
            auth_token: Some("token".into()),
            query_token: None,
        };
        let err = binder.bind(ConnectionId::generate(), &handshake).await.unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::Authentication(AuthFailure::UserNotFound)
        ));
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn lookup_failure_creates_no_session() {
        let user = alice();
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(|_| Err(RepositoryError::storage("connection refused")));
        let (binder, sessions) = binder(accepting_verifier(&user), users);

        let handshake = Handshake {
            auth_token: Some("token".into()),
            query_token: None,
        };
        let err = binder.bind(ConnectionId::generate(), &handshake).await.unwrap_err();

        assert!(matches!(err, ApplicationError::Repository(_)));
        assert!(sessions.is_empty().await);
    }
}
