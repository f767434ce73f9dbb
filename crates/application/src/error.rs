use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::broadcaster::BroadcastError;

/// 连接认证失败的原因。对端只会看到连接被关闭。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("missing credential")]
    MissingCredential,
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    #[error("user not found")]
    UserNotFound,
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    /// 消息写入失败：只记录日志，不通知发送者，也不广播
    #[error("failed to persist message: {0}")]
    Persistence(RepositoryError),
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthFailure),
    #[error("broadcast error: {0}")]
    Broadcast(#[from] BroadcastError),
}

impl ApplicationError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, ApplicationError::Authentication(_))
    }
}
