use async_trait::async_trait;
use domain::UserId;

use crate::error::AuthFailure;

/// 凭证校验通过后得到的主体。只携带 ID 与用户名，头像需要另行查询。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
}

/// 身份服务：校验 bearer 凭证
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, AuthFailure>;
}
