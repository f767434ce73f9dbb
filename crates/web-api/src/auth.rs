//! JWT 认证模块
//!
//! 提供 JWT token 生成、验证，并作为实时网关的凭证校验器。

use application::{AuthFailure, CredentialVerifier, Principal};
use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use config::JwtConfig;
use domain::{User, UserId};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// JWT Claims 结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub exp: i64, // 过期时间 (Unix timestamp)
}

/// JWT Token 服务
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 为用户签发 token
    pub fn generate_token(&self, user: &User) -> Result<String, ApiError> {
        let exp = chrono::Utc::now() + chrono::Duration::hours(self.config.expiration_hours);

        let claims = Claims {
            sub: user.id.into(),
            username: user.username.to_string(),
            avatar: user.avatar.clone(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| ApiError::internal_server_error(format!("token generation failed: {err}")))
    }

    /// 验证并解析 JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        self.decode_claims(token)
            .map_err(|err| ApiError::unauthorized(format!("invalid token: {err}")))
    }

    /// 从 `Authorization: Bearer` 头中提取并验证 token
    pub fn extract_claims(&self, headers: &HeaderMap) -> Result<Claims, ApiError> {
        let token = bearer_token(headers)
            .ok_or_else(|| ApiError::unauthorized("missing or malformed authorization header"))?;
        self.verify_token(&token)
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|token_data| token_data.claims)
    }
}

#[async_trait]
impl CredentialVerifier for JwtService {
    async fn verify(&self, token: &str) -> Result<Principal, AuthFailure> {
        let claims = self
            .decode_claims(token)
            .map_err(|err| AuthFailure::InvalidCredential(err.to_string()))?;

        Ok(Principal {
            user_id: UserId::from(claims.sub),
            username: claims.username,
        })
    }
}

/// 取出 bearer token；缺失、格式不对或为空时返回 `None`
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
