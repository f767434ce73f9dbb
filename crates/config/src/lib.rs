//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 服务监听地址
//! - JWT认证
//! - 消息存储（可选的 PostgreSQL）
//! - 聊天历史设置
//!
//! 加载顺序（后者覆盖前者）：内置默认值 → YAML 文件 → `CHATROOM_` 前缀环境变量
//! → 兼容旧部署的扁平环境变量（`DATABASE_URL`、`JWT_SECRET`、`SERVER_HOST`、`SERVER_PORT`）。

use std::env;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "CHATROOM_CONFIG";
/// 默认配置文件
pub const DEFAULT_CONFIG_PATH: &str = "chatroom.yaml";

const DEV_JWT_SECRET: &str = "dev-secret-key-not-for-production-use-minimum-32-chars";

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// 服务配置
    #[validate(nested)]
    pub server: ServerConfig,
    /// JWT认证配置
    #[validate(nested)]
    pub jwt: JwtConfig,
    /// 数据库配置
    #[validate(nested)]
    pub database: DatabaseConfig,
    /// 聊天配置
    #[validate(nested)]
    pub chat: ChatConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// JWT配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JwtConfig {
    #[validate(length(min = 32, message = "JWT secret must be at least 32 characters long"))]
    pub secret: String,
    #[validate(range(min = 1))]
    pub expiration_hours: i64,
}

/// 数据库配置
///
/// 未配置 `url` 时使用进程内存储，重启后数据丢失。
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    #[validate(url)]
    pub url: Option<String>,
    #[validate(range(min = 1))]
    pub max_connections: u32,
}

/// 聊天配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChatConfig {
    /// 历史消息接口一次返回的最大条数
    #[validate(range(min = 1, max = 500))]
    pub history_limit: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
            },
            jwt: JwtConfig {
                secret: DEV_JWT_SECRET.to_string(),
                expiration_hours: 24,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
            },
            chat: ChatConfig { history_limit: 50 },
        }
    }
}

impl AppConfig {
    /// 组装配置来源
    pub fn figment() -> Figment {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("CHATROOM_").split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database.url".into()))
            .merge(Env::raw().only(&["JWT_SECRET"]).map(|_| "jwt.secret".into()))
            .merge(Env::raw().only(&["SERVER_HOST"]).map(|_| "server.host".into()))
            .merge(Env::raw().only(&["SERVER_PORT"]).map(|_| "server.port".into()))
    }

    /// 加载并校验配置
    pub fn load() -> Result<Self, ConfigError> {
        let config: AppConfig = Self::figment().extract()?;
        config.validate_all()?;
        Ok(config)
    }

    /// 字段级校验之外的组合校验
    pub fn validate_all(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::InvalidJwtSecret(
                "JWT secret cannot be blank".to_string(),
            ));
        }

        Ok(())
    }

    /// 是否仍在使用内置的开发密钥
    pub fn uses_development_secret(&self) -> bool {
        self.jwt.secret == DEV_JWT_SECRET
    }

    /// 监听地址，形如 `127.0.0.1:8080`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("Invalid JWT secret: {0}")]
    InvalidJwtSecret(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}
