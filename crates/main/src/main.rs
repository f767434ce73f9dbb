//! 主应用程序入口
//!
//! 加载配置，装配仓储与实时网关，启动 Axum Web 服务。

use std::sync::Arc;

use application::{
    ChatGateway, ChatService, ChatServiceDependencies, Clock, GatewayDependencies,
    MessageRepository, SystemClock, UserRepository,
};
use config::AppConfig;
use infrastructure::{
    create_pg_pool, InMemoryMessageRepository, InMemoryUserRepository, LocalRoomHub,
    PgMessageRepository, PgUserRepository, MIGRATOR,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志，未设置 RUST_LOG 时默认 info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load()?;
    if config.uses_development_secret() {
        tracing::warn!("正在使用开发环境 JWT 密钥，生产环境请设置 JWT_SECRET");
    }

    let (user_repository, message_repository) = build_repositories(&config).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let hub = Arc::new(LocalRoomHub::new());
    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));

    let gateway = ChatGateway::new(GatewayDependencies {
        verifier: jwt_service.clone(),
        user_repository,
        message_repository: message_repository.clone(),
        broadcaster: hub.clone(),
        clock: clock.clone(),
    });

    let chat_service = ChatService::new(ChatServiceDependencies {
        message_repository,
        clock,
        history_limit: config.chat.history_limit,
    });

    let state = AppState::new(Arc::new(gateway), Arc::new(chat_service), hub, jwt_service);
    let app = router(state, &config.server.cors_origins);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("聊天室服务器启动在 http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("服务器已停止");
    Ok(())
}

/// 配置了数据库时使用 PostgreSQL（启动时执行迁移），否则使用内存仓储
async fn build_repositories(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn UserRepository>, Arc<dyn MessageRepository>)> {
    match config.database.url.as_deref() {
        Some(database_url) => {
            tracing::info!(
                "连接数据库: {}",
                database_url.rsplit('@').next().unwrap_or("unknown")
            );
            let pg_pool = create_pg_pool(database_url, config.database.max_connections).await?;
            MIGRATOR.run(&pg_pool).await?;

            Ok((
                Arc::new(PgUserRepository::new(pg_pool.clone())),
                Arc::new(PgMessageRepository::new(pg_pool)),
            ))
        }
        None => {
            tracing::warn!("未配置数据库，使用内存存储，重启后数据丢失");
            Ok((
                Arc::new(InMemoryUserRepository::new()),
                Arc::new(InMemoryMessageRepository::new()),
            ))
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "无法监听关闭信号");
        std::future::pending::<()>().await;
    }
    tracing::info!("收到关闭信号，开始优雅停机");
}
