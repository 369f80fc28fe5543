//! 主应用程序入口
//!
//! 加载配置，装配持久化网关、中继核心与存活检测，然后启动 Axum 服务。

use std::sync::Arc;

use application::{
    ConversationService, ConversationServiceDependencies, EvictionPolicy, LivenessSweeper,
    RelayHub, RelayHubDependencies, SystemClock, UserService, UserServiceDependencies,
};
use config::AppConfig;
use infrastructure::Infrastructure;
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, SocketSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    tracing::info!(config = %config.sanitize(), "配置已加载");

    let infra = Infrastructure::connect(&config.storage).await?;
    let storage = infra.storage.clone();

    // 连接中枢同时承担连接管理与消息路由
    let hub = Arc::new(RelayHub::new(RelayHubDependencies {
        connections: infra.connections.clone(),
        router: infra.connections.clone(),
        users: storage.users.clone(),
    }));

    let policy = EvictionPolicy {
        enabled: config.heartbeat.enabled,
        interval: config.heartbeat.interval(),
        timeout: config.heartbeat.timeout(),
    };
    let sweeper = LivenessSweeper::new(hub.clone(), policy).spawn();

    let conversation_service = Arc::new(ConversationService::new(
        ConversationServiceDependencies {
            users: storage.users.clone(),
            conversations: storage.conversations.clone(),
            messages: storage.messages.clone(),
            clock: Arc::new(SystemClock),
        },
    ));
    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        users: storage.users.clone(),
    }));

    let state = AppState::new(
        hub,
        conversation_service,
        user_service,
        SocketSettings::from_config(&config.websocket, &config.heartbeat),
    );

    let app = router(state, &config.server.cors_origins);
    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!("中继服务器启动在 http://{}", address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    tracing::info!("服务器已停止");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "无法监听退出信号");
        std::future::pending::<()>().await;
    }
    tracing::info!("收到退出信号，开始关闭");
}
