#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use application::{
    ConversationService, ConversationServiceDependencies, RelayHub, RelayHubDependencies,
    SystemClock, UserService, UserServiceDependencies,
};
use config::AppConfig;
use domain::UserProfile;
use futures_util::{SinkExt, StreamExt};
use infrastructure::{InMemoryStore, Infrastructure};
use serde_json::Value;
use tokio::{net::TcpListener, sync::oneshot, time::timeout};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as TungsteniteMessage, MaybeTlsStream, WebSocketStream,
};
use web_api::{router, AppState, SocketSettings};

pub type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub hub: Arc<RelayHub>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn http(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// 预置用户 A / B / C 并在随机端口启动服务
pub async fn spawn_server() -> TestServer {
    let store = InMemoryStore::new();
    store.seed_user(UserProfile::new("A", "+100", "Alice")).await;
    store.seed_user(UserProfile::new("B", "+200", "Bob")).await;
    store.seed_user(UserProfile::new("C", "+300", "Carol")).await;

    let infra = Infrastructure::with_memory_store(store);
    serve(infra, SocketSettings::default(), &["*".to_string()]).await
}

/// 与二进制入口相同：由配置构建持久化网关后启动
pub async fn spawn_server_from_config(config: &AppConfig) -> TestServer {
    let infra = Infrastructure::connect(&config.storage)
        .await
        .expect("infrastructure from config");
    let socket = SocketSettings::from_config(&config.websocket, &config.heartbeat);
    serve(infra, socket, &config.server.cors_origins).await
}

async fn serve(infra: Infrastructure, socket: SocketSettings, cors_origins: &[String]) -> TestServer {
    let storage = infra.storage.clone();

    let hub = Arc::new(RelayHub::new(RelayHubDependencies {
        connections: infra.connections.clone(),
        router: infra.connections.clone(),
        users: storage.users.clone(),
    }));
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
        hub.clone(),
        conversation_service,
        user_service,
        socket,
    );
    let app = router(state, cors_origins);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    TestServer {
        addr,
        hub,
        shutdown: Some(shutdown_tx),
    }
}

pub async fn connect(server: &TestServer) -> WsClient {
    let (socket, _) = connect_async(server.ws_url()).await.expect("ws connect");
    socket
}

pub async fn send_event(socket: &mut WsClient, event: Value) {
    socket
        .send(TungsteniteMessage::Text(event.to_string().into()))
        .await
        .expect("send frame");
}

/// 读取下一个文本帧，超时返回 `None`
pub async fn next_event(socket: &mut WsClient) -> Option<Value> {
    loop {
        let frame = timeout(Duration::from_millis(500), socket.next())
            .await
            .ok()??
            .ok()?;
        if let TungsteniteMessage::Text(text) = frame {
            return serde_json::from_str(text.as_str()).ok();
        }
    }
}

/// 跳过其它事件，读取指定名称的下一个事件
pub async fn next_named(socket: &mut WsClient, name: &str) -> Option<Value> {
    while let Some(event) = next_event(socket).await {
        if event["event"] == name {
            return Some(event);
        }
    }
    None
}

/// 等待中继核心处理完之前发送的帧
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
