#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use application::{ChatGateway, ChatService, ChatServiceDependencies, Clock, GatewayDependencies, SystemClock};
use domain::{User, UserId, Username};
use futures_util::{SinkExt, StreamExt};
use infrastructure::{InMemoryMessageRepository, InMemoryUserRepository, LocalRoomHub};
use serde_json::Value;
use tokio::{net::TcpListener, net::TcpStream, sync::oneshot, time::timeout};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, Message},
    MaybeTlsStream, WebSocketStream,
};
use uuid::Uuid;
use web_api::{router, AppState, JwtConfig, JwtService};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const TEST_SECRET: &str = "integration-test-secret-with-32-chars!";
const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const SILENCE_WINDOW: Duration = Duration::from_millis(200);

/// 使用内存仓储启动一个真实监听的服务实例
pub struct TestApp {
    pub addr: SocketAddr,
    pub jwt: Arc<JwtService>,
    pub users: Arc<InMemoryUserRepository>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let users = Arc::new(InMemoryUserRepository::new());
        let messages = Arc::new(InMemoryMessageRepository::new());
        let hub = Arc::new(LocalRoomHub::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let jwt = Arc::new(JwtService::new(JwtConfig {
            secret: TEST_SECRET.to_string(),
            expiration_hours: 1,
        }));

        let gateway = ChatGateway::new(GatewayDependencies {
            verifier: jwt.clone(),
            user_repository: users.clone(),
            message_repository: messages.clone(),
            broadcaster: hub.clone(),
            clock: clock.clone(),
        });
        let chat_service = ChatService::new(ChatServiceDependencies {
            message_repository: messages,
            clock,
            history_limit: 50,
        });

        let state = AppState::new(Arc::new(gateway), Arc::new(chat_service), hub, jwt.clone());
        let app = router(state, &["*".to_string()]);

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

        Self {
            addr,
            jwt,
            users,
            shutdown: Some(shutdown_tx),
        }
    }

    /// 写入用户资料并签发 token
    pub async fn register(&self, name: &str, avatar: Option<&str>) -> String {
        let user = User::new(
            UserId::new(Uuid::new_v4()),
            Username::parse(name).expect("username"),
            avatar.map(str::to_string),
        );
        self.users.insert(user.clone()).await;
        self.jwt.generate_token(&user).expect("token")
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn connect(&self, token: &str) -> WsClient {
        let url = format!("ws://{}/api/v1/ws?token={}", self.addr, token);
        let (ws, _) = connect_async(url).await.expect("websocket connect");
        ws
    }

    pub async fn connect_with_header(&self, token: &str) -> WsClient {
        let mut request = format!("ws://{}/api/v1/ws", self.addr)
            .into_client_request()
            .expect("request");
        request.headers_mut().insert(
            "Authorization",
            format!("Bearer {token}").parse().expect("header"),
        );
        let (ws, _) = connect_async(request).await.expect("websocket connect");
        ws
    }

    pub async fn connect_anonymous(&self) -> WsClient {
        let url = format!("ws://{}/api/v1/ws", self.addr);
        let (ws, _) = connect_async(url).await.expect("websocket connect");
        ws
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

pub async fn send_event(ws: &mut WsClient, event: Value) {
    ws.send(Message::Text(event.to_string().into()))
        .await
        .expect("send event");
}

/// 下一个文本帧，解析为 JSON；跳过控制帧
pub async fn next_event(ws: &mut WsClient) -> Value {
    loop {
        let frame = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .expect("websocket error");
        match frame {
            Message::Text(text) => return serde_json::from_str(text.as_str()).expect("json frame"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// 短时间内没有任何文本帧
pub async fn expect_silence(ws: &mut WsClient) {
    if let Ok(Some(Ok(Message::Text(text)))) = timeout(SILENCE_WINDOW, ws.next()).await {
        panic!("expected no event, got {text}");
    }
}

/// 连接被服务端关闭：收到关闭帧、流结束或连接错误
pub async fn expect_closed(ws: &mut WsClient) {
    let frame = timeout(RECV_TIMEOUT, ws.next())
        .await
        .expect("timed out waiting for close");
    match frame {
        None | Some(Err(_)) | Some(Ok(Message::Close(_))) => {}
        Some(Ok(other)) => panic!("expected close, got {other:?}"),
    }
}
