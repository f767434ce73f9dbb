use application::{ClientEvent, EventOutcome, Handshake};
use axum::{
    body::Bytes,
    extract::ws::{Message as WsMessage, WebSocket},
};
use domain::ConnectionId;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::state::AppState;

/// WebSocket 连接管理器
///
/// 封装单个 WebSocket 连接的生命周期：
/// - 升级后认证，失败立即关闭
/// - 入站事件按到达顺序逐个交给网关处理
/// - 房间广播经出站通道写回客户端
/// - 断开后注销广播分组并清理在线状态
pub struct WebSocketConnection {
    state: AppState,
    connection_id: ConnectionId,
    handshake: Handshake,
}

impl WebSocketConnection {
    pub fn new(state: AppState, handshake: Handshake) -> Self {
        Self {
            state,
            connection_id: ConnectionId::generate(),
            handshake,
        }
    }

    pub async fn run(self, mut socket: WebSocket) {
        let connection_id = self.connection_id;

        // 认证失败不留任何状态，对端只会看到连接被关闭
        if self
            .state
            .gateway
            .connect(connection_id, &self.handshake)
            .await
            .is_err()
        {
            if socket.send(WsMessage::Close(None)).await.is_err() {
                tracing::debug!(connection_id = %connection_id, "关闭未认证连接时对端已断开");
            }
            return;
        }

        let mut outbound = self.state.hub.register(connection_id).await;
        let (mut sender, mut incoming) = socket.split();

        // 创建 mpsc channel 来解耦对 sender 的访问
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<WsCommand>(32);

        // 发送任务：统一处理所有对 WebSocket sender 的写操作
        let mut send_task = tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    Some(cmd) = cmd_rx.recv() => match cmd {
                        WsCommand::SendPong(data) => WsMessage::Pong(data),
                    },
                    Some(event) = outbound.recv() => match event.to_json() {
                        Ok(json) => WsMessage::Text(json.into()),
                        Err(err) => {
                            tracing::warn!(error = %err, event = event.name(), "failed to serialize websocket payload");
                            continue;
                        }
                    },
                    else => break,
                };

                if sender.send(message).await.is_err() {
                    tracing::debug!(connection_id = %connection_id, "WebSocket 写入失败");
                    break;
                }
            }
        });

        // 接收任务：同一连接的事件串行处理，保证到达顺序
        let state = self.state.clone();
        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(message)) = incoming.next().await {
                if Self::handle_incoming(&state, connection_id, message, &cmd_tx)
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        // 任意一个任务结束即视为连接断开
        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }

        self.state.hub.unregister(connection_id).await;
        match self.state.gateway.disconnect(connection_id).await {
            Ok(rooms) => {
                tracing::info!(connection_id = %connection_id, rooms = rooms.len(), "WebSocket 连接已断开");
            }
            Err(err) => {
                tracing::error!(connection_id = %connection_id, error = %err, "断线清理失败");
            }
        }
    }

    /// 返回 `Err` 表示应结束接收循环
    async fn handle_incoming(
        state: &AppState,
        connection_id: ConnectionId,
        message: WsMessage,
        cmd_tx: &mpsc::Sender<WsCommand>,
    ) -> Result<(), ()> {
        match message {
            WsMessage::Close(_) => {
                tracing::debug!(connection_id = %connection_id, "WebSocket 收到关闭消息");
                return Err(());
            }
            WsMessage::Ping(data) => {
                if cmd_tx.send(WsCommand::SendPong(data)).await.is_err() {
                    return Err(());
                }
            }
            WsMessage::Pong(_) | WsMessage::Binary(_) => {}
            WsMessage::Text(text) => {
                let event = match ClientEvent::parse(text.as_str()) {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::debug!(connection_id = %connection_id, error = %err, "忽略无法解析的消息");
                        return Ok(());
                    }
                };

                let name = event.name();
                match state.gateway.handle(connection_id, event).await {
                    Ok(EventOutcome::Delivered) => {}
                    Ok(EventOutcome::Dropped(reason)) => {
                        tracing::debug!(connection_id = %connection_id, event = name, ?reason, "事件被丢弃");
                    }
                    Err(err) => {
                        tracing::warn!(connection_id = %connection_id, event = name, error = %err, "事件处理失败");
                    }
                }
            }
        }
        Ok(())
    }
}

/// WebSocket 写操作命令
#[derive(Debug)]
enum WsCommand {
    SendPong(Bytes),
}
