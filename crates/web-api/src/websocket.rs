//! WebSocket 传输层
//!
//! 每个连接分配一个 `ConnectionId` 和一个无界出站通道：
//! 发送任务把 `ServerEvent` 序列化为文本帧写回客户端，接收任务把文本帧解码为
//! `ClientEvent` 后按到达顺序交给 `RelayHub`。任一任务结束即执行一次断开清理。

use std::time::Duration;

use application::RelayHub;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use domain::{ClientEvent, ConnectionId, ServerEvent};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::{
    sync::mpsc,
    time::{self, Instant, Interval, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::state::AppState;

pub async fn websocket_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let max_message_size = state.socket.max_message_size;
    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = ConnectionId::new();
    let (sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<ServerEvent>();

    state.hub.connect(connection_id, tx).await;
    info!(connection_id = %connection_id, "WebSocket 连接已建立");

    let ping_interval = state.socket.ping_interval;
    let mut send_task = tokio::spawn(async move {
        forward_outbound(sender, rx, ping_interval, connection_id).await;
        debug!("Send task completed for connection: {}", connection_id);
    });

    let hub = state.hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                    break;
                }
            };

            // 任何入站帧都刷新活跃时间；连接已被清扫器关闭时停止读取
            if !hub.touch(connection_id).await {
                info!(connection_id = %connection_id, "连接已被关闭，停止接收");
                break;
            }

            match frame {
                Message::Text(text) => handle_text(&hub, connection_id, text.as_str()).await,
                Message::Binary(_) => {
                    debug!(connection_id = %connection_id, "Received binary frame (not supported)");
                }
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Close(_) => {
                    info!(connection_id = %connection_id, "WebSocket connection closed by client");
                    break;
                }
            }
        }

        debug!("Receive task completed for connection: {}", connection_id);
    });

    // 等待任一任务完成
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    match state.hub.close(connection_id).await {
        Some(summary) => info!(
            connection_id = %connection_id,
            identities = summary.primary.len() + summary.secondary.len() + summary.compat.len(),
            rooms = summary.rooms.len(),
            "WebSocket 连接已清理"
        ),
        None => debug!(connection_id = %connection_id, "连接已被提前清理"),
    }
}

/// 出站循环：通道关闭时结束，同时按间隔发送 Ping
async fn forward_outbound(
    mut sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
    ping_interval: Option<Duration>,
    connection_id: ConnectionId,
) {
    let mut ticker = ping_interval.map(ping_ticker);

    loop {
        let event = match ticker.as_mut() {
            Some(ticker) => tokio::select! {
                event = rx.recv() => event,
                _ = ticker.tick() => {
                    if sender.send(Message::Ping(Default::default())).await.is_err() {
                        break;
                    }
                    continue;
                }
            },
            None => rx.recv().await,
        };

        let Some(event) = event else {
            break;
        };

        match event.to_json() {
            Ok(text) => {
                if let Err(e) = sender.send(Message::Text(text.into())).await {
                    debug!(connection_id = %connection_id, error = %e, "Failed to send text frame");
                    break;
                }
            }
            Err(e) => {
                error!(connection_id = %connection_id, event = event.name(), error = %e, "Failed to serialize event");
            }
        }
    }

    let _ = sender.close().await;
}

fn ping_ticker(period: Duration) -> Interval {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// 解码失败的帧在这里被丢弃，不会进入中继核心，也不回复发送方
async fn handle_text(hub: &RelayHub, connection_id: ConnectionId, text: &str) {
    let event = match ClientEvent::from_json(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(connection_id = %connection_id, error = %e, "无法解析客户端事件，已丢弃");
            return;
        }
    };

    let name = event.name();
    let delivery = hub.dispatch(connection_id, event).await;
    debug!(connection_id = %connection_id, event = name, delivery = ?delivery, "事件已处理");
}
