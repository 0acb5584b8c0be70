//! 실시간 WebSocket 서비스
//!
//! 대시보드 클라이언트의 WebSocket 연결을 수락하고, 연결마다 구독자를 등록해
//! 요청 응답과 브로드캐스트 이벤트를 같은 송신 큐로 내보냅니다.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use shared::DeviceControl;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::config::RealtimeConfig;
use crate::handler::ClientHandler;
use crate::protocol::ServerMessage;
use crate::service::{
    AuthService, BroadcastStats, SubscriptionBroadcaster, SUBSCRIBER_QUEUE_CAPACITY,
};

/// 실시간 서버
pub struct RealtimeService {
    config: RealtimeConfig,
    broadcaster: Arc<SubscriptionBroadcaster>,
    handler: Arc<ClientHandler>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeService {
    pub fn new(config: RealtimeConfig, control: Arc<dyn DeviceControl>) -> Self {
        let broadcaster = Arc::new(SubscriptionBroadcaster::new());
        let auth = AuthService::new(config.jwt_secret.clone());
        let handler = Arc::new(ClientHandler::new(broadcaster.clone(), auth, control));

        Self {
            config,
            broadcaster,
            handler,
            accept_task: Mutex::new(None),
        }
    }

    /// 리스너를 바인딩하고 수락 루프를 시작합니다. 실제 바인딩 주소를 돌려줍니다.
    pub async fn start(&self) -> Result<SocketAddr> {
        let mut accept_task = self.accept_task.lock().await;
        if accept_task.is_some() {
            anyhow::bail!("실시간 서버가 이미 실행 중입니다");
        }

        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("WebSocket 리스너 바인드 실패: {}", bind_addr))?;
        let addr = listener.local_addr()?;
        info!("✅ 실시간 WebSocket 서버 실행 중: ws://{}", addr);

        *accept_task = Some(tokio::spawn(accept_loop(
            listener,
            self.handler.clone(),
            self.broadcaster.clone(),
        )));
        Ok(addr)
    }

    pub async fn stop(&self) {
        if let Some(task) = self.accept_task.lock().await.take() {
            task.abort();
            info!("✅ 실시간 서버가 중지되었습니다");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.accept_task.lock().await.is_some()
    }

    /// 이벤트 브리지에 연결할 브로드캐스터
    pub fn broadcaster(&self) -> Arc<SubscriptionBroadcaster> {
        self.broadcaster.clone()
    }

    pub fn get_stats(&self) -> BroadcastStats {
        self.broadcaster.get_stats()
    }
}

async fn accept_loop(
    listener: TcpListener,
    handler: Arc<ClientHandler>,
    broadcaster: Arc<SubscriptionBroadcaster>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!("새 WebSocket TCP 연결: {}", addr);
                let handler = handler.clone();
                let broadcaster = broadcaster.clone();
                tokio::spawn(async move {
                    if let Err(e) = serve_client(stream, addr, handler, broadcaster).await {
                        warn!("WebSocket 세션 종료 ({}): {}", addr, e);
                    }
                });
            }
            Err(e) => {
                error!("WebSocket 연결 수락 실패: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

/// 클라이언트 세션 하나를 처리합니다.
async fn serve_client(
    stream: TcpStream,
    addr: SocketAddr,
    handler: Arc<ClientHandler>,
    broadcaster: Arc<SubscriptionBroadcaster>,
) -> crate::error::RealtimeResult<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sink, mut ws_source) = ws_stream.split();

    let (tx, mut rx) = mpsc::channel::<Message>(SUBSCRIBER_QUEUE_CAPACITY);
    let subscriber_id = broadcaster.register(tx);
    info!("대시보드 클라이언트 연결: {} ({})", addr, subscriber_id);

    let mut writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_sink.send(message).await {
                debug!("WebSocket 전송 실패: {}", e);
                break;
            }
        }
        let _ = ws_sink.close().await;
    });

    let mut result = Ok(());
    while let Some(message) = ws_source.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                result = Err(e.into());
                break;
            }
        };

        match message {
            Message::Text(text) => {
                let reply = handler.handle_text(subscriber_id, &text).await;
                if broadcaster.send_to(subscriber_id, &reply).is_err() {
                    break;
                }
            }
            Message::Binary(_) => {
                let reply = ServerMessage::error("바이너리 메시지는 지원하지 않습니다");
                if broadcaster.send_to(subscriber_id, &reply).is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            // ping/pong은 tungstenite가 처리
            _ => {}
        }
    }

    // 구독자를 지우면 송신 큐가 닫히고 writer가 끝남
    broadcaster.remove(subscriber_id);
    if tokio::time::timeout(Duration::from_secs(1), &mut writer)
        .await
        .is_err()
    {
        writer.abort();
    }

    info!("대시보드 클라이언트 연결 종료: {} ({})", addr, subscriber_id);
    result
}
