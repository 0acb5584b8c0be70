//! 연결 서비스
//!
//! 디바이스 소켓 세션 테이블, 세션별 송신 채널, 연결 통계를 관리합니다.
//! 세션 종료는 멱등입니다: 테이블에서 먼저 꺼낸 쪽만 레지스트리 제거를 수행하므로
//! 하트비트 타임아웃과 소켓 종료가 동시에 일어나도 연결 해제 이벤트는 한 번만 발행됩니다.

use dashmap::DashMap;
use serde::Serialize;
use shared::DisconnectReason;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::protocol::Frame;
use crate::service::device_registry::DeviceRegistry;
use crate::tool::error::{GatewayError, GatewayResult};

/// 세션으로 프레임을 보내거나 세션을 닫는 핸들
#[derive(Debug, Clone)]
pub struct SessionLink {
    session_id: u64,
    outbound: mpsc::Sender<Frame>,
    close: Arc<Notify>,
    closed: Arc<AtomicBool>,
}

impl SessionLink {
    pub fn new(session_id: u64, outbound: mpsc::Sender<Frame>) -> Self {
        Self {
            session_id,
            outbound,
            close: Arc::new(Notify::new()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// 세션 송신 큐에 프레임 추가
    pub async fn send(&self, frame: Frame) -> GatewayResult<()> {
        self.outbound.send(frame).await.map_err(|_| {
            GatewayError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("세션 {} 송신 채널이 닫혔습니다", self.session_id),
            ))
        })
    }

    /// 세션 종료 요청. 읽기 루프가 대기 중이 아니어도 다음 대기에서 바로 깨어납니다.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.close.notify_one();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 종료 요청 대기
    pub async fn closed(&self) {
        if self.is_closed() {
            return;
        }
        self.close.notified().await;
    }
}

/// 세션 테이블 엔트리
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub addr: String,
    /// 인증된 경우 디바이스 토큰
    pub token: Option<String>,
    pub last_heartbeat: Instant,
    pub connected_at: Instant,
    pub link: SessionLink,
}

/// 연결 통계
#[derive(Debug, Default)]
pub struct ConnectionStats {
    total_connections: AtomicU64,
    current_connections: AtomicU64,
    peak_connections: AtomicU64,
    total_frames: AtomicU64,
    failed_logins: AtomicU64,
    timeout_disconnections: AtomicU64,
}

/// 연결 통계 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStatsSnapshot {
    pub total_connections: u64,
    pub current_connections: u64,
    pub peak_connections: u64,
    pub total_frames: u64,
    pub failed_logins: u64,
    pub timeout_disconnections: u64,
}

/// 연결 서비스
pub struct ConnectionService {
    sessions: DashMap<u64, SessionEntry>,
    next_session_id: AtomicU64,
    registry: Arc<DeviceRegistry>,
    max_connections: usize,
    stats: ConnectionStats,
}

impl ConnectionService {
    /// 새로운 연결 서비스 생성
    pub fn new(registry: Arc<DeviceRegistry>, max_connections: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            next_session_id: AtomicU64::new(1),
            registry,
            max_connections,
            stats: ConnectionStats::default(),
        }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// 새 세션 등록
    pub fn open_session(
        &self,
        addr: String,
        outbound: mpsc::Sender<Frame>,
    ) -> GatewayResult<SessionLink> {
        let current = self.sessions.len();
        if current >= self.max_connections {
            warn!("최대 연결 수 초과: {}/{} ({})", current, self.max_connections, addr);
            return Err(GatewayError::TooManyConnections(self.max_connections));
        }

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let link = SessionLink::new(session_id, outbound);
        let now = Instant::now();
        self.sessions.insert(
            session_id,
            SessionEntry {
                addr: addr.clone(),
                token: None,
                last_heartbeat: now,
                connected_at: now,
                link: link.clone(),
            },
        );

        self.stats.total_connections.fetch_add(1, Ordering::Relaxed);
        let current = self.stats.current_connections.fetch_add(1, Ordering::Relaxed) + 1;
        self.stats.peak_connections.fetch_max(current, Ordering::Relaxed);

        debug!("세션 {} 열림 ({})", session_id, addr);
        Ok(link)
    }

    /// 하트비트 갱신
    pub fn touch(&self, session_id: u64) {
        if let Some(mut entry) = self.sessions.get_mut(&session_id) {
            entry.last_heartbeat = Instant::now();
        }
    }

    /// 세션을 인증 상태로 전환
    pub fn mark_authenticated(&self, session_id: u64, token: &str) -> bool {
        match self.sessions.get_mut(&session_id) {
            Some(mut entry) => {
                entry.token = Some(token.to_string());
                entry.last_heartbeat = Instant::now();
                true
            }
            None => false,
        }
    }

    pub fn session_token(&self, session_id: u64) -> Option<String> {
        self.sessions
            .get(&session_id)
            .and_then(|entry| entry.token.clone())
    }

    pub fn link(&self, session_id: u64) -> Option<SessionLink> {
        self.sessions.get(&session_id).map(|entry| entry.link.clone())
    }

    pub fn record_frame(&self) {
        self.stats.total_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_login(&self) {
        self.stats.failed_logins.fetch_add(1, Ordering::Relaxed);
    }

    /// 세션 종료 (멱등)
    ///
    /// 인증된 세션이었다면 레지스트리에서도 제거합니다. 이미 종료된 세션이면 `false`.
    pub fn close_session(&self, session_id: u64, reason: DisconnectReason) -> bool {
        let Some((_, entry)) = self.sessions.remove(&session_id) else {
            return false;
        };

        entry.link.close();
        self.stats.current_connections.fetch_sub(1, Ordering::Relaxed);
        if reason == DisconnectReason::HeartbeatTimeout {
            self.stats
                .timeout_disconnections
                .fetch_add(1, Ordering::Relaxed);
        }

        if let Some(token) = entry.token {
            self.registry.remove(&token, session_id, reason);
        }

        info!(
            "세션 {} 종료 ({}, {:?}, 연결 유지 {:?})",
            session_id,
            entry.addr,
            reason,
            entry.connected_at.elapsed()
        );
        true
    }

    /// `timeout`보다 오래 트래픽이 없는 세션을 정리합니다.
    pub fn cleanup_timeout_connections(&self, timeout: Duration) -> usize {
        let expired: Vec<u64> = self
            .sessions
            .iter()
            .filter(|entry| entry.last_heartbeat.elapsed() > timeout)
            .map(|entry| *entry.key())
            .collect();

        expired
            .into_iter()
            .filter(|id| self.close_session(*id, DisconnectReason::HeartbeatTimeout))
            .count()
    }

    /// 현재 연결 수
    pub fn get_connection_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn get_connection_stats(&self) -> ConnectionStatsSnapshot {
        ConnectionStatsSnapshot {
            total_connections: self.stats.total_connections.load(Ordering::Relaxed),
            current_connections: self.stats.current_connections.load(Ordering::Relaxed),
            peak_connections: self.stats.peak_connections.load(Ordering::Relaxed),
            total_frames: self.stats.total_frames.load(Ordering::Relaxed),
            failed_logins: self.stats.failed_logins.load(Ordering::Relaxed),
            timeout_disconnections: self.stats.timeout_disconnections.load(Ordering::Relaxed),
        }
    }

    /// 모든 연결 종료 (서버 종료 시)
    pub fn close_all_connections(&self) -> usize {
        let ids: Vec<u64> = self.sessions.iter().map(|entry| *entry.key()).collect();
        let closed = ids
            .into_iter()
            .filter(|id| self.close_session(*id, DisconnectReason::Shutdown))
            .count();

        info!("모든 연결 종료: {}개", closed);
        closed
    }
}
