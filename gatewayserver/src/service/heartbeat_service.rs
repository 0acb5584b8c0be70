//! 하트비트 서비스
//!
//! 주기적으로 세션 테이블을 훑어 마지막 트래픽이 타임아웃보다 오래된 세션을 강제로 닫습니다.
//! 핑뿐 아니라 정상 처리된 모든 프레임이 하트비트를 갱신합니다.

use anyhow::{bail, Result};
use serde::Serialize;
use shared::tool::CurrentTime;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::service::ConnectionService;

/// 하트비트 서비스
pub struct HeartbeatService {
    connection_service: Arc<ConnectionService>,
    is_running: Arc<Mutex<bool>>,
    cleanup_handle: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
    sweep_interval: Duration,
    connection_timeout: Duration,
    heartbeat_stats: Arc<Mutex<HeartbeatStats>>,
}

/// 하트비트 통계
#[derive(Debug, Clone, Default, Serialize)]
pub struct HeartbeatStats {
    pub sweeps: u64,
    pub timeout_cleanups: u64,
    /// 마지막 정리 실행 시각 (Unix timestamp)
    pub last_sweep_timestamp: Option<i64>,
    /// 마지막으로 타임아웃 세션을 실제로 닫은 시각 (Unix timestamp)
    pub last_eviction_timestamp: Option<i64>,
    pub active_connections: usize,
}

impl HeartbeatStats {
    fn record_sweep(&mut self, cleaned: usize, active: usize) {
        let now = CurrentTime::now_secs();
        self.sweeps += 1;
        self.active_connections = active;
        self.last_sweep_timestamp = Some(now);
        if cleaned > 0 {
            self.timeout_cleanups += cleaned as u64;
            self.last_eviction_timestamp = Some(now);
        }
    }
}

impl HeartbeatService {
    /// 새로운 하트비트 서비스 생성
    ///
    /// `connection_timeout`은 `sweep_interval`의 2배 이상이어야 합니다.
    pub fn new(
        connection_service: Arc<ConnectionService>,
        sweep_interval: Duration,
        connection_timeout: Duration,
    ) -> Result<Self> {
        if sweep_interval.is_zero() {
            bail!("하트비트 주기는 0일 수 없습니다");
        }
        if connection_timeout < sweep_interval * 2 {
            bail!(
                "하트비트 타임아웃({:?})은 주기({:?})의 2배 이상이어야 합니다",
                connection_timeout,
                sweep_interval
            );
        }

        Ok(Self {
            connection_service,
            is_running: Arc::new(Mutex::new(false)),
            cleanup_handle: Arc::new(Mutex::new(None)),
            sweep_interval,
            connection_timeout,
            heartbeat_stats: Arc::new(Mutex::new(HeartbeatStats::default())),
        })
    }

    /// 기본 설정으로 생성 (30초 주기, 60초 타임아웃)
    pub fn with_default_config(connection_service: Arc<ConnectionService>) -> Self {
        Self {
            connection_service,
            is_running: Arc::new(Mutex::new(false)),
            cleanup_handle: Arc::new(Mutex::new(None)),
            sweep_interval: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(60),
            heartbeat_stats: Arc::new(Mutex::new(HeartbeatStats::default())),
        }
    }

    /// 하트비트 시스템 시작
    pub async fn start(&self) -> Result<()> {
        let mut is_running = self.is_running.lock().await;

        if *is_running {
            warn!("하트비트 시스템이 이미 실행 중입니다");
            return Ok(());
        }

        *is_running = true;
        drop(is_running);

        info!(
            "🔄 하트비트 시스템 시작 ({:?} 간격, {:?} 타임아웃)",
            self.sweep_interval, self.connection_timeout
        );

        let connection_service = self.connection_service.clone();
        let stats_ref = self.heartbeat_stats.clone();
        let sweep_interval = self.sweep_interval;
        let timeout = self.connection_timeout;

        let handle = tokio::spawn(async move {
            let mut ticker = interval(sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // 첫 틱은 즉시 완료되므로 건너뜁니다
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let started = Instant::now();
                let cleaned = connection_service.cleanup_timeout_connections(timeout);
                let active = connection_service.get_connection_count();
                stats_ref.lock().await.record_sweep(cleaned, active);

                if cleaned > 0 {
                    info!(
                        "하트비트 타임아웃 연결 정리: {}개 (활성: {}개, {:?})",
                        cleaned,
                        active,
                        started.elapsed()
                    );
                } else if active > 0 {
                    debug!("하트비트 체크 완료 - 활성 연결: {}개", active);
                }
            }
        });

        *self.cleanup_handle.lock().await = Some(handle);

        Ok(())
    }

    /// 하트비트 시스템 중지
    pub async fn stop(&self) -> Result<()> {
        let mut is_running = self.is_running.lock().await;

        if !*is_running {
            warn!("하트비트 시스템이 이미 중지되어 있습니다");
            return Ok(());
        }

        *is_running = false;
        drop(is_running);

        if let Some(handle) = self.cleanup_handle.lock().await.take() {
            handle.abort();
            debug!("하트비트 정리 작업 핸들 종료됨");
        }

        info!("✅ 하트비트 시스템 중지 완료");
        Ok(())
    }

    /// 하트비트 시스템 실행 상태 확인
    pub async fn is_running(&self) -> bool {
        *self.is_running.lock().await
    }

    /// 수동으로 타임아웃된 연결 정리
    pub async fn cleanup_now(&self) -> usize {
        let cleaned = self
            .connection_service
            .cleanup_timeout_connections(self.connection_timeout);
        let active = self.connection_service.get_connection_count();
        self.heartbeat_stats.lock().await.record_sweep(cleaned, active);

        if cleaned > 0 {
            info!("수동 하트비트 정리: {}개 연결 해제", cleaned);
        } else {
            debug!("정리할 타임아웃 연결이 없습니다");
        }

        cleaned
    }

    /// 하트비트 통계 조회
    pub async fn get_heartbeat_stats(&self) -> HeartbeatStats {
        self.heartbeat_stats.lock().await.clone()
    }

    /// (주기, 타임아웃)
    pub fn get_config(&self) -> (Duration, Duration) {
        (self.sweep_interval, self.connection_timeout)
    }
}
