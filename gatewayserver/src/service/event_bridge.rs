//! 이벤트 브리지
//!
//! 게이트웨이 도메인 이벤트를 채널로 받아 서버 시각을 붙인 뒤 [`EventSink`]로 전달합니다.
//! 게이트웨이는 실시간 서버의 내부 구현을 알지 못하고 이 채널만 사용합니다.
//!
//! 발행(`emit`)은 절대 블로킹하지 않습니다. 채널이 가득 찼거나 닫혔으면 로그를 남기고 버립니다.

use shared::tool::CurrentTime;
use shared::{BridgeEvent, DomainEvent, EventSink};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 브리지 통계
#[derive(Debug, Default)]
pub struct BridgeStats {
    emitted: AtomicU64,
    dropped: AtomicU64,
    forwarded: AtomicU64,
}

/// 브리지 통계 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BridgeStatsSnapshot {
    pub emitted: u64,
    pub dropped: u64,
    pub forwarded: u64,
}

impl BridgeStats {
    pub fn snapshot(&self) -> BridgeStatsSnapshot {
        BridgeStatsSnapshot {
            emitted: self.emitted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
        }
    }
}

/// 이벤트 발행 핸들 (게이트웨이 쪽)
#[derive(Clone)]
pub struct EventBridge {
    tx: mpsc::Sender<DomainEvent>,
    stats: Arc<BridgeStats>,
}

/// 이벤트 수신 쪽. [`EventBridgeWorker::spawn`]으로 전달 루프를 시작합니다.
pub struct EventBridgeWorker {
    rx: mpsc::Receiver<DomainEvent>,
    stats: Arc<BridgeStats>,
}

impl EventBridge {
    /// 용량 `capacity`의 브리지 채널 생성
    pub fn channel(capacity: usize) -> (EventBridge, EventBridgeWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stats = Arc::new(BridgeStats::default());
        (
            EventBridge {
                tx,
                stats: stats.clone(),
            },
            EventBridgeWorker { rx, stats },
        )
    }

    /// 이벤트 발행 (논블로킹)
    pub fn emit(&self, event: DomainEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.stats.emitted.fetch_add(1, Ordering::Relaxed);
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "이벤트 브리지 채널이 가득 차 이벤트를 버립니다: {} ({})",
                    event.name(),
                    event.device_id()
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "이벤트 브리지가 닫혀 이벤트를 버립니다: {} ({})",
                    event.name(),
                    event.device_id()
                );
            }
        }
    }

    pub fn stats(&self) -> BridgeStatsSnapshot {
        self.stats.snapshot()
    }
}

impl EventBridgeWorker {
    /// 다음 이벤트를 받아 시각을 붙입니다. 모든 발행 핸들이 사라지면 `None`.
    pub async fn next(&mut self) -> Option<BridgeEvent> {
        let event = self.rx.recv().await?;
        Some(BridgeEvent {
            event,
            timestamp: CurrentTime::now_millis(),
        })
    }

    /// 대기 없이 다음 이벤트를 꺼냅니다.
    pub fn try_next(&mut self) -> Option<BridgeEvent> {
        let event = self.rx.try_recv().ok()?;
        Some(BridgeEvent {
            event,
            timestamp: CurrentTime::now_millis(),
        })
    }

    /// 전달 루프 시작. 이벤트 순서는 발행 순서 그대로 유지됩니다.
    pub fn spawn(mut self, sink: Arc<dyn EventSink>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("🔄 이벤트 브리지 시작");
            while let Some(event) = self.next().await {
                debug!("이벤트 전달: {} ({})", event.event.name(), event.device_id());
                sink.publish(event).await;
                self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
            }
            info!("이벤트 브리지 종료");
        })
    }
}
