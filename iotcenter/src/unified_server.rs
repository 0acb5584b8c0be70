//! 통합 IoT 서버
//!
//! 디바이스 게이트웨이와 대시보드 실시간 서버를 하나로 묶습니다.
//!
//! ```text
//! 디바이스 ─TCP/TLS─▶ gatewayserver ─EventBridge─▶ SubscriptionBroadcaster ─WS─▶ 대시보드
//!                          ▲                                                   │
//!                          └──────────── DeviceControl (virtual_write) ◀───────┘
//! ```

use anyhow::{Context, Result};
use gatewayserver::{
    validate_config as validate_gateway_config, DeviceStore, EventBridge, EventBridgeWorker,
    GatewayAddrs, GatewayConfig, HttpDeviceStore, MemoryDeviceStore, TcpService,
};
use realtimeserver::{
    validate_config as validate_realtime_config, RealtimeConfig, RealtimeService,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 통합 서버 설정
#[derive(Debug, Clone, Default)]
pub struct IotCenterConfig {
    pub gateway: GatewayConfig,
    pub realtime: RealtimeConfig,
}

impl IotCenterConfig {
    /// 환경변수에서 두 서버 설정을 모두 로드하고 검증합니다.
    pub fn from_env() -> Result<Self> {
        let gateway = GatewayConfig::from_env().context("게이트웨이 설정 로드 실패")?;
        validate_gateway_config(&gateway).context("게이트웨이 설정 검증 실패")?;

        let realtime = RealtimeConfig::from_env().context("실시간 서버 설정 로드 실패")?;
        validate_realtime_config(&realtime).context("실시간 서버 설정 검증 실패")?;

        Ok(Self { gateway, realtime })
    }
}

/// 설정에 맞는 디바이스 저장소 생성
///
/// `DEVICE_API_URL`이 있으면 HTTP 저장소, 없으면 고정 토큰 메모리 저장소를 씁니다.
pub fn build_device_store(config: &GatewayConfig) -> Result<Arc<dyn DeviceStore>> {
    match &config.device_api_url {
        Some(url) => {
            info!("디바이스 저장소: HTTP API ({})", url);
            let store = HttpDeviceStore::new(
                url,
                config.device_api_key.clone(),
                config.device_api_timeout(),
            )
            .context("HTTP 디바이스 저장소 생성 실패")?;
            Ok(Arc::new(store))
        }
        None => {
            warn!(
                "DEVICE_API_URL이 없어 고정 토큰 {}개로 동작합니다 (텔레메트리는 메모리에만 보관)",
                config.static_tokens.len()
            );
            Ok(Arc::new(MemoryDeviceStore::with_devices(
                config.static_tokens.iter().cloned(),
            )))
        }
    }
}

/// 실행 중인 서버 주소
#[derive(Debug, Clone, Copy)]
pub struct IotCenterAddrs {
    pub gateway: GatewayAddrs,
    pub realtime: SocketAddr,
}

/// 통합 IoT 서버
pub struct IotCenter {
    gateway: TcpService,
    realtime: RealtimeService,
    bridge: EventBridge,
    bridge_worker: Mutex<Option<EventBridgeWorker>>,
    bridge_task: Mutex<Option<JoinHandle<()>>>,
}

impl IotCenter {
    pub fn new(config: IotCenterConfig) -> Result<Self> {
        let store = build_device_store(&config.gateway)?;
        Self::with_store(config, store)
    }

    /// 저장소를 직접 지정해 생성
    pub fn with_store(config: IotCenterConfig, store: Arc<dyn DeviceStore>) -> Result<Self> {
        let (bridge, worker) = EventBridge::channel(config.gateway.event_bridge_capacity);
        let gateway = TcpService::new(config.gateway, store, bridge.clone())
            .context("게이트웨이 생성 실패")?;
        let realtime = RealtimeService::new(config.realtime, Arc::new(gateway.control()));

        Ok(Self {
            gateway,
            realtime,
            bridge,
            bridge_worker: Mutex::new(Some(worker)),
            bridge_task: Mutex::new(None),
        })
    }

    /// 브리지 → 실시간 서버 → 게이트웨이 순으로 시작합니다.
    pub async fn start(&self) -> Result<IotCenterAddrs> {
        info!("🚀 통합 IoT 서버 시작 중...");

        let worker = self
            .bridge_worker
            .lock()
            .await
            .take()
            .context("통합 서버는 한 번만 시작할 수 있습니다")?;
        *self.bridge_task.lock().await = Some(worker.spawn(self.realtime.broadcaster()));

        let realtime = self
            .realtime
            .start()
            .await
            .context("실시간 서버 시작 실패")?;
        let gateway = self.gateway.start().await.context("게이트웨이 시작 실패")?;

        info!("✅ 통합 IoT 서버가 성공적으로 시작되었습니다!");
        Ok(IotCenterAddrs { gateway, realtime })
    }

    /// 게이트웨이 → 실시간 서버 → 브리지 순으로 중지합니다.
    pub async fn stop(&self) -> Result<()> {
        info!("🛑 통합 IoT 서버 중지 중...");

        self.gateway.stop().await.context("게이트웨이 중지 실패")?;
        self.realtime.stop().await;
        if let Some(task) = self.bridge_task.lock().await.take() {
            task.abort();
        }

        info!("✅ 통합 IoT 서버가 성공적으로 중지되었습니다!");
        Ok(())
    }

    pub fn gateway(&self) -> &TcpService {
        &self.gateway
    }

    pub fn realtime(&self) -> &RealtimeService {
        &self.realtime
    }

    /// 서버 상태 출력
    pub async fn print_status(&self) {
        let gateway = self.gateway.get_server_stats().await;
        let heartbeat = self.gateway.heartbeat_service().get_heartbeat_stats().await;
        let bridge = self.bridge.stats();
        let broadcast = self.realtime.get_stats();

        info!(
            "📊 게이트웨이: {} (실행: {}, 인증 디바이스: {})",
            gateway.bind_address, gateway.is_running, gateway.authenticated_devices
        );
        match serde_json::to_string(&gateway.connections) {
            Ok(json) => info!("📊 연결 통계: {}", json),
            Err(e) => warn!("연결 통계 직렬화 실패: {}", e),
        }
        info!(
            "📊 하트비트: 정리 {}회, 타임아웃 {}건",
            heartbeat.sweeps, heartbeat.timeout_cleanups
        );
        info!(
            "📊 이벤트 브리지: 발행 {}, 전달 {}, 유실 {}",
            bridge.emitted, bridge.forwarded, bridge.dropped
        );
        info!(
            "📊 실시간 서버: 구독자 {}, 전달 {}, 유실 {}",
            broadcast.subscribers, broadcast.delivered, broadcast.dropped
        );
    }
}
