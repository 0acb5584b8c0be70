//! 게이트웨이 서비스 레이어
//!
//! # 서비스 구조
//!
//! ```text
//! Service Layer
//! ├── ConnectionService (세션 테이블)
//! │   ├── 세션 열기/닫기 (멱등)
//! │   ├── 하트비트 갱신
//! │   └── 연결 통계
//! ├── HeartbeatService (타임아웃 정리)
//! ├── DeviceRegistry (디바이스 / 핀 상태)
//! ├── DeviceStore (외부 저장소 연동)
//! ├── EventBridge (도메인 이벤트 전달)
//! ├── GatewayControl (대시보드 → 디바이스 쓰기)
//! └── TcpService (평문 / TLS 리스너)
//! ```

/// 세션 테이블과 연결 통계
pub mod connection_service;

/// 주기적 타임아웃 정리
pub mod heartbeat_service;

/// 인증된 디바이스와 핀 상태
pub mod device_registry;

/// 디바이스 / 텔레메트리 영속화 연동
pub mod device_store;

/// 게이트웨이 → 실시간 서버 이벤트 채널
pub mod event_bridge;

/// 외부 제어 요청 처리
pub mod gateway_control;

/// 평문 TCP / TLS 리스너
pub mod tcp_service;

pub use connection_service::{ConnectionService, ConnectionStatsSnapshot, SessionLink};
pub use device_registry::{Device, DeviceRegistry};
pub use device_store::{DeviceStore, HttpDeviceStore, MemoryDeviceStore, StoreError, TelemetryRecord};
pub use event_bridge::{BridgeStatsSnapshot, EventBridge, EventBridgeWorker};
pub use gateway_control::GatewayControl;
pub use heartbeat_service::{HeartbeatService, HeartbeatStats};
pub use tcp_service::{load_tls_acceptor, GatewayAddrs, ServerStats, TcpService};
