//! 디바이스 프로토콜 게이트웨이 라이브러리
//!
//! 현장에 배포된 하드웨어(센서/액추에이터)와 5바이트 헤더 바이너리 프레임으로 통신하는
//! TCP/TLS 서버입니다.
//!
//! # 주요 기능
//!
//! - **프레임 코덱**: TCP 분할/병합에 견디는 스트림 디코딩
//! - **명령 파서**: 펌웨어별로 다른 명령 인코딩을 순서대로 시도하는 다중 전략 파서
//! - **디바이스 레지스트리**: 토큰 인증, 가상/디지털 핀 상태
//! - **세션 상태 머신**: 모든 프레임에 메시지 ID가 같은 응답 하나
//! - **하트비트**: 트래픽이 끊긴 세션 자동 정리
//! - **이벤트 브리지**: 도메인 이벤트를 실시간 서버로 전달
//!
//! # 아키텍처
//!
//! ```text
//! Gateway Server
//! ├── Service Layer
//! │   ├── TcpService (리스너 생명주기)
//! │   ├── ConnectionService (세션 테이블)
//! │   ├── HeartbeatService (타임아웃 정리)
//! │   ├── DeviceRegistry (디바이스 / 핀 상태)
//! │   ├── DeviceStore (외부 저장소)
//! │   ├── EventBridge (이벤트 전달)
//! │   └── GatewayControl (대시보드 쓰기)
//! ├── Handler Layer
//! │   ├── ConnectionHandler (소켓 읽기/쓰기)
//! │   └── CommandHandler (프레임 처리)
//! ├── Tool Layer
//! │   ├── SimpleUtils
//! │   └── Error
//! └── Protocol
//!     ├── Frame / FrameCodec
//!     └── HardwareCommand 파서
//! ```
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! use gatewayserver::{EventBridge, GatewayConfig, MemoryDeviceStore, TcpService};
//!
//! let (bridge, worker) = EventBridge::channel(1024);
//! let store = Arc::new(MemoryDeviceStore::with_devices([("token", "device-1")]));
//! let gateway = TcpService::new(GatewayConfig::default(), store, bridge)?;
//! let addrs = gateway.start().await?;
//! ```

/// 환경 설정 관리
pub mod config;

/// 디바이스 바이너리 프로토콜
pub mod protocol;

/// 서비스 레이어
pub mod service;

/// 요청 처리 핸들러 레이어
pub mod handler;

/// 공통 유틸리티 도구들
pub mod tool;

#[cfg(test)]
mod tests;

pub use config::{parse_static_tokens, validate_config, GatewayConfig};
pub use handler::{CommandHandler, ConnectionHandler};
pub use protocol::{CommandType, Frame, FrameCodec, HardwareCommand, StatusCode};
pub use service::{
    ConnectionService, DeviceRegistry, DeviceStore, EventBridge, EventBridgeWorker,
    GatewayAddrs, GatewayControl, HeartbeatService, HttpDeviceStore, MemoryDeviceStore,
    ServerStats, TcpService,
};
pub use tool::error::{GatewayError, GatewayResult};
pub use tool::SimpleUtils;
