//! 게이트웨이 / 실시간 서버 공통 라이브러리
//!
//! 디바이스 게이트웨이(`gatewayserver`)와 대시보드 실시간 서버(`realtimeserver`)가
//! 서로의 내부 구현에 의존하지 않도록 두 서버 사이의 경계 타입을 모아 둡니다.
//!
//! # 모듈 구조
//!
//! - **model**: 핀 상태, 디바이스 레코드, 도메인 이벤트
//! - **traits**: 서버 간 연결 지점 (`EventSink`, `DeviceControl`)
//! - **config**: `.env` 로딩 및 환경변수 파싱
//! - **logging**: tracing 구독자 초기화
//! - **tool**: 시간 / 16진수 유틸리티

pub mod config;
pub mod logging;
pub mod model;
pub mod tool;
pub mod traits;

pub use model::device_model::{DeviceInfo, DeviceRecord, DeviceStatus};
pub use model::event_model::{BridgeEvent, DisconnectReason, DomainEvent};
pub use model::pin_model::{PinDataType, PinKind, PinState};
pub use traits::{ControlError, DeviceControl, EventSink};
