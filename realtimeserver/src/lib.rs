//! 대시보드 실시간 서버
//!
//! 게이트웨이 이벤트를 WebSocket(JSON) 구독자에게 팬아웃하고,
//! 인증된 대시보드의 가상 핀 쓰기를 [`shared::DeviceControl`]로 전달합니다.
//!
//! # 모듈 구조
//!
//! - **config**: 환경변수 설정
//! - **protocol**: 클라이언트/서버 JSON 메시지
//! - **service**: 구독 브로드캐스터, JWT 검증, WebSocket 리스너
//! - **handler**: 클라이언트 요청 처리

pub mod config;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod service;

#[cfg(test)]
mod tests;

pub use config::{validate_config, RealtimeConfig};
pub use error::{RealtimeError, RealtimeResult};
pub use handler::ClientHandler;
pub use protocol::{ClientMessage, ServerMessage};
pub use service::{AuthService, BroadcastStats, RealtimeService, SubscriptionBroadcaster};
