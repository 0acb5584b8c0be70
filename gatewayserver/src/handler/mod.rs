//! 게이트웨이 핸들러 레이어
//!
//! 소켓 읽기/쓰기와 프레임 단위 명령 처리를 담당합니다.

/// 세션 상태 머신에 따른 프레임 처리
pub mod command_handler;

/// 소켓 하나의 읽기 루프와 쓰기 태스크
pub mod connection_handler;

pub use command_handler::CommandHandler;
pub use connection_handler::ConnectionHandler;
