//! 실시간 서버 에러 타입

use shared::ControlError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// 실시간 서버 에러
///
/// 클라이언트 메시지 처리 중 발생한 에러는 `error` 메시지로 변환되어 전송되고
/// 연결은 유지됩니다. 연결 단위 에러(`WebSocket`, `Io`)만 세션을 끝냅니다.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("잘못된 메시지: {0}")]
    InvalidMessage(String),

    #[error("인증이 필요합니다")]
    NotAuthenticated,

    #[error("유효하지 않은 토큰: {0}")]
    InvalidToken(String),

    #[error("인증이 비활성화되어 있습니다 (JWT_SECRET 미설정)")]
    AuthDisabled,

    #[error("알 수 없는 구독자: {0}")]
    UnknownSubscriber(uuid::Uuid),

    #[error("구독자 송신 큐가 가득 찼습니다: {0}")]
    SlowSubscriber(uuid::Uuid),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("WebSocket 에러: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

pub type RealtimeResult<T> = Result<T, RealtimeError>;
