//! 게이트웨이 공통 에러 처리
//!
//! 디바이스 세션에서 발생하는 에러를 분류하고, 각 에러를 와이어 상태 코드로 매핑합니다.
//! 에러 정책은 엄격(strict) 모드 하나로 통일합니다: 에러 종류마다 정확한 상태 코드로 응답합니다.

use thiserror::Error;
use tracing::{error, info, warn};

use crate::protocol::StatusCode;
use crate::service::device_store::StoreError;

/// 게이트웨이 에러 타입
#[derive(Debug, Error)]
pub enum GatewayError {
    /// 선언된 바디 길이가 허용치 초과 (연결 종료 대상)
    #[error("프레임 바디가 너무 큽니다: {size}바이트 (최대 {max}바이트)")]
    FrameTooLarge { size: usize, max: usize },

    /// 모든 파서 전략 실패
    #[error("해석할 수 없는 명령 바디: {0}")]
    UnparseableCommand(String),

    /// 알 수 없는 명령 타입
    #[error("알 수 없는 명령 타입: {0}")]
    UnknownCommand(u8),

    /// 로그인 토큰이 저장소에 없음
    #[error("유효하지 않은 디바이스 토큰")]
    InvalidToken,

    /// 로그인 전에 하드웨어 프레임 수신 (또는 레지스트리에서 이미 제거됨)
    #[error("인증되지 않은 세션")]
    NotAuthenticated,

    /// 이미 다른 토큰으로 인증된 세션에서 로그인 시도
    #[error("이미 다른 토큰으로 인증된 세션입니다")]
    AlreadyAuthenticated,

    /// 읽기 대상 핀 값 없음
    #[error("핀 {0}에 저장된 값이 없습니다")]
    NoData(u16),

    /// 최대 연결 수 초과
    #[error("최대 연결 수 초과: {0}")]
    TooManyConnections(usize),

    /// 외부 저장소 실패
    #[error("저장소 에러: {0}")]
    Persistence(#[from] StoreError),

    /// 소켓 I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// 디바이스에 돌려줄 상태 코드
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UnparseableCommand(_) => StatusCode::IllegalCommandBody,
            GatewayError::UnknownCommand(_) => StatusCode::IllegalCommand,
            GatewayError::InvalidToken => StatusCode::InvalidToken,
            GatewayError::NotAuthenticated => StatusCode::NotAuthenticated,
            GatewayError::AlreadyAuthenticated => StatusCode::NotAllowed,
            GatewayError::NoData(_) => StatusCode::NoData,
            GatewayError::FrameTooLarge { .. }
            | GatewayError::TooManyConnections(_)
            | GatewayError::Persistence(_)
            | GatewayError::Io(_) => StatusCode::ServerError,
        }
    }

    /// 로깅 심각도
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            GatewayError::NoData(_) => ErrorSeverity::Info,
            GatewayError::UnparseableCommand(_)
            | GatewayError::UnknownCommand(_)
            | GatewayError::InvalidToken
            | GatewayError::NotAuthenticated
            | GatewayError::AlreadyAuthenticated
            | GatewayError::TooManyConnections(_) => ErrorSeverity::Warning,
            GatewayError::FrameTooLarge { .. } | GatewayError::Persistence(_) | GatewayError::Io(_) => {
                ErrorSeverity::Error
            }
        }
    }
}

/// 에러 심각도 레벨
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// 정보성 - 정상 동작 중 발생하는 예상 가능한 상황
    Info,
    /// 경고 - 디바이스 쪽 문제, 세션은 유지
    Warning,
    /// 에러 - 세션 또는 외부 연동 실패
    Error,
}

/// 에러 핸들러
///
/// 컴포넌트/작업 이름을 붙여 일관된 형식으로 로깅합니다.
pub struct ErrorHandler;

impl ErrorHandler {
    /// 에러를 심각도에 맞는 레벨로 로깅합니다.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// ErrorHandler::handle_error(
    ///     &GatewayError::InvalidToken,
    ///     "CommandHandler",
    ///     "login",
    /// );
    /// ```
    pub fn handle_error(err: &GatewayError, component: &str, operation: &str) {
        let log_message = format!("[{}] [{}] {}", component, operation, err);

        match err.severity() {
            ErrorSeverity::Info => info!("{}", log_message),
            ErrorSeverity::Warning => warn!("{}", log_message),
            ErrorSeverity::Error => error!("{}", log_message),
        }
    }
}

/// 결과 타입 별칭
pub type GatewayResult<T> = Result<T, GatewayError>;
