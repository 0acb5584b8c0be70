//! 로깅 초기화
//!
//! 모든 서버가 같은 방식으로 tracing 구독자를 설정합니다.
//!
//! - `RUST_LOG` 로 필터 지정 (기본값: `info`)
//! - `LOG_FORMAT=json` 이면 JSON 한 줄 로그
//!
//! # 사용 예시
//! ```rust,no_run
//! shared::logging::init_tracing();
//! tracing::info!("서버 시작");
//! ```

use tracing_subscriber::EnvFilter;

/// 로그 출력 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// tracing 구독자를 초기화합니다. 이미 설정되어 있으면 아무것도 하지 않습니다.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match LogFormat::from_env() {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing 구독자가 이미 설정되어 있습니다");
    }
}
