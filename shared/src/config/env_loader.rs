//! `.env` 파일 로딩과 환경변수 파싱

use anyhow::{Context, Result};
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// .env 파일을 로드합니다.
///
/// 로드 순서:
/// 1. 상위 디렉토리의 .env 파일
/// 2. 현재 디렉토리의 .env 파일
/// 3. 상위의 상위 디렉토리 (프로젝트 루트)
///
/// 파일이 없으면 시스템 환경변수와 기본값만 사용합니다.
pub fn load_env_file() -> bool {
    let env_paths = ["../.env", ".env", "../../.env"];

    for path in env_paths {
        if Path::new(path).exists() && dotenv::from_filename(path).is_ok() {
            info!(".env 파일 로드 성공: {}", path);
            return true;
        }
    }

    warn!(".env 파일을 찾을 수 없습니다. 기본값과 시스템 환경변수를 사용합니다.");
    false
}

/// 환경변수를 파싱합니다. 값이 없으면 기본값, 값이 잘못되면 에러입니다.
pub fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("환경변수 {} 값이 잘못되었습니다: {:?}", key, raw)),
        _ => Ok(default),
    }
}

/// 비어 있지 않은 환경변수 값
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
