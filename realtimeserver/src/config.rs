//! 실시간 서버 환경 설정 모듈

use anyhow::{bail, Result};
use shared::config::{env_opt, env_parse, load_env_file};
use tracing::{info, warn};

/// HS256 서명 키 최소 길이
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// 실시간(WebSocket) 서버 설정
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    pub host: String,
    pub port: u16,
    /// 대시보드 사용자 JWT 서명 키. 없으면 `authenticate`는 항상 실패
    pub jwt_secret: Option<String>,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            jwt_secret: None,
        }
    }
}

impl RealtimeConfig {
    /// 환경변수에서 설정을 로드합니다.
    pub fn from_env() -> Result<Self> {
        load_env_file();
        let defaults = Self::default();

        let config = Self {
            host: env_opt("REALTIME_HOST").unwrap_or(defaults.host),
            port: env_parse("REALTIME_PORT", defaults.port)?,
            jwt_secret: env_opt("JWT_SECRET"),
        };

        if config.jwt_secret.is_none() {
            warn!("JWT_SECRET이 설정되지 않았습니다. 대시보드 인증과 virtual_write가 비활성화됩니다.");
        }

        info!("실시간 서버 설정 로드 완료: {}", config.bind_address());
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 설정 검증
pub fn validate_config(config: &RealtimeConfig) -> Result<()> {
    if config.port == 0 {
        bail!("유효하지 않은 WebSocket 포트 번호: {}", config.port);
    }

    if config.host.is_empty() {
        bail!("실시간 서버 호스트 주소가 비어있습니다");
    }

    if let Some(secret) = &config.jwt_secret {
        if secret.len() < MIN_JWT_SECRET_LEN {
            bail!(
                "JWT_SECRET은 최소 {}자 이상이어야 합니다 (현재 {}자)",
                MIN_JWT_SECRET_LEN,
                secret.len()
            );
        }
    }

    Ok(())
}
