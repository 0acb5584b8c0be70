//! 게이트웨이 환경 설정 모듈
//!
//! `.env` 파일과 환경변수에서 게이트웨이 설정을 로드합니다.

use anyhow::{bail, Context, Result};
use shared::config::{env_opt, env_parse, load_env_file};
use std::time::Duration;
use tracing::info;

/// 게이트웨이 설정 구조체
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// 바인딩 호스트
    pub host: String,
    /// 평문 TCP 포트
    pub port: u16,
    /// TLS 포트 (인증서와 키가 함께 있어야 활성화)
    pub tls_port: Option<u16>,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
    /// 하트비트 정리 주기 (초)
    pub heartbeat_interval_secs: u64,
    /// 하트비트 타임아웃 (초)
    pub heartbeat_timeout_secs: u64,
    /// 허용하는 최대 프레임 바디 (바이트)
    pub max_frame_body: usize,
    pub max_connections: usize,
    /// 디바이스 저장소 API 주소. 없으면 고정 토큰 모드
    pub device_api_url: Option<String>,
    pub device_api_key: Option<String>,
    pub device_api_timeout_ms: u64,
    /// 고정 토큰 모드의 `(token, device_id)` 목록
    pub static_tokens: Vec<(String, String)>,
    /// 이벤트 브리지 채널 용량
    pub event_bridge_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            tls_port: None,
            tls_cert_path: None,
            tls_key_path: None,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 60,
            max_frame_body: 4096,
            max_connections: 10_000,
            device_api_url: None,
            device_api_key: None,
            device_api_timeout_ms: 3000,
            static_tokens: Vec::new(),
            event_bridge_capacity: 1024,
        }
    }
}

impl GatewayConfig {
    /// 환경변수에서 설정을 로드합니다.
    ///
    /// 로드 순서:
    /// 1. `.env` 파일 (`../.env`, `.env`, `../../.env`)
    /// 2. 시스템 환경변수
    /// 3. 기본값
    pub fn from_env() -> Result<Self> {
        load_env_file();
        let defaults = Self::default();

        let static_tokens = match env_opt("GATEWAY_STATIC_TOKENS") {
            Some(raw) => parse_static_tokens(&raw)?,
            None => Vec::new(),
        };

        let tls_port = match env_opt("GATEWAY_TLS_PORT") {
            Some(raw) => Some(
                raw.parse::<u16>()
                    .with_context(|| format!("GATEWAY_TLS_PORT 값이 잘못되었습니다: {}", raw))?,
            ),
            None => None,
        };

        let config = Self {
            host: env_opt("GATEWAY_HOST").unwrap_or(defaults.host),
            port: env_parse("GATEWAY_PORT", defaults.port)?,
            tls_port,
            tls_cert_path: env_opt("GATEWAY_TLS_CERT"),
            tls_key_path: env_opt("GATEWAY_TLS_KEY"),
            heartbeat_interval_secs: env_parse(
                "HEARTBEAT_INTERVAL_SECS",
                defaults.heartbeat_interval_secs,
            )?,
            heartbeat_timeout_secs: env_parse(
                "HEARTBEAT_TIMEOUT_SECS",
                defaults.heartbeat_timeout_secs,
            )?,
            max_frame_body: env_parse("GATEWAY_MAX_FRAME_BODY", defaults.max_frame_body)?,
            max_connections: env_parse("GATEWAY_MAX_CONNECTIONS", defaults.max_connections)?,
            device_api_url: env_opt("DEVICE_API_URL"),
            device_api_key: env_opt("DEVICE_API_KEY"),
            device_api_timeout_ms: env_parse(
                "DEVICE_API_TIMEOUT_MS",
                defaults.device_api_timeout_ms,
            )?,
            static_tokens,
            event_bridge_capacity: env_parse(
                "EVENT_BRIDGE_CAPACITY",
                defaults.event_bridge_capacity,
            )?,
        };

        info!(
            "게이트웨이 설정 로드 완료: {} (TLS: {:?}, 하트비트 {}s/{}s)",
            config.bind_address(),
            config.tls_bind_address(),
            config.heartbeat_interval_secs,
            config.heartbeat_timeout_secs
        );
        Ok(config)
    }

    /// 평문 TCP 바인딩 주소
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// TLS 바인딩 주소. 포트, 인증서, 키가 모두 설정된 경우에만 `Some`.
    pub fn tls_bind_address(&self) -> Option<String> {
        match (&self.tls_port, &self.tls_cert_path, &self.tls_key_path) {
            (Some(port), Some(_), Some(_)) => Some(format!("{}:{}", self.host, port)),
            _ => None,
        }
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub fn device_api_timeout(&self) -> Duration {
        Duration::from_millis(self.device_api_timeout_ms)
    }
}

/// `token:deviceId,token:deviceId` 형식 파싱
pub fn parse_static_tokens(raw: &str) -> Result<Vec<(String, String)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((token, device_id)) if !token.trim().is_empty() && !device_id.trim().is_empty() => {
                Ok((token.trim().to_string(), device_id.trim().to_string()))
            }
            _ => bail!("GATEWAY_STATIC_TOKENS 항목 형식이 잘못되었습니다: {}", entry),
        })
        .collect()
}

/// 설정 검증 유틸리티
pub fn validate_config(config: &GatewayConfig) -> Result<()> {
    if config.port == 0 {
        bail!("유효하지 않은 TCP 포트 번호: {}", config.port);
    }

    if config.tls_port == Some(0) {
        bail!("유효하지 않은 TLS 포트 번호: 0");
    }

    if config.tls_port.is_some() && config.tls_bind_address().is_none() {
        bail!("GATEWAY_TLS_PORT를 쓰려면 GATEWAY_TLS_CERT와 GATEWAY_TLS_KEY가 필요합니다");
    }

    if config.host.is_empty() {
        bail!("게이트웨이 호스트 주소가 비어있습니다");
    }

    if config.heartbeat_interval_secs == 0 || config.heartbeat_timeout_secs == 0 {
        bail!("하트비트 주기와 타임아웃은 0일 수 없습니다");
    }

    if config.heartbeat_timeout_secs < config.heartbeat_interval_secs * 2 {
        bail!(
            "하트비트 타임아웃({}s)은 주기({}s)의 2배 이상이어야 합니다",
            config.heartbeat_timeout_secs,
            config.heartbeat_interval_secs
        );
    }

    if config.max_frame_body == 0 || config.max_frame_body > u16::MAX as usize {
        bail!("GATEWAY_MAX_FRAME_BODY는 1..=65535 범위여야 합니다: {}", config.max_frame_body);
    }

    if config.max_connections == 0 {
        bail!("GATEWAY_MAX_CONNECTIONS는 0일 수 없습니다");
    }

    if config.device_api_url.is_none() && config.static_tokens.is_empty() {
        bail!("DEVICE_API_URL 또는 GATEWAY_STATIC_TOKENS 중 하나는 설정해야 합니다");
    }

    Ok(())
}
