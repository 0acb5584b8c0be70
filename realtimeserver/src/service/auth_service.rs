//! 대시보드 사용자 JWT 검증 서비스
//!
//! HS256으로 서명된 토큰을 검증하고 `sub` 클레임을 사용자 ID로 사용합니다.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RealtimeError, RealtimeResult};

/// JWT 클레임
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // 사용자 ID
    pub exp: i64,    // 만료 시간
    pub iat: i64,    // 발급 시간
}

/// 토큰 검증 서비스
#[derive(Clone)]
pub struct AuthService {
    secret_key: Option<String>,
}

impl AuthService {
    pub fn new(secret_key: Option<String>) -> Self {
        Self { secret_key }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret_key.is_some()
    }

    /// 토큰을 검증하고 사용자 ID를 돌려줍니다.
    pub fn verify(&self, token: &str) -> RealtimeResult<String> {
        let secret = self.secret_key.as_ref().ok_or(RealtimeError::AuthDisabled)?;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| RealtimeError::InvalidToken(e.to_string()))?;

        if token_data.claims.sub.is_empty() {
            return Err(RealtimeError::InvalidToken("sub 클레임이 비어 있습니다".into()));
        }

        debug!("대시보드 사용자 인증: {}", token_data.claims.sub);
        Ok(token_data.claims.sub)
    }

    /// 토큰 발급 (운영 도구와 테스트용)
    pub fn issue(&self, user_id: &str, ttl: Duration) -> RealtimeResult<String> {
        let secret = self.secret_key.as_ref().ok_or(RealtimeError::AuthDisabled)?;
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| RealtimeError::InvalidToken(e.to_string()))
    }
}
