//! 간단한 공통 유틸리티

use rand::Rng;

/// 간단한 데이터 유틸리티
pub struct SimpleUtils;

impl SimpleUtils {
    /// 0이 아닌 새 메시지 ID
    ///
    /// 메시지 ID 0은 "피어가 ID를 주지 않음"으로 예약되어 있으므로
    /// 응답 전에 이 값으로 바꿔야 합니다.
    pub fn fresh_message_id() -> u16 {
        rand::thread_rng().gen_range(1..=u16::MAX)
    }

    /// 로그인 바디에서 토큰 추출 (끝의 NUL/공백 제거)
    pub fn extract_token(body: &[u8]) -> String {
        String::from_utf8_lossy(body)
            .trim_matches(|c: char| c == '\0' || c.is_whitespace())
            .to_string()
    }

    /// 로그에 남길 토큰 표기 (앞 4자만 노출)
    pub fn mask_token(token: &str) -> String {
        let visible: String = token.chars().take(4).collect();
        format!("{}***", visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_message_id_non_zero() {
        for _ in 0..1000 {
            assert_ne!(SimpleUtils::fresh_message_id(), 0);
        }
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(SimpleUtils::extract_token(b"abc123\0"), "abc123");
        assert_eq!(SimpleUtils::extract_token(b"  tok \r\n"), "tok");
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(SimpleUtils::mask_token("abcdefgh"), "abcd***");
        assert_eq!(SimpleUtils::mask_token("ab"), "ab***");
    }
}
