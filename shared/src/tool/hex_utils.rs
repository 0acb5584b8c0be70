//! 16진수 변환 유틸리티
//!
//! 프레임 디버그 로그에 바디를 덤프할 때 사용합니다.

/// 16진수 변환 유틸리티
pub struct HexUtils;

impl HexUtils {
    /// 바이트 배열을 공백 구분 16진수 문자열로 변환
    pub fn bytes_to_hex(bytes: &[u8]) -> String {
        bytes
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 앞부분 `limit` 바이트만 덤프하고 나머지는 길이로 표시
    pub fn preview(bytes: &[u8], limit: usize) -> String {
        if bytes.len() <= limit {
            Self::bytes_to_hex(bytes)
        } else {
            format!(
                "{} ... (+{}바이트)",
                Self::bytes_to_hex(&bytes[..limit]),
                bytes.len() - limit
            )
        }
    }
}
