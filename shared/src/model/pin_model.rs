//! 핀 상태 모델

use serde::{Deserialize, Serialize};

/// 핀 종류
///
/// 가상 핀(`vw`/`vr`)과 디지털 핀(`dw`)은 서로 다른 맵에 저장됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinKind {
    Virtual,
    Digital,
}

/// 저장된 값의 추론 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PinDataType {
    String,
    Integer,
    Float,
    Boolean,
}

impl PinDataType {
    /// 값 문자열로부터 데이터 타입을 추론합니다.
    ///
    /// `true`/`false` → BOOLEAN, 정수 → INTEGER, 실수 → FLOAT, 그 외 STRING.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shared::PinDataType;
    /// assert_eq!(PinDataType::infer("512"), PinDataType::Integer);
    /// assert_eq!(PinDataType::infer("21.5"), PinDataType::Float);
    /// ```
    pub fn infer(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
            return PinDataType::Boolean;
        }
        if trimmed.parse::<i64>().is_ok() {
            return PinDataType::Integer;
        }
        // "NaN", "inf" 같은 표기는 문자열로 취급
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => PinDataType::Float,
            _ => PinDataType::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PinDataType::String => "STRING",
            PinDataType::Integer => "INTEGER",
            PinDataType::Float => "FLOAT",
            PinDataType::Boolean => "BOOLEAN",
        }
    }
}

/// 핀 하나의 현재 값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinState {
    pub pin_number: u16,
    pub value: String,
    pub data_type: PinDataType,
    /// 마지막 갱신 시각 (Unix 밀리초)
    pub last_updated_epoch: i64,
}

impl PinState {
    pub fn new(pin_number: u16, value: impl Into<String>, now_millis: i64) -> Self {
        let value = value.into();
        Self {
            pin_number,
            data_type: PinDataType::infer(&value),
            value,
            last_updated_epoch: now_millis,
        }
    }
}
