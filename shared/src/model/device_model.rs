//! 디바이스 모델

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::pin_model::PinState;

/// 외부 저장소가 토큰으로 찾아 준 디바이스 레코드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    #[serde(alias = "id")]
    pub device_id: String,
    pub token: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// 디바이스가 INTERNAL 프레임으로 보내는 자기 정보
///
/// 알려진 키는 필드로, 나머지는 `extra`에 그대로 보존됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub firmware_version: Option<String>,
    pub build_id: Option<String>,
    pub heartbeat_interval: Option<u32>,
    pub buffer_size: Option<u32>,
    pub device_model: Option<String>,
    pub template_id: Option<String>,
    pub extra: BTreeMap<String, String>,
}

/// 대시보드에 내려 주는 디바이스 상태 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub device_id: String,
    pub online: bool,
    pub connected_at: Option<i64>,
    pub virtual_pins: Vec<PinState>,
    pub digital_pins: Vec<PinState>,
}

impl DeviceStatus {
    pub fn offline(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            online: false,
            connected_at: None,
            virtual_pins: Vec::new(),
            digital_pins: Vec::new(),
        }
    }
}
