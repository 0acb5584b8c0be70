//! 대시보드 WebSocket 메시지 정의
//!
//! 모든 메시지는 `type` 필드로 구분되는 JSON 텍스트 프레임이며 필드는 camelCase입니다.
//!
//! ```json
//! {"type":"subscribe","deviceId":"device-1"}
//! {"type":"virtual_pin_update","deviceId":"device-1","pin":5,"value":"100","dataType":"INTEGER","timestamp":1760000000000}
//! ```

use serde::{Deserialize, Serialize};
use shared::{BridgeEvent, DeviceStatus, DisconnectReason, DomainEvent, PinDataType, PinKind};

/// 클라이언트 → 서버
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Authenticate { token: String },
    Subscribe { device_id: String },
    Unsubscribe { device_id: String },
    VirtualWrite { device_id: String, pin: u16, value: String },
    GetDeviceStatus { device_id: String },
}

/// 서버 → 클라이언트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Authenticated {
        user_id: String,
    },
    Subscribed {
        device_id: String,
    },
    Unsubscribed {
        device_id: String,
    },
    VirtualWriteAck {
        device_id: String,
        pin: u16,
        value: String,
    },
    DeviceStatus(DeviceStatus),
    Error {
        message: String,
    },
    VirtualPinUpdate {
        device_id: String,
        pin: u16,
        value: String,
        data_type: PinDataType,
        timestamp: i64,
    },
    DigitalPinUpdate {
        device_id: String,
        pin: u16,
        value: String,
        data_type: PinDataType,
        timestamp: i64,
    },
    DeviceConnected {
        device_id: String,
        timestamp: i64,
    },
    DeviceDisconnected {
        device_id: String,
        reason: DisconnectReason,
        timestamp: i64,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<&BridgeEvent> for ServerMessage {
    fn from(bridged: &BridgeEvent) -> Self {
        let timestamp = bridged.timestamp;
        match &bridged.event {
            DomainEvent::DeviceConnected { device_id } => ServerMessage::DeviceConnected {
                device_id: device_id.clone(),
                timestamp,
            },
            DomainEvent::DeviceDisconnected { device_id, reason } => {
                ServerMessage::DeviceDisconnected {
                    device_id: device_id.clone(),
                    reason: *reason,
                    timestamp,
                }
            }
            DomainEvent::PinUpdated {
                device_id,
                kind: PinKind::Virtual,
                pin,
                value,
                data_type,
            } => ServerMessage::VirtualPinUpdate {
                device_id: device_id.clone(),
                pin: *pin,
                value: value.clone(),
                data_type: *data_type,
                timestamp,
            },
            DomainEvent::PinUpdated {
                device_id,
                kind: PinKind::Digital,
                pin,
                value,
                data_type,
            } => ServerMessage::DigitalPinUpdate {
                device_id: device_id.clone(),
                pin: *pin,
                value: value.clone(),
                data_type: *data_type,
                timestamp,
            },
        }
    }
}
