//! 도메인 이벤트 모델
//!
//! 게이트웨이에서 발생한 상태 변화를 이벤트 브리지를 통해 실시간 서버로 전달할 때
//! 사용하는 타입들입니다.

use serde::{Deserialize, Serialize};

use super::pin_model::{PinDataType, PinKind};

/// 연결 해제 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// 소켓이 닫힘
    SocketClosed,
    /// 하트비트 타임아웃
    HeartbeatTimeout,
    /// 같은 토큰으로 새 세션이 로그인함
    Replaced,
    /// 서버 종료
    Shutdown,
}

/// 게이트웨이 도메인 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomainEvent {
    DeviceConnected {
        device_id: String,
    },
    DeviceDisconnected {
        device_id: String,
        reason: DisconnectReason,
    },
    PinUpdated {
        device_id: String,
        kind: PinKind,
        pin: u16,
        value: String,
        data_type: PinDataType,
    },
}

impl DomainEvent {
    /// 이벤트가 속한 디바이스 ID
    pub fn device_id(&self) -> &str {
        match self {
            DomainEvent::DeviceConnected { device_id }
            | DomainEvent::DeviceDisconnected { device_id, .. }
            | DomainEvent::PinUpdated { device_id, .. } => device_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::DeviceConnected { .. } => "device_connected",
            DomainEvent::DeviceDisconnected { .. } => "device_disconnected",
            DomainEvent::PinUpdated {
                kind: PinKind::Virtual,
                ..
            } => "virtual_pin_update",
            DomainEvent::PinUpdated {
                kind: PinKind::Digital,
                ..
            } => "digital_pin_update",
        }
    }
}

/// 브리지가 서버 시각을 붙인 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeEvent {
    pub event: DomainEvent,
    /// 브리지 수신 시각 (Unix 밀리초)
    pub timestamp: i64,
}

impl BridgeEvent {
    pub fn device_id(&self) -> &str {
        self.event.device_id()
    }
}
