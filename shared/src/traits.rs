//! 서버 간 의존성 주입을 위한 trait 정의
//!
//! 게이트웨이와 실시간 서버는 서로의 구조체를 직접 알지 못하고
//! 아래 trait만을 통해 연결됩니다.
//! - 게이트웨이 → 실시간 서버: [`EventSink`] (이벤트 브리지가 호출)
//! - 실시간 서버 → 게이트웨이: [`DeviceControl`] (대시보드 write-through)

use async_trait::async_trait;
use thiserror::Error;

use crate::model::device_model::DeviceStatus;
use crate::model::event_model::BridgeEvent;
use crate::model::pin_model::PinState;

/// 브리지된 이벤트를 받아 팬아웃하는 쪽
#[async_trait]
pub trait EventSink: Send + Sync {
    /// 이벤트를 전달합니다. 실패는 구현체 내부에서 로깅하고 삼킵니다.
    async fn publish(&self, event: BridgeEvent);
}

/// 대시보드가 디바이스 상태를 조작할 때 사용하는 제어 인터페이스
#[async_trait]
pub trait DeviceControl: Send + Sync {
    /// 가상 핀 쓰기. 디바이스가 보낸 `vw`와 동일하게 레지스트리를 갱신하고,
    /// 살아 있는 세션이 있으면 하드웨어 프레임을 디바이스로 전달합니다.
    async fn virtual_write(
        &self,
        device_id: &str,
        pin: u16,
        value: &str,
    ) -> Result<PinState, ControlError>;

    /// 디바이스 상태 스냅샷
    fn device_status(&self, device_id: &str) -> DeviceStatus;
}

/// 제어 요청 실패 사유
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("디바이스 {0}가 연결되어 있지 않습니다")]
    DeviceOffline(String),
    #[error("잘못된 요청: {0}")]
    InvalidRequest(String),
}
