//! 외부(대시보드)에서 들어오는 디바이스 제어
//!
//! 실시간 서버는 [`DeviceControl`] trait만 알고, 이 구현이 레지스트리 갱신과
//! 물리 디바이스로의 HARDWARE 프레임 전달을 담당합니다.

use async_trait::async_trait;
use shared::{ControlError, DeviceControl, DeviceStatus, PinState};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::protocol::{encode_virtual_write, CommandType, Frame};
use crate::service::device_registry::DeviceRegistry;
use crate::tool::error::GatewayError;
use crate::tool::SimpleUtils;

/// 게이트웨이 제어 핸들
#[derive(Clone)]
pub struct GatewayControl {
    registry: Arc<DeviceRegistry>,
}

impl GatewayControl {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl DeviceControl for GatewayControl {
    async fn virtual_write(
        &self,
        device_id: &str,
        pin: u16,
        value: &str,
    ) -> Result<PinState, ControlError> {
        if value.is_empty() || value.contains('\0') {
            return Err(ControlError::InvalidRequest(format!(
                "핀 {}에 쓸 수 없는 값입니다",
                pin
            )));
        }

        let token = self
            .registry
            .token_for(device_id)
            .ok_or_else(|| ControlError::DeviceOffline(device_id.to_string()))?;

        let state = self
            .registry
            .write_virtual_pin(&token, pin, value)
            .map_err(|e| match e {
                GatewayError::NotAuthenticated => ControlError::DeviceOffline(device_id.to_string()),
                other => ControlError::InvalidRequest(other.to_string()),
            })?;

        // 레지스트리 갱신 후 디바이스에도 같은 값을 전달해 양쪽을 맞춥니다
        if let Some(link) = self.registry.link(&token) {
            let frame = Frame::with_body(
                CommandType::Hardware.as_u8(),
                SimpleUtils::fresh_message_id(),
                encode_virtual_write(pin, value),
            );
            match link.send(frame).await {
                Ok(()) => debug!("디바이스 {}로 vw 전달: pin={} value={}", device_id, pin, value),
                Err(e) => warn!("디바이스 {}로 vw 전달 실패: {}", device_id, e),
            }
        }

        Ok(state)
    }

    fn device_status(&self, device_id: &str) -> DeviceStatus {
        self.registry.status(device_id)
    }
}
