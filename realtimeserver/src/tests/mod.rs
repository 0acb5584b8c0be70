//! 실시간 서버 테스트 모듈


use async_trait::async_trait;
use shared::{ControlError, DeviceControl, DeviceStatus, PinState};
use std::sync::Mutex;

pub const TEST_SECRET: &str = "realtime-test-secret-key-0123456789";

/// 온라인 디바이스 목록만 아는 가짜 제어기
#[derive(Debug, Default)]
pub struct FakeControl {
    online: Vec<String>,
    writes: Mutex<Vec<(String, u16, String)>>,
}

impl FakeControl {
    pub fn with_online(devices: &[&str]) -> Self {
        Self {
            online: devices.iter().map(|d| d.to_string()).collect(),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn writes(&self) -> Vec<(String, u16, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceControl for FakeControl {
    async fn virtual_write(
        &self,
        device_id: &str,
        pin: u16,
        value: &str,
    ) -> Result<PinState, ControlError> {
        if !self.online.iter().any(|d| d == device_id) {
            return Err(ControlError::DeviceOffline(device_id.to_string()));
        }
        self.writes
            .lock()
            .unwrap()
            .push((device_id.to_string(), pin, value.to_string()));
        Ok(PinState::new(pin, value, 1))
    }

    fn device_status(&self, device_id: &str) -> DeviceStatus {
        let mut status = DeviceStatus::offline(device_id);
        status.online = self.online.iter().any(|d| d == device_id);
        status
    }
}
