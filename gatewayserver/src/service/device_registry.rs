//! 디바이스 레지스트리
//!
//! 인증된 디바이스와 디바이스별 가상/디지털 핀 상태를 관리합니다.
//! 토큰을 키로 하는 `DashMap`에 보관하며 엔트리 단위 잠금으로 동시 연결 간 원자성을 보장합니다.
//!
//! 모든 상태 변화는 [`EventBridge`]로 도메인 이벤트를 발행하고,
//! 영속화는 [`DeviceStore`]에 fire-and-forget으로 위임합니다.

use dashmap::DashMap;
use shared::tool::CurrentTime;
use shared::{
    DeviceInfo, DeviceRecord, DeviceStatus, DisconnectReason, DomainEvent, PinKind, PinState,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::service::connection_service::SessionLink;
use crate::service::device_store::{DeviceStore, StoreError, TelemetryRecord};
use crate::service::event_bridge::EventBridge;
use crate::tool::error::{GatewayError, GatewayResult};
use crate::tool::SimpleUtils;

/// 레지스트리 엔트리
#[derive(Debug, Clone)]
pub struct Device {
    pub token: String,
    pub device_id: String,
    pub name: Option<String>,
    /// 디바이스를 소유한 세션
    pub link: SessionLink,
    pub virtual_pins: HashMap<u16, PinState>,
    pub digital_pins: HashMap<u16, PinState>,
    pub info: Option<DeviceInfo>,
    /// 연결 시각 (Unix 밀리초)
    pub connected_at_epoch: i64,
}

impl Device {
    pub fn session_id(&self) -> u64 {
        self.link.session_id()
    }

    fn pins_mut(&mut self, kind: PinKind) -> &mut HashMap<u16, PinState> {
        match kind {
            PinKind::Virtual => &mut self.virtual_pins,
            PinKind::Digital => &mut self.digital_pins,
        }
    }

    pub fn status(&self) -> DeviceStatus {
        let mut virtual_pins: Vec<PinState> = self.virtual_pins.values().cloned().collect();
        virtual_pins.sort_by_key(|p| p.pin_number);
        let mut digital_pins: Vec<PinState> = self.digital_pins.values().cloned().collect();
        digital_pins.sort_by_key(|p| p.pin_number);

        DeviceStatus {
            device_id: self.device_id.clone(),
            online: true,
            connected_at: Some(self.connected_at_epoch),
            virtual_pins,
            digital_pins,
        }
    }
}

/// 디바이스 레지스트리
pub struct DeviceRegistry {
    devices: DashMap<String, Device>,
    /// device_id → token
    device_index: DashMap<String, String>,
    store: Arc<dyn DeviceStore>,
    events: EventBridge,
}

impl DeviceRegistry {
    pub fn new(store: Arc<dyn DeviceStore>, events: EventBridge) -> Self {
        Self {
            devices: DashMap::new(),
            device_index: DashMap::new(),
            store,
            events,
        }
    }

    /// 토큰 인증 후 디바이스를 등록합니다.
    ///
    /// 알 수 없는 토큰이면 `InvalidToken`이고 아무 상태도 만들지 않습니다.
    /// 같은 토큰을 가진 다른 세션이 있으면 그 세션을 닫고 엔트리를 교체합니다.
    pub async fn authenticate(&self, token: &str, link: SessionLink) -> GatewayResult<DeviceRecord> {
        let record = self
            .store
            .find_device(token)
            .await?
            .ok_or(GatewayError::InvalidToken)?;

        let device = Device {
            token: token.to_string(),
            device_id: record.device_id.clone(),
            name: record.name.clone(),
            link,
            virtual_pins: HashMap::new(),
            digital_pins: HashMap::new(),
            info: None,
            connected_at_epoch: CurrentTime::now_millis(),
        };
        let session_id = device.session_id();

        if let Some(previous) = self.devices.insert(token.to_string(), device) {
            info!(
                "디바이스 {} 재로그인: 세션 {} → {}",
                previous.device_id,
                previous.session_id(),
                session_id
            );
            previous.link.close();
            if previous.device_id != record.device_id {
                self.device_index
                    .remove_if(&previous.device_id, |_, t| t == token);
            }
            self.events.emit(DomainEvent::DeviceDisconnected {
                device_id: previous.device_id,
                reason: DisconnectReason::Replaced,
            });
        }
        self.device_index
            .insert(record.device_id.clone(), token.to_string());

        info!(
            "✅ 디바이스 인증 완료: {} (토큰 {}, 세션 {})",
            record.device_id,
            SimpleUtils::mask_token(token),
            session_id
        );
        self.events.emit(DomainEvent::DeviceConnected {
            device_id: record.device_id.clone(),
        });

        Ok(record)
    }

    /// 가상 핀 쓰기 (upsert)
    pub fn write_virtual_pin(&self, token: &str, pin: u16, value: &str) -> GatewayResult<PinState> {
        self.write_pin(token, None, PinKind::Virtual, pin, value)
    }

    /// 디지털 핀 쓰기 (upsert)
    pub fn write_digital_pin(&self, token: &str, pin: u16, value: i64) -> GatewayResult<PinState> {
        self.write_pin(token, None, PinKind::Digital, pin, &value.to_string())
    }

    /// 핀 쓰기
    ///
    /// `owner`가 주어지면 해당 세션이 디바이스를 소유할 때만 씁니다.
    /// 교체되었거나 제거된 세션의 쓰기는 `NotAuthenticated`입니다.
    pub fn write_pin(
        &self,
        token: &str,
        owner: Option<u64>,
        kind: PinKind,
        pin: u16,
        value: &str,
    ) -> GatewayResult<PinState> {
        let (device_id, state) = {
            let mut device = self
                .devices
                .get_mut(token)
                .filter(|device| owner.map_or(true, |id| device.session_id() == id))
                .ok_or(GatewayError::NotAuthenticated)?;
            let state = PinState::new(pin, value, CurrentTime::now_millis());
            device.pins_mut(kind).insert(pin, state.clone());
            (device.device_id.clone(), state)
        };

        debug!(
            "핀 갱신: device={} kind={:?} pin={} value={} type={}",
            device_id,
            kind,
            pin,
            state.value,
            state.data_type.as_str()
        );

        self.events.emit(DomainEvent::PinUpdated {
            device_id,
            kind,
            pin,
            value: state.value.clone(),
            data_type: state.data_type,
        });

        let record = TelemetryRecord {
            device_token: token.to_string(),
            pin,
            pin_kind: kind,
            value: state.value.clone(),
            data_type: state.data_type,
        };
        let store = self.store.clone();
        spawn_persistence("write_telemetry", async move {
            store.write_telemetry(&record).await
        });

        Ok(state)
    }

    /// 가상 핀 읽기. 디바이스가 없으면 `NotAuthenticated`, 핀이 없으면 `Ok(None)`.
    pub fn read_virtual_pin(&self, token: &str, pin: u16) -> GatewayResult<Option<PinState>> {
        let device = self
            .devices
            .get(token)
            .ok_or(GatewayError::NotAuthenticated)?;
        Ok(device.virtual_pins.get(&pin).cloned())
    }

    /// 디바이스 정보 갱신 및 저장소 upsert
    pub fn update_device_info(&self, token: &str, info: DeviceInfo) -> GatewayResult<()> {
        {
            let mut device = self
                .devices
                .get_mut(token)
                .ok_or(GatewayError::NotAuthenticated)?;
            device.info = Some(info.clone());
        }

        let store = self.store.clone();
        let token = token.to_string();
        spawn_persistence("upsert_device_info", async move {
            store.upsert_device_info(&token, &info).await
        });
        Ok(())
    }

    /// `session_id` 세션이 토큰의 현재 소유자인지
    pub fn is_owned_by(&self, token: &str, session_id: u64) -> bool {
        self.devices
            .get(token)
            .is_some_and(|device| device.session_id() == session_id)
    }

    /// 토큰으로 조회
    pub fn get(&self, token: &str) -> Option<Device> {
        self.devices.get(token).map(|entry| entry.value().clone())
    }

    /// 토큰을 소유한 세션의 링크 (핀 맵은 복사하지 않음)
    pub fn link(&self, token: &str) -> Option<SessionLink> {
        self.devices.get(token).map(|entry| entry.link.clone())
    }

    /// 디바이스 ID로 조회
    pub fn get_by_device_id(&self, device_id: &str) -> Option<Device> {
        let token = self.device_index.get(device_id)?.value().clone();
        self.get(&token)
    }

    pub fn token_for(&self, device_id: &str) -> Option<String> {
        self.device_index
            .get(device_id)
            .map(|entry| entry.value().clone())
    }

    /// 디바이스 상태 스냅샷 (연결되어 있지 않으면 offline)
    pub fn status(&self, device_id: &str) -> DeviceStatus {
        self.get_by_device_id(device_id)
            .map(|device| device.status())
            .unwrap_or_else(|| DeviceStatus::offline(device_id))
    }

    /// 디바이스 제거
    ///
    /// `session_id`가 현재 소유 세션과 같을 때만 제거합니다. 이미 제거되었거나
    /// 다른 세션이 소유하면 `false`이며 이벤트도 발행하지 않습니다.
    pub fn remove(&self, token: &str, session_id: u64, reason: DisconnectReason) -> bool {
        let Some((_, device)) = self
            .devices
            .remove_if(token, |_, device| device.session_id() == session_id)
        else {
            return false;
        };

        self.device_index
            .remove_if(&device.device_id, |_, t| t == token);

        info!(
            "디바이스 {} 연결 해제 ({:?}, 세션 {})",
            device.device_id, reason, session_id
        );
        self.events.emit(DomainEvent::DeviceDisconnected {
            device_id: device.device_id,
            reason,
        });
        true
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// 영속화 호출을 백그라운드로 실행합니다. 실패는 로그만 남깁니다.
fn spawn_persistence<F>(operation: &'static str, task: F)
where
    F: Future<Output = Result<(), StoreError>> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if let Err(e) = task.await {
                    let err = GatewayError::from(e);
                    crate::tool::error::ErrorHandler::handle_error(&err, "DeviceRegistry", operation);
                }
            });
        }
        Err(_) => warn!("tokio 런타임이 없어 {} 호출을 건너뜁니다", operation),
    }
}
