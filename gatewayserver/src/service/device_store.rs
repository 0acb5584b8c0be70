//! 디바이스 저장소 연동
//!
//! 디바이스/핀 레코드의 영속화는 외부 HTTP API가 담당합니다. 게이트웨이는
//! [`DeviceStore`] trait을 통해서만 접근합니다.
//!
//! - [`HttpDeviceStore`]: 운영용 HTTP 클라이언트
//! - [`MemoryDeviceStore`]: 고정 토큰 모드 및 테스트용

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use shared::{DeviceInfo, DeviceRecord, PinDataType, PinKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// 저장소 에러
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP 요청 실패: {0}")]
    Http(#[from] reqwest::Error),

    #[error("예상하지 못한 응답 상태: {0}")]
    UnexpectedStatus(u16),

    #[error("저장소 사용 불가: {0}")]
    Unavailable(String),

    #[error("잘못된 저장소 URL: {0}")]
    InvalidUrl(String),
}

/// 텔레메트리 기록 요청
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub device_token: String,
    pub pin: u16,
    pub pin_kind: PinKind,
    pub value: String,
    pub data_type: PinDataType,
}

/// 디바이스 저장소 인터페이스
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// 토큰으로 디바이스 조회. 없으면 `Ok(None)`.
    async fn find_device(&self, token: &str) -> Result<Option<DeviceRecord>, StoreError>;

    /// 디바이스 정보 upsert
    async fn upsert_device_info(&self, token: &str, info: &DeviceInfo) -> Result<(), StoreError>;

    /// 핀 값 기록
    async fn write_telemetry(&self, record: &TelemetryRecord) -> Result<(), StoreError>;
}

/// HTTP API 기반 저장소
///
/// 토큰은 항상 하나의 경로 세그먼트로 percent-encoding 되어 붙습니다.
pub struct HttpDeviceStore {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpDeviceStore {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| StoreError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// `base_url` 뒤에 세그먼트를 붙입니다. `/`, `?`, `#`, `%` 등은 인코딩됩니다.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("x-api-key", key),
            None => request,
        }
    }
}

#[async_trait]
impl DeviceStore for HttpDeviceStore {
    async fn find_device(&self, token: &str) -> Result<Option<DeviceRecord>, StoreError> {
        // "."과 ".."은 URL 정규화로 사라지므로 조회하지 않음
        if !is_path_safe(token) {
            return Ok(None);
        }

        let url = self.endpoint(&["api", "devices", "token", token])?;
        let response = self.with_key(self.client.get(url)).send().await?;

        match response.status().as_u16() {
            200 => Ok(Some(response.json::<DeviceRecord>().await?)),
            404 => Ok(None),
            other => Err(StoreError::UnexpectedStatus(other)),
        }
    }

    async fn upsert_device_info(&self, token: &str, info: &DeviceInfo) -> Result<(), StoreError> {
        if !is_path_safe(token) {
            return Err(StoreError::InvalidUrl(format!("토큰 세그먼트: {:?}", token)));
        }

        let url = self.endpoint(&["api", "devices", token, "info"])?;
        let response = self.with_key(self.client.post(url)).json(info).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::UnexpectedStatus(response.status().as_u16()))
        }
    }

    async fn write_telemetry(&self, record: &TelemetryRecord) -> Result<(), StoreError> {
        let url = self.endpoint(&["api", "telemetry"])?;
        let response = self.with_key(self.client.post(url)).json(record).send().await?;

        if response.status().is_success() {
            debug!("텔레메트리 기록 완료: pin={} value={}", record.pin, record.value);
            Ok(())
        } else {
            Err(StoreError::UnexpectedStatus(response.status().as_u16()))
        }
    }
}

fn is_path_safe(token: &str) -> bool {
    !matches!(token, "" | "." | "..")
}

/// 메모리 저장소
///
/// 기록된 텔레메트리와 디바이스 정보를 보관해 테스트에서 검증할 수 있습니다.
#[derive(Default)]
pub struct MemoryDeviceStore {
    devices: DashMap<String, DeviceRecord>,
    telemetry: Mutex<Vec<TelemetryRecord>>,
    infos: DashMap<String, DeviceInfo>,
    fail_writes: AtomicBool,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(token, device_id)` 목록으로 생성
    pub fn with_devices<I, T, D>(devices: I) -> Self
    where
        I: IntoIterator<Item = (T, D)>,
        T: Into<String>,
        D: Into<String>,
    {
        let store = Self::new();
        for (token, device_id) in devices {
            store.add_device(token, device_id);
        }
        store
    }

    pub fn add_device(&self, token: impl Into<String>, device_id: impl Into<String>) {
        let token = token.into();
        self.devices.insert(
            token.clone(),
            DeviceRecord {
                device_id: device_id.into(),
                token,
                name: None,
            },
        );
    }

    /// 이후 쓰기 요청을 실패시킵니다 (저장소 장애 재현용)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn telemetry(&self) -> Vec<TelemetryRecord> {
        self.telemetry.lock().clone()
    }

    pub fn device_info(&self, token: &str) -> Option<DeviceInfo> {
        self.infos.get(token).map(|entry| entry.value().clone())
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("쓰기 실패 모드".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DeviceStore for MemoryDeviceStore {
    async fn find_device(&self, token: &str) -> Result<Option<DeviceRecord>, StoreError> {
        Ok(self.devices.get(token).map(|entry| entry.value().clone()))
    }

    async fn upsert_device_info(&self, token: &str, info: &DeviceInfo) -> Result<(), StoreError> {
        self.check_writable()?;
        self.infos.insert(token.to_string(), info.clone());
        Ok(())
    }

    async fn write_telemetry(&self, record: &TelemetryRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        self.telemetry.lock().push(record.clone());
        Ok(())
    }
}
