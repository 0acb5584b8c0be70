//! 게이트웨이 테스트 모듈
//!
//! 각 기능별로 분리된 테스트 파일들을 관리합니다.

pub mod test_handler;
pub mod test_protocol;

// 테스트 유틸리티
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::protocol::{CommandType, Frame, FramePayload, HEADER_LEN};
use crate::service::{
    ConnectionService, DeviceRegistry, EventBridge, EventBridgeWorker, MemoryDeviceStore,
    SessionLink,
};
use shared::DomainEvent;

/// 테스트용 게이트웨이 구성요소
pub struct TestGateway {
    pub store: Arc<MemoryDeviceStore>,
    pub registry: Arc<DeviceRegistry>,
    pub connections: Arc<ConnectionService>,
    pub events: EventBridgeWorker,
}

impl TestGateway {
    /// 새 세션을 열고 (링크, 송신 큐 수신단)을 돌려줍니다.
    pub fn open_session(&self) -> (SessionLink, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(16);
        let link = self
            .connections
            .open_session("127.0.0.1:50000".to_string(), tx)
            .expect("Test assertion failed");
        (link, rx)
    }

    /// 지금까지 발행된 이벤트 전부
    pub fn drain_events(&mut self) -> Vec<DomainEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.events.try_next() {
            events.push(event.event);
        }
        events
    }
}

/// `(token, device_id)` 목록으로 테스트 게이트웨이 생성
pub fn create_test_gateway(devices: &[(&str, &str)]) -> TestGateway {
    let store = Arc::new(MemoryDeviceStore::with_devices(devices.iter().copied()));
    let (bridge, events) = EventBridge::channel(256);
    let registry = Arc::new(DeviceRegistry::new(store.clone(), bridge));
    let connections = Arc::new(ConnectionService::new(registry.clone(), 100));

    TestGateway {
        store,
        registry,
        connections,
        events,
    }
}

/// 프레임 하나 전송
pub async fn send_frame(stream: &mut TcpStream, frame: &Frame) {
    let bytes = frame.to_bytes().expect("Test assertion failed");
    stream.write_all(&bytes).await.expect("Test assertion failed");
}

/// 프레임 하나 수신 (RESPONSE는 길이 필드를 상태 코드로 해석)
pub async fn read_frame(stream: &mut TcpStream) -> Frame {
    let mut header = [0u8; HEADER_LEN];
    stream
        .read_exact(&mut header)
        .await
        .expect("Test assertion failed");

    let command = header[0];
    let message_id = u16::from_be_bytes([header[1], header[2]]);
    let length = u16::from_be_bytes([header[3], header[4]]);

    if command == CommandType::Response.as_u8() {
        return Frame {
            command,
            message_id,
            payload: FramePayload::Status(length),
        };
    }

    let mut body = vec![0u8; length as usize];
    stream
        .read_exact(&mut body)
        .await
        .expect("Test assertion failed");
    Frame::with_body(command, message_id, body)
}
