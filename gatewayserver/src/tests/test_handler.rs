//! 핸들러 테스트
//!
//! 세션 상태 머신: 프레임마다 메시지 ID가 같은 응답 하나

use async_trait::async_trait;
use bytes::Bytes;
use shared::{DeviceInfo, DeviceRecord, DisconnectReason, DomainEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_test::{assert_pending, assert_ready};

use super::{create_test_gateway, TestGateway};
use crate::handler::CommandHandler;
use crate::protocol::{CommandType, Frame, StatusCode};
use crate::service::{
    ConnectionService, DeviceRegistry, DeviceStore, EventBridge, MemoryDeviceStore, SessionLink,
    StoreError, TelemetryRecord,
};

fn frame(command: CommandType, message_id: u16, body: &'static [u8]) -> Frame {
    Frame::with_body(command.as_u8(), message_id, Bytes::from_static(body))
}

async fn login(handler: &CommandHandler, link: &SessionLink, token: &'static [u8]) -> Frame {
    handler
        .handle_frame(link, frame(CommandType::Login, 1, token))
        .await
        .expect("login must be answered")
}

fn setup() -> (TestGateway, CommandHandler) {
    let gateway = create_test_gateway(&[("tok-1", "device-1"), ("tok-2", "device-2")]);
    let handler = CommandHandler::new(gateway.connections.clone());
    (gateway, handler)
}

/// 로그인 전 하드웨어 프레임
#[tokio::test]
async fn test_hardware_before_login() {
    let (mut gateway, handler) = setup();
    let (link, _rx) = gateway.open_session();

    let reply = handler
        .handle_frame(&link, frame(CommandType::Hardware, 3, b"vw\x005\x00100"))
        .await
        .expect("Test assertion failed");
    assert_eq!(reply, Frame::status(3, StatusCode::NotAuthenticated));
    assert!(gateway.registry.is_empty());
    assert!(gateway.drain_events().is_empty());

    println!("✅ 미인증 하드웨어 프레임 테스트 통과");
}

/// 잘못된 토큰은 연결을 유지하고, 재시도로 로그인 가능
#[tokio::test]
async fn test_invalid_then_valid_login() {
    let (mut gateway, handler) = setup();
    let (link, _rx) = gateway.open_session();

    let reply = login(&handler, &link, b"wrong").await;
    assert_eq!(reply, Frame::status(1, StatusCode::InvalidToken));
    assert!(gateway.connections.session_token(link.session_id()).is_none());
    assert!(!link.is_closed());

    let reply = login(&handler, &link, b"tok-1\0").await;
    assert_eq!(reply, Frame::status(1, StatusCode::Success));
    assert_eq!(
        gateway.connections.session_token(link.session_id()).as_deref(),
        Some("tok-1")
    );
    assert_eq!(
        gateway.drain_events(),
        vec![DomainEvent::DeviceConnected {
            device_id: "device-1".into()
        }]
    );
    assert_eq!(gateway.connections.get_connection_stats().failed_logins, 1);

    println!("✅ 로그인 재시도 테스트 통과");
}

/// HARDWARE_LOGIN도 로그인으로 처리, 메시지 ID 0은 새 ID로 교체
#[tokio::test]
async fn test_hardware_login_and_zero_message_id() {
    let (gateway, handler) = setup();
    let (link, _rx) = gateway.open_session();

    let reply = handler
        .handle_frame(&link, frame(CommandType::HardwareLogin, 0, b"tok-1"))
        .await
        .expect("Test assertion failed");
    assert_eq!(reply.status_code(), Some(StatusCode::Success.as_u16()));
    assert_ne!(reply.message_id, 0);
}

/// 로그인된 세션에서 다시 로그인
#[tokio::test]
async fn test_login_on_authenticated_session() {
    let (gateway, handler) = setup();
    let (link, _rx) = gateway.open_session();
    login(&handler, &link, b"tok-1").await;

    assert_eq!(
        login(&handler, &link, b"tok-1").await,
        Frame::status(1, StatusCode::Success)
    );
    assert_eq!(
        login(&handler, &link, b"tok-2").await,
        Frame::status(1, StatusCode::NotAllowed)
    );
}

/// vw / vr / 파싱 실패 / 알 수 없는 명령
#[tokio::test]
async fn test_hardware_commands() {
    let (mut gateway, handler) = setup();
    let (link, _rx) = gateway.open_session();
    login(&handler, &link, b"tok-1").await;
    gateway.drain_events();

    let reply = handler
        .handle_frame(&link, frame(CommandType::Hardware, 2, b"vw\x00V5\x00100"))
        .await
        .expect("Test assertion failed");
    assert_eq!(reply, Frame::status(2, StatusCode::Success));

    let reply = handler
        .handle_frame(&link, frame(CommandType::Hardware, 3, b"vr\x005"))
        .await
        .expect("Test assertion failed");
    assert_eq!(
        reply,
        Frame::with_body(CommandType::Hardware.as_u8(), 3, &b"vw\x005\x00100"[..])
    );

    let reply = handler
        .handle_frame(&link, frame(CommandType::Hardware, 4, b"vr\x0099"))
        .await
        .expect("Test assertion failed");
    assert_eq!(reply, Frame::status(4, StatusCode::NoData));

    let reply = handler
        .handle_frame(&link, frame(CommandType::Hardware, 5, b"zz\x001"))
        .await
        .expect("Test assertion failed");
    assert_eq!(reply, Frame::status(5, StatusCode::IllegalCommandBody));

    let reply = handler
        .handle_frame(&link, Frame::with_body(99, 6, Bytes::new()))
        .await
        .expect("Test assertion failed");
    assert_eq!(reply, Frame::status(6, StatusCode::IllegalCommand));

    let reply = handler
        .handle_frame(&link, frame(CommandType::Hardware, 7, b"dw\x0013\x001"))
        .await
        .expect("Test assertion failed");
    assert_eq!(reply, Frame::status(7, StatusCode::Success));

    let events = gateway.drain_events();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[0],
        DomainEvent::PinUpdated { device_id, pin: 5, value, .. } if device_id == "device-1" && value == "100"
    ));

    println!("✅ 하드웨어 명령 테스트 통과");
}

/// 핑과 디바이스 정보
#[tokio::test]
async fn test_ping_and_device_info() {
    let (gateway, handler) = setup();
    let (link, _rx) = gateway.open_session();

    let reply = handler
        .handle_frame(&link, frame(CommandType::Ping, 8, b""))
        .await
        .expect("Test assertion failed");
    assert_eq!(reply, Frame::status(8, StatusCode::NotAuthenticated));

    login(&handler, &link, b"tok-1").await;

    let reply = handler
        .handle_frame(&link, frame(CommandType::Ping, 9, b""))
        .await
        .expect("Test assertion failed");
    assert_eq!(reply, Frame::status(9, StatusCode::Success));

    let reply = handler
        .handle_frame(
            &link,
            frame(CommandType::Internal, 10, b"fw\x001.0.0\x00h-beat\x0010\x00"),
        )
        .await
        .expect("Test assertion failed");
    assert_eq!(reply, Frame::status(10, StatusCode::Success));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let info = gateway
        .store
        .device_info("tok-1")
        .expect("device info must be persisted");
    assert_eq!(info.firmware_version.as_deref(), Some("1.0.0"));
    assert_eq!(
        gateway
            .registry
            .get("tok-1")
            .and_then(|d| d.info)
            .and_then(|i| i.heartbeat_interval),
        Some(10)
    );
}

/// 디바이스가 보낸 RESPONSE(ack)에는 응답하지 않음
#[tokio::test]
async fn test_inbound_ack_is_not_answered() {
    let (gateway, handler) = setup();
    let (link, _rx) = gateway.open_session();

    let reply = handler
        .handle_frame(&link, Frame::status(11, StatusCode::Success))
        .await;
    assert!(reply.is_none());
}

/// 교체된 세션의 하드웨어 프레임은 변경 없이 NOT_AUTHENTICATED
#[tokio::test]
async fn test_replaced_session_is_rejected() {
    let (mut gateway, handler) = setup();
    let (old_link, _old_rx) = gateway.open_session();
    let (new_link, _new_rx) = gateway.open_session();

    login(&handler, &old_link, b"tok-1").await;
    login(&handler, &new_link, b"tok-1").await;
    gateway.drain_events();

    let reply = handler
        .handle_frame(&old_link, frame(CommandType::Hardware, 12, b"vw\x001\x00stale"))
        .await
        .expect("Test assertion failed");
    assert_eq!(reply, Frame::status(12, StatusCode::NotAuthenticated));
    assert!(gateway.drain_events().is_empty());

    // 이전 세션의 소켓 종료는 새 디바이스 엔트리를 건드리지 않음
    assert!(gateway
        .connections
        .close_session(old_link.session_id(), DisconnectReason::SocketClosed));
    assert!(gateway.registry.is_owned_by("tok-1", new_link.session_id()));
    assert!(gateway.drain_events().is_empty());
}

/// 조회가 `gate`에서 멈추는 저장소 (느린 HTTP 조회 재현)
struct GatedStore {
    inner: Arc<MemoryDeviceStore>,
    gate: Notify,
}

#[async_trait]
impl DeviceStore for GatedStore {
    async fn find_device(&self, token: &str) -> Result<Option<DeviceRecord>, StoreError> {
        self.gate.notified().await;
        self.inner.find_device(token).await
    }

    async fn upsert_device_info(&self, token: &str, info: &DeviceInfo) -> Result<(), StoreError> {
        self.inner.upsert_device_info(token, info).await
    }

    async fn write_telemetry(&self, record: &TelemetryRecord) -> Result<(), StoreError> {
        self.inner.write_telemetry(record).await
    }
}

/// 저장소 조회 중 세션이 닫히면 레지스트리에 남지 않음
#[tokio::test]
async fn test_session_closed_during_login_lookup() {
    let inner = Arc::new(MemoryDeviceStore::with_devices([("tok-1", "device-1")]));
    let store = Arc::new(GatedStore {
        inner: inner.clone(),
        gate: Notify::new(),
    });
    let (bridge, events) = EventBridge::channel(16);
    let registry = Arc::new(DeviceRegistry::new(store.clone(), bridge));
    let connections = Arc::new(ConnectionService::new(registry.clone(), 10));
    let mut gateway = TestGateway {
        store: inner,
        registry,
        connections,
        events,
    };
    let handler = CommandHandler::new(gateway.connections.clone());
    let (link, _rx) = gateway.open_session();

    let mut pending_login =
        tokio_test::task::spawn(handler.handle_frame(&link, frame(CommandType::Login, 1, b"tok-1")));
    assert_pending!(pending_login.poll());

    // 조회 대기 중 하트비트 정리로 세션 종료
    assert!(gateway
        .connections
        .close_session(link.session_id(), DisconnectReason::HeartbeatTimeout));
    assert!(gateway.registry.is_empty());

    store.gate.notify_one();
    assert!(pending_login.is_woken());
    let reply = assert_ready!(pending_login.poll());
    assert_eq!(reply, Some(Frame::status(1, StatusCode::NotAuthenticated)));

    assert!(gateway.registry.is_empty(), "닫힌 세션의 디바이스가 남으면 안 됨");
    assert_eq!(
        gateway.drain_events(),
        vec![
            DomainEvent::DeviceConnected {
                device_id: "device-1".to_string(),
            },
            DomainEvent::DeviceDisconnected {
                device_id: "device-1".to_string(),
                reason: DisconnectReason::SocketClosed,
            },
        ]
    );

    println!("✅ 로그인 조회 중 세션 종료 테스트 통과");
}
