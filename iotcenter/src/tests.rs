//! 통합 서버 종단간 테스트
//!
//! 디바이스 TCP 세션에서 발생한 핀 쓰기가 이벤트 브리지를 거쳐 WebSocket 구독자에게
//! 도착하는지, 대시보드 쓰기가 디바이스로 돌아가는지 확인합니다.

use bytes::{Bytes, BytesMut};
use futures_util::{SinkExt, StreamExt};
use gatewayserver::{
    CommandType, DeviceStore, Frame, FrameCodec, GatewayConfig, MemoryDeviceStore, StatusCode,
};
use realtimeserver::{AuthService, RealtimeConfig, ServerMessage};
use shared::DisconnectReason;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::{IotCenter, IotCenterConfig};

const SECRET: &str = "iotcenter-test-secret-key-0123456789";

type Dashboard = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Device {
    stream: TcpStream,
    buf: BytesMut,
    codec: FrameCodec,
}

impl Device {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.expect("Test assertion failed"),
            buf: BytesMut::new(),
            codec: FrameCodec::default(),
        }
    }

    async fn send(&mut self, command: CommandType, message_id: u16, body: &'static [u8]) {
        let frame = Frame::with_body(command.as_u8(), message_id, Bytes::from_static(body));
        let bytes = frame.to_bytes().expect("Test assertion failed");
        self.stream.write_all(&bytes).await.expect("Test assertion failed");
    }

    async fn recv(&mut self) -> Frame {
        timeout(Duration::from_secs(2), async {
            loop {
                if let Some(frame) = self.codec.decode(&mut self.buf).expect("Test assertion failed") {
                    return frame;
                }
                let read = self
                    .stream
                    .read_buf(&mut self.buf)
                    .await
                    .expect("Test assertion failed");
                assert!(read > 0, "gateway closed the connection");
            }
        })
        .await
        .expect("frame must arrive")
    }
}

async fn dashboard_send(ws: &mut Dashboard, text: String) {
    ws.send(Message::Text(text)).await.expect("Test assertion failed");
}

async fn dashboard_recv(ws: &mut Dashboard) -> ServerMessage {
    loop {
        let message = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("message must arrive")
            .expect("stream must stay open")
            .expect("Test assertion failed");
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).expect("Test assertion failed");
        }
    }
}

fn test_config() -> IotCenterConfig {
    IotCenterConfig {
        gateway: GatewayConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..GatewayConfig::default()
        },
        realtime: RealtimeConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: Some(SECRET.to_string()),
        },
    }
}

/// 디바이스 로그인 → vw → 구독자 수신 → 대시보드 쓰기 → 디바이스 수신 → 연결 해제
#[tokio::test]
async fn test_device_to_dashboard_round_trip() {
    let store = Arc::new(MemoryDeviceStore::with_devices([("tok-e2e", "device-e2e")]));
    let center = IotCenter::with_store(test_config(), store.clone()).expect("Test assertion failed");
    let addrs = center.start().await.expect("Test assertion failed");

    let (mut dashboard, _) = connect_async(format!("ws://{}", addrs.realtime))
        .await
        .expect("Test assertion failed");
    dashboard_send(
        &mut dashboard,
        r#"{"type":"subscribe","deviceId":"device-e2e"}"#.to_string(),
    )
    .await;
    assert!(matches!(
        dashboard_recv(&mut dashboard).await,
        ServerMessage::Subscribed { .. }
    ));

    let mut device = Device::connect(addrs.gateway.plain).await;
    device.send(CommandType::Login, 1, b"tok-e2e").await;
    assert_eq!(device.recv().await, Frame::status(1, StatusCode::Success));
    assert!(matches!(
        dashboard_recv(&mut dashboard).await,
        ServerMessage::DeviceConnected { ref device_id, .. } if device_id == "device-e2e"
    ));

    device.send(CommandType::Hardware, 2, b"vw\x00V5\x00100").await;
    assert_eq!(device.recv().await, Frame::status(2, StatusCode::Success));
    match dashboard_recv(&mut dashboard).await {
        ServerMessage::VirtualPinUpdate {
            device_id,
            pin,
            value,
            timestamp,
            ..
        } => {
            assert_eq!(device_id, "device-e2e");
            assert_eq!(pin, 5);
            assert_eq!(value, "100");
            assert!(timestamp > 0);
        }
        other => panic!("unexpected message: {:?}", other),
    }

    // 대시보드 쓰기
    let token = AuthService::new(Some(SECRET.to_string()))
        .issue("operator", chrono::Duration::minutes(5))
        .expect("Test assertion failed");
    dashboard_send(
        &mut dashboard,
        format!(r#"{{"type":"authenticate","token":"{}"}}"#, token),
    )
    .await;
    assert!(matches!(
        dashboard_recv(&mut dashboard).await,
        ServerMessage::Authenticated { .. }
    ));

    dashboard_send(
        &mut dashboard,
        r#"{"type":"virtual_write","deviceId":"device-e2e","pin":7,"value":"on"}"#.to_string(),
    )
    .await;

    let pushed = device.recv().await;
    assert_eq!(pushed.command, CommandType::Hardware.as_u8());
    assert_eq!(pushed.body(), b"vw\x007\x00on");

    // 응답과 브리지 이벤트는 서로 다른 경로라 순서가 보장되지 않음
    let mut got_ack = false;
    let mut got_update = false;
    for _ in 0..2 {
        match dashboard_recv(&mut dashboard).await {
            ServerMessage::VirtualWriteAck { pin: 7, .. } => got_ack = true,
            ServerMessage::VirtualPinUpdate { pin: 7, .. } => got_update = true,
            other => panic!("unexpected message: {:?}", other),
        }
    }
    assert!(got_ack && got_update);

    dashboard_send(
        &mut dashboard,
        r#"{"type":"get_device_status","deviceId":"device-e2e"}"#.to_string(),
    )
    .await;
    match dashboard_recv(&mut dashboard).await {
        ServerMessage::DeviceStatus(status) => {
            assert!(status.online);
            let pins: Vec<u16> = status.virtual_pins.iter().map(|p| p.pin_number).collect();
            assert_eq!(pins, vec![5, 7]);
        }
        other => panic!("unexpected message: {:?}", other),
    }

    drop(device);
    assert!(matches!(
        dashboard_recv(&mut dashboard).await,
        ServerMessage::DeviceDisconnected {
            ref device_id,
            reason: DisconnectReason::SocketClosed,
            ..
        } if device_id == "device-e2e"
    ));

    // 텔레메트리는 응답과 별개로 저장됨 (디바이스 쓰기 + 대시보드 쓰기)
    assert_eq!(store.telemetry().len(), 2);

    center.print_status().await;
    center.stop().await.expect("Test assertion failed");
    println!("✅ 디바이스 ↔ 대시보드 종단간 테스트 통과");
}

/// 통합 서버는 한 번만 시작 가능
#[tokio::test]
async fn test_center_starts_once() {
    let store = Arc::new(MemoryDeviceStore::new());
    let center = IotCenter::with_store(test_config(), store).expect("Test assertion failed");
    center.start().await.expect("Test assertion failed");
    assert!(center.start().await.is_err());
    center.stop().await.expect("Test assertion failed");
}

/// 정적 토큰 모드 저장소 선택
#[tokio::test]
async fn test_build_device_store_static_tokens() {
    let config = GatewayConfig {
        static_tokens: vec![("tok".to_string(), "device-1".to_string())],
        ..GatewayConfig::default()
    };
    let store = crate::build_device_store(&config).expect("Test assertion failed");
    let record = store
        .find_device("tok")
        .await
        .expect("Test assertion failed")
        .expect("static token must resolve");
    assert_eq!(record.device_id, "device-1");
}
