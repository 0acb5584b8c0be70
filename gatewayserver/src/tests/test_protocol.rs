//! 프로토콜 테스트
//!
//! 프레임 코덱 스트림 디코딩과 명령 파서 전략 순서 테스트

use bytes::{Bytes, BytesMut};

use crate::protocol::{
    parse_device_info, parse_hardware_command, CommandType, Frame, FrameCodec, HardwareCommand,
    ParseStrategy, StatusCode,
};
use crate::tool::error::GatewayError;

/// 인코딩한 프레임을 그대로 디코딩
#[test]
fn test_frame_round_trip() {
    let codec = FrameCodec::default();
    let cases: Vec<(u8, u16, Bytes)> = vec![
        (CommandType::Hardware.as_u8(), 1, Bytes::from_static(b"vw\x005\x00100")),
        (CommandType::Login.as_u8(), u16::MAX, Bytes::from_static(b"token")),
        (CommandType::Ping.as_u8(), 42, Bytes::new()),
    ];

    for (command, message_id, body) in cases {
        let frame = Frame::with_body(command, message_id, body.clone());
        let mut buf = BytesMut::from(&frame.to_bytes().expect("Test assertion failed")[..]);

        let decoded = codec
            .decode(&mut buf)
            .expect("Test assertion failed")
            .expect("frame must be complete");
        assert_eq!(decoded.command, command);
        assert_eq!(decoded.message_id, message_id);
        assert_eq!(decoded.body(), &body[..]);
        assert!(buf.is_empty(), "소비된 바이트는 버퍼에서 제거되어야 함");
    }

    println!("✅ 프레임 왕복 테스트 통과");
}

/// 한 바이트씩 도착해도 정확히 한 프레임
#[test]
fn test_partial_frame_accumulation() {
    let codec = FrameCodec::default();
    let frame = Frame::with_body(CommandType::Hardware.as_u8(), 7, &b"vw\x009\x00512"[..]);
    let bytes = frame.to_bytes().expect("Test assertion failed");

    let mut buf = BytesMut::new();
    let mut decoded = Vec::new();
    for chunk in bytes.chunks(1) {
        buf.extend_from_slice(chunk);
        decoded.extend(codec.decode_all(&mut buf).expect("Test assertion failed"));
    }

    assert_eq!(decoded, vec![frame]);
    assert!(buf.is_empty());

    println!("✅ 부분 프레임 누적 테스트 통과");
}

/// 여러 프레임이 한 번에 도착 (마지막은 미완성)
#[test]
fn test_coalesced_frames_keep_incomplete_tail() {
    let codec = FrameCodec::default();
    let first = Frame::with_body(CommandType::Ping.as_u8(), 1, Bytes::new());
    let second = Frame::with_body(CommandType::Hardware.as_u8(), 2, &b"vr\x005"[..]);
    let third = Frame::with_body(CommandType::Hardware.as_u8(), 3, &b"vw\x001\x00on"[..]);

    let mut buf = BytesMut::new();
    first.encode(&mut buf).expect("Test assertion failed");
    second.encode(&mut buf).expect("Test assertion failed");
    let third_bytes = third.to_bytes().expect("Test assertion failed");
    buf.extend_from_slice(&third_bytes[..6]);

    let frames = codec.decode_all(&mut buf).expect("Test assertion failed");
    assert_eq!(frames, vec![first, second]);
    assert_eq!(&buf[..], &third_bytes[..6], "미완성 프레임 바이트는 보존되어야 함");

    buf.extend_from_slice(&third_bytes[6..]);
    let frames = codec.decode_all(&mut buf).expect("Test assertion failed");
    assert_eq!(frames, vec![third]);

    println!("✅ 병합 프레임 테스트 통과");
}

/// 수신한 RESPONSE 프레임은 바디가 없음
#[test]
fn test_inbound_response_has_no_body() {
    let codec = FrameCodec::default();
    let ack = Frame::status(9, StatusCode::Success);
    let ping = Frame::with_body(CommandType::Ping.as_u8(), 10, Bytes::new());

    let mut buf = BytesMut::new();
    ack.encode(&mut buf).expect("Test assertion failed");
    ping.encode(&mut buf).expect("Test assertion failed");

    let frames = codec.decode_all(&mut buf).expect("Test assertion failed");
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].status_code(), Some(200));
    assert_eq!(frames[1], ping);
}

/// 허용치를 넘는 길이 선언
#[test]
fn test_frame_too_large() {
    let codec = FrameCodec::new(16);
    let frame = Frame::with_body(CommandType::Hardware.as_u8(), 1, vec![b'x'; 17]);
    let mut buf = BytesMut::from(&frame.to_bytes().expect("Test assertion failed")[..]);

    assert!(matches!(
        codec.decode(&mut buf),
        Err(GatewayError::FrameTooLarge { size: 17, max: 16 })
    ));
}

/// null 구분 전략이 가장 먼저 적용됨
#[test]
fn test_parser_precedence_null_separated() {
    let (command, strategy) =
        parse_hardware_command(b"vw\x009\x00512").expect("Test assertion failed");
    assert_eq!(strategy, ParseStrategy::NullSeparated);
    assert_eq!(
        command,
        HardwareCommand::VirtualWrite {
            pin: 9,
            value: "512".to_string()
        }
    );

    // 값 안의 공백은 그대로 유지
    let (command, strategy) =
        parse_hardware_command(b"vw\x001\x00hello world").expect("Test assertion failed");
    assert_eq!(strategy, ParseStrategy::NullSeparated);
    assert_eq!(
        command,
        HardwareCommand::VirtualWrite {
            pin: 1,
            value: "hello world".to_string()
        }
    );

    println!("✅ 파서 우선순위 테스트 통과");
}

/// 공백/쉼표 구분 대체 전략
#[test]
fn test_parser_delimited_fallback() {
    for body in [&b"vw 5 100"[..], b"vw,5,100", b"VW 5, 100", b"vw V5 100\r\n"] {
        let (command, strategy) = parse_hardware_command(body).expect("Test assertion failed");
        assert_eq!(strategy, ParseStrategy::Delimited);
        assert_eq!(
            command,
            HardwareCommand::VirtualWrite {
                pin: 5,
                value: "100".to_string()
            }
        );
    }

    let (command, _) = parse_hardware_command(b"vr 12").expect("Test assertion failed");
    assert_eq!(command, HardwareCommand::VirtualRead { pin: 12 });

    let (command, _) = parse_hardware_command(b"dw 13 1").expect("Test assertion failed");
    assert_eq!(command, HardwareCommand::DigitalWrite { pin: 13, value: 1 });
}

/// 붙여쓰기 전략 (손실 가능)
#[test]
fn test_parser_compact_fallback() {
    let (command, strategy) = parse_hardware_command(b"vr5").expect("Test assertion failed");
    assert_eq!(strategy, ParseStrategy::Compact);
    assert_eq!(command, HardwareCommand::VirtualRead { pin: 5 });

    let (command, strategy) = parse_hardware_command(b"vw3on").expect("Test assertion failed");
    assert_eq!(strategy, ParseStrategy::Compact);
    assert_eq!(
        command,
        HardwareCommand::VirtualWrite {
            pin: 3,
            value: "on".to_string()
        }
    );

    // 숫자 값은 핀과 구분할 수 없어 전부 핀으로 읽히고 값이 없으므로 실패
    assert!(parse_hardware_command(b"vw5100").is_err());
}

/// 해석 불가 바디
#[test]
fn test_parser_unparseable() {
    for body in [&b""[..], b"xx\x001\x002", b"vw", b"dw\x0013\x00high", b"vr\x00pin"] {
        assert!(
            matches!(
                parse_hardware_command(body),
                Err(GatewayError::UnparseableCommand(_))
            ),
            "{:?}는 해석되면 안 됨",
            body
        );
    }
}

/// 디바이스 정보 key/value 파싱 (모르는 키 보존)
#[test]
fn test_parse_device_info() {
    let body = b"fw\x000.9.1\x00h-beat\x0010\x00buff-in\x00256\x00dev\x00ESP32\x00tmpl\x00TMPL01\x00build\x00Oct 19 2026\x00ota\x001\x00";
    let info = parse_device_info(body);

    assert_eq!(info.firmware_version.as_deref(), Some("0.9.1"));
    assert_eq!(info.heartbeat_interval, Some(10));
    assert_eq!(info.buffer_size, Some(256));
    assert_eq!(info.device_model.as_deref(), Some("ESP32"));
    assert_eq!(info.template_id.as_deref(), Some("TMPL01"));
    assert_eq!(info.build_id.as_deref(), Some("Oct 19 2026"));
    assert_eq!(info.extra.get("ota").map(String::as_str), Some("1"));

    let info = parse_device_info(b"h-beat\x00soon");
    assert_eq!(info.heartbeat_interval, None);
    assert_eq!(info.extra.get("h-beat").map(String::as_str), Some("soon"));
}
