//! 디바이스 바이너리 프로토콜
//!
//! 필드에 배포된 하드웨어와 주고받는 5바이트 헤더 프레임 포맷을 정의합니다.
//!
//! # 프레임 구조 (빅엔디언)
//!
//! ```text
//! [명령 타입: u8][메시지 ID: u16][바디 길이: u16][바디: 바디 길이 바이트]
//! ```
//!
//! 바디가 없는 응답(RESPONSE) 프레임은 길이 필드에 상태 코드를 싣고 실제 바디는 0바이트입니다.
//! 와이어 호환을 위해 이 동작을 그대로 유지해야 합니다.
//!
//! # 모듈 구조
//!
//! - **codes**: 명령 타입 / 상태 코드 상수
//! - **frame**: 프레임 인코딩 / 스트림 디코딩
//! - **command**: 하드웨어 명령 바디 파서 (다중 전략)

pub mod codes;
pub mod command;
pub mod frame;

pub use codes::{CommandType, StatusCode};
pub use command::{
    encode_virtual_write, parse_device_info, parse_hardware_command, HardwareCommand,
    ParseStrategy,
};
pub use frame::{Frame, FrameCodec, FramePayload, HEADER_LEN};
