//! 프레임 코덱
//!
//! TCP는 메시지 경계를 보존하지 않으므로 수신 버퍼에 바이트를 누적하고,
//! 완성된 프레임이 있는 동안 반복해서 잘라냅니다. 남은 바이트는 다음 읽기를 위해 보존됩니다.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::codes::{CommandType, StatusCode};
use crate::tool::error::GatewayError;

/// 헤더 길이: 타입(1) + 메시지 ID(2) + 길이(2)
pub const HEADER_LEN: usize = 5;

/// 프레임 페이로드
///
/// RESPONSE 프레임은 길이 필드에 상태 코드를 담고 바디가 없습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePayload {
    Body(Bytes),
    Status(u16),
}

/// 프로토콜 프레임 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: u8,
    pub message_id: u16,
    pub payload: FramePayload,
}

impl Frame {
    /// 바디를 가진 프레임 생성
    pub fn with_body(command: u8, message_id: u16, body: impl Into<Bytes>) -> Self {
        Self {
            command,
            message_id,
            payload: FramePayload::Body(body.into()),
        }
    }

    /// 상태 응답 프레임 생성 (길이 필드 = 상태 코드, 바디 0바이트)
    pub fn status(message_id: u16, status: StatusCode) -> Self {
        Self {
            command: CommandType::Response.as_u8(),
            message_id,
            payload: FramePayload::Status(status.as_u16()),
        }
    }

    pub fn command_type(&self) -> Option<CommandType> {
        CommandType::from_u8(self.command)
    }

    /// 바디 바이트. 상태 응답이면 빈 슬라이스입니다.
    pub fn body(&self) -> &[u8] {
        match &self.payload {
            FramePayload::Body(body) => body,
            FramePayload::Status(_) => &[],
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self.payload {
            FramePayload::Status(code) => Some(code),
            FramePayload::Body(_) => None,
        }
    }

    /// 헤더의 길이 필드에 들어갈 값
    pub fn length_field(&self) -> Result<u16, GatewayError> {
        match &self.payload {
            FramePayload::Status(code) => Ok(*code),
            FramePayload::Body(body) => {
                u16::try_from(body.len()).map_err(|_| GatewayError::FrameTooLarge {
                    size: body.len(),
                    max: u16::MAX as usize,
                })
            }
        }
    }

    /// 프레임을 `dst` 뒤에 직렬화합니다.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<(), GatewayError> {
        let length = self.length_field()?;
        let body = self.body();

        dst.reserve(HEADER_LEN + body.len());
        dst.put_u8(self.command);
        dst.put_u16(self.message_id);
        dst.put_u16(length);
        dst.put_slice(body);
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Bytes, GatewayError> {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.body().len());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// 스트림 프레임 디코더
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_body: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl FrameCodec {
    pub fn new(max_body: usize) -> Self {
        Self { max_body }
    }

    pub fn max_body(&self) -> usize {
        self.max_body
    }

    /// 버퍼에서 프레임 하나를 디코딩합니다.
    ///
    /// * `Ok(Some(frame))` - 완성된 프레임. 해당 바이트는 버퍼에서 제거됩니다.
    /// * `Ok(None)` - 바이트가 더 필요함 (헤더 미만이거나 바디가 덜 도착함). 버퍼는 그대로입니다.
    /// * `Err(FrameTooLarge)` - 선언된 바디가 허용치를 초과. 스트림 재동기화가 불가능합니다.
    pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<Frame>, GatewayError> {
        if buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let command = buf[0];
        let message_id = u16::from_be_bytes([buf[1], buf[2]]);
        let length = u16::from_be_bytes([buf[3], buf[4]]);

        // RESPONSE 프레임의 길이 필드는 상태 코드
        if command == CommandType::Response.as_u8() {
            buf.advance(HEADER_LEN);
            return Ok(Some(Frame {
                command,
                message_id,
                payload: FramePayload::Status(length),
            }));
        }

        let body_len = length as usize;
        if body_len > self.max_body {
            return Err(GatewayError::FrameTooLarge {
                size: body_len,
                max: self.max_body,
            });
        }

        if buf.len() < HEADER_LEN + body_len {
            return Ok(None);
        }

        buf.advance(HEADER_LEN);
        let body = buf.split_to(body_len).freeze();

        Ok(Some(Frame {
            command,
            message_id,
            payload: FramePayload::Body(body),
        }))
    }

    /// 버퍼에 있는 완성된 프레임을 모두 디코딩합니다.
    ///
    /// 반환 후 버퍼에는 아직 완성되지 않은 프레임의 앞부분만 남습니다.
    pub fn decode_all(&self, buf: &mut BytesMut) -> Result<Vec<Frame>, GatewayError> {
        let mut frames = Vec::new();
        while let Some(frame) = self.decode(buf)? {
            frames.push(frame);
        }
        Ok(frames)
    }
}
