//! 명령 처리기
//!
//! 세션 상태 머신(미인증 → 인증 → 종료)에 따라 디코딩된 프레임 하나를 처리하고
//! 메시지 ID가 같은 응답 프레임 하나를 만듭니다. 에러는 종류별 상태 코드로 응답합니다.

use shared::tool::HexUtils;
use shared::PinKind;
use std::sync::Arc;
use tracing::{debug, info};

use crate::protocol::{
    encode_virtual_write, parse_device_info, parse_hardware_command, CommandType, Frame,
    HardwareCommand, StatusCode,
};
use crate::service::connection_service::SessionLink;
use crate::service::{ConnectionService, DeviceRegistry};
use crate::tool::error::{ErrorHandler, GatewayError, GatewayResult};
use crate::tool::SimpleUtils;

/// 명령 처리기
pub struct CommandHandler {
    connections: Arc<ConnectionService>,
    registry: Arc<DeviceRegistry>,
}

impl CommandHandler {
    pub fn new(connections: Arc<ConnectionService>) -> Self {
        let registry = connections.registry().clone();
        Self {
            connections,
            registry,
        }
    }

    /// 프레임 하나를 처리하고 응답 프레임을 돌려줍니다.
    ///
    /// 디바이스가 보낸 RESPONSE(ack) 프레임만 응답 없이 `None`입니다.
    pub async fn handle_frame(&self, link: &SessionLink, frame: Frame) -> Option<Frame> {
        let session_id = link.session_id();
        self.connections.record_frame();

        debug!(
            "세션 {} 프레임 수신: cmd={} id={} body=[{}]",
            session_id,
            frame.command,
            frame.message_id,
            HexUtils::preview(frame.body(), 32)
        );

        // 인증된 세션은 어떤 트래픽이든 하트비트로 취급
        let token = self.connections.session_token(session_id);
        if token.is_some() {
            self.connections.touch(session_id);
        }

        let message_id = match frame.message_id {
            0 => SimpleUtils::fresh_message_id(),
            id => id,
        };

        let command = match frame.command_type() {
            Some(CommandType::Response) => {
                debug!(
                    "세션 {} ack 수신: id={} status={:?}",
                    session_id,
                    frame.message_id,
                    frame.status_code()
                );
                return None;
            }
            Some(command) => command,
            None => {
                return Some(self.error_response(
                    message_id,
                    GatewayError::UnknownCommand(frame.command),
                    "dispatch",
                ))
            }
        };

        let result = if command.is_login() {
            self.handle_login(link, token.as_deref(), frame.body()).await
        } else {
            match token {
                Some(token) => {
                    self.handle_authenticated(session_id, &token, command, message_id, frame.body())
                }
                None => Err(GatewayError::NotAuthenticated),
            }
        };

        Some(match result {
            Ok(Some(reply)) => reply,
            Ok(None) => Frame::status(message_id, StatusCode::Success),
            Err(e) => self.error_response(message_id, e, command_name(command)),
        })
    }

    async fn handle_login(
        &self,
        link: &SessionLink,
        current: Option<&str>,
        body: &[u8],
    ) -> GatewayResult<Option<Frame>> {
        let session_id = link.session_id();
        let token = SimpleUtils::extract_token(body);
        if token.is_empty() {
            self.connections.record_failed_login();
            return Err(GatewayError::InvalidToken);
        }

        if let Some(current) = current {
            return if current == token {
                Ok(None)
            } else {
                Err(GatewayError::AlreadyAuthenticated)
            };
        }

        match self.registry.authenticate(&token, link.clone()).await {
            Ok(record) => {
                if !self.connections.mark_authenticated(session_id, &token) {
                    // 인증 도중 세션이 닫힘
                    self.registry
                        .remove(&token, session_id, shared::DisconnectReason::SocketClosed);
                    return Err(GatewayError::NotAuthenticated);
                }
                info!("세션 {} 로그인: {}", session_id, record.device_id);
                Ok(None)
            }
            Err(e) => {
                if matches!(e, GatewayError::InvalidToken) {
                    self.connections.record_failed_login();
                }
                Err(e)
            }
        }
    }

    fn handle_authenticated(
        &self,
        session_id: u64,
        token: &str,
        command: CommandType,
        message_id: u16,
        body: &[u8],
    ) -> GatewayResult<Option<Frame>> {
        match command {
            CommandType::Ping => {
                if !self.registry.is_owned_by(token, session_id) {
                    return Err(GatewayError::NotAuthenticated);
                }
                Ok(None)
            }
            CommandType::Internal => {
                if !self.registry.is_owned_by(token, session_id) {
                    return Err(GatewayError::NotAuthenticated);
                }
                let info = parse_device_info(body);
                debug!("세션 {} 디바이스 정보: {:?}", session_id, info);
                self.registry.update_device_info(token, info)?;
                Ok(None)
            }
            CommandType::Hardware => self.handle_hardware(session_id, token, message_id, body),
            // 로그인/응답은 호출 전에 분기됨
            CommandType::Login | CommandType::HardwareLogin | CommandType::Response => {
                Err(GatewayError::UnknownCommand(command.as_u8()))
            }
        }
    }

    fn handle_hardware(
        &self,
        session_id: u64,
        token: &str,
        message_id: u16,
        body: &[u8],
    ) -> GatewayResult<Option<Frame>> {
        let (command, strategy) = parse_hardware_command(body)?;
        debug!("세션 {} 하드웨어 명령 ({:?}): {:?}", session_id, strategy, command);

        match command {
            HardwareCommand::VirtualWrite { pin, value } => {
                self.registry
                    .write_pin(token, Some(session_id), PinKind::Virtual, pin, &value)?;
                Ok(None)
            }
            HardwareCommand::DigitalWrite { pin, value } => {
                self.registry.write_pin(
                    token,
                    Some(session_id),
                    PinKind::Digital,
                    pin,
                    &value.to_string(),
                )?;
                Ok(None)
            }
            HardwareCommand::VirtualRead { pin } => {
                if !self.registry.is_owned_by(token, session_id) {
                    return Err(GatewayError::NotAuthenticated);
                }
                let state = self
                    .registry
                    .read_virtual_pin(token, pin)?
                    .ok_or(GatewayError::NoData(pin))?;
                Ok(Some(Frame::with_body(
                    CommandType::Hardware.as_u8(),
                    message_id,
                    encode_virtual_write(pin, &state.value),
                )))
            }
        }
    }

    fn error_response(&self, message_id: u16, err: GatewayError, operation: &str) -> Frame {
        ErrorHandler::handle_error(&err, "CommandHandler", operation);
        Frame::status(message_id, err.status_code())
    }
}

fn command_name(command: CommandType) -> &'static str {
    match command {
        CommandType::Response => "response",
        CommandType::Login | CommandType::HardwareLogin => "login",
        CommandType::Ping => "ping",
        CommandType::Internal => "device_info",
        CommandType::Hardware => "hardware",
    }
}
