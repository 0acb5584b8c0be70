//! 명령 타입 및 상태 코드

/// 프레임 명령 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandType {
    /// 바디 없는 응답. 길이 필드가 상태 코드입니다.
    Response = 0,
    Login = 2,
    Ping = 6,
    /// 디바이스 정보 (null 구분 key/value)
    Internal = 17,
    Hardware = 20,
    HardwareLogin = 29,
}

impl CommandType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CommandType::Response),
            2 => Some(CommandType::Login),
            6 => Some(CommandType::Ping),
            17 => Some(CommandType::Internal),
            20 => Some(CommandType::Hardware),
            29 => Some(CommandType::HardwareLogin),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_login(self) -> bool {
        matches!(self, CommandType::Login | CommandType::HardwareLogin)
    }
}

/// 응답 상태 코드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum StatusCode {
    Success = 200,
    IllegalCommand = 2,
    NotAuthenticated = 5,
    NotAllowed = 6,
    InvalidToken = 9,
    IllegalCommandBody = 11,
    NoData = 17,
    ServerError = 500,
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            200 => Some(StatusCode::Success),
            2 => Some(StatusCode::IllegalCommand),
            5 => Some(StatusCode::NotAuthenticated),
            6 => Some(StatusCode::NotAllowed),
            9 => Some(StatusCode::InvalidToken),
            11 => Some(StatusCode::IllegalCommandBody),
            17 => Some(StatusCode::NoData),
            500 => Some(StatusCode::ServerError),
            _ => None,
        }
    }
}
