//! 하드웨어 명령 파서
//!
//! 펌웨어마다 명령 바디 인코딩이 제각각이므로 아래 순서로 전략을 시도하고
//! 처음 성공한 결과를 사용합니다.
//!
//! 1. null 구분: `vw\0<pin>\0<value>` (표준)
//! 2. 공백/쉼표 구분: `vw 5 100`, `vw,5,100`
//! 3. 붙여쓰기: `vw5100`, `vr5` (핀 경계가 모호하면 손실 가능)

use bytes::Bytes;
use shared::DeviceInfo;

use crate::tool::error::GatewayError;

/// 해석된 하드웨어 명령
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareCommand {
    VirtualWrite { pin: u16, value: String },
    VirtualRead { pin: u16 },
    DigitalWrite { pin: u16, value: i64 },
}

/// 어떤 전략으로 해석되었는지 (로그용)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    NullSeparated,
    Delimited,
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    VirtualWrite,
    VirtualRead,
    DigitalWrite,
}

impl Verb {
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "vw" => Some(Verb::VirtualWrite),
            "vr" => Some(Verb::VirtualRead),
            "dw" => Some(Verb::DigitalWrite),
            _ => None,
        }
    }
}

/// 하드웨어 명령 바디를 해석합니다.
pub fn parse_hardware_command(
    body: &[u8],
) -> Result<(HardwareCommand, ParseStrategy), GatewayError> {
    let text = String::from_utf8_lossy(body);

    if let Some(command) = parse_null_separated(&text) {
        return Ok((command, ParseStrategy::NullSeparated));
    }
    if let Some(command) = parse_delimited(&text) {
        return Ok((command, ParseStrategy::Delimited));
    }
    if let Some(command) = parse_compact(&text) {
        return Ok((command, ParseStrategy::Compact));
    }

    Err(GatewayError::UnparseableCommand(text.replace('\0', "\\0")))
}

/// `vw\0<pin>\0<value>` 바디를 만듭니다.
pub fn encode_virtual_write(pin: u16, value: &str) -> Bytes {
    Bytes::from(format!("vw\0{}\0{}", pin, value))
}

fn parse_null_separated(text: &str) -> Option<HardwareCommand> {
    if !text.contains('\0') {
        return None;
    }

    let mut parts = text.splitn(3, '\0');
    let verb = Verb::parse(parts.next()?)?;
    let pin = parse_pin(parts.next()?)?;
    // 값은 두 번째 구분자 뒤 전부. 끝의 구분자 하나는 펌웨어가 붙이는 종단으로 봅니다.
    let value = parts.next().map(|v| v.strip_suffix('\0').unwrap_or(v));

    build_command(verb, pin, value)
}

fn parse_delimited(text: &str) -> Option<HardwareCommand> {
    let is_separator = |c: char| c.is_whitespace() || c == ',';

    let text = text.trim_matches(|c: char| is_separator(c) || c == '\0');
    let (verb, rest) = split_head(text, is_separator)?;
    let verb = Verb::parse(verb)?;

    let (pin, value) = match split_head(rest, is_separator) {
        Some((pin, value)) => (pin, Some(value)),
        None => (rest, None),
    };
    let pin = parse_pin(pin)?;

    build_command(verb, pin, value)
}

fn parse_compact(text: &str) -> Option<HardwareCommand> {
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    if text.len() < 3 || !text.is_char_boundary(2) {
        return None;
    }

    let verb = Verb::parse(&text[..2])?;
    let rest = &text[2..];
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }

    let pin = rest[..digits].parse::<u16>().ok()?;
    let value = &rest[digits..];
    let value = if value.is_empty() { None } else { Some(value) };

    build_command(verb, pin, value)
}

fn build_command(verb: Verb, pin: u16, value: Option<&str>) -> Option<HardwareCommand> {
    match verb {
        Verb::VirtualRead => match value {
            None | Some("") => Some(HardwareCommand::VirtualRead { pin }),
            Some(_) => None,
        },
        Verb::VirtualWrite => {
            let value = value?;
            if value.is_empty() {
                return None;
            }
            Some(HardwareCommand::VirtualWrite {
                pin,
                value: value.to_string(),
            })
        }
        Verb::DigitalWrite => {
            let value = value?.trim().parse::<i64>().ok()?;
            Some(HardwareCommand::DigitalWrite { pin, value })
        }
    }
}

/// 핀 토큰 해석. `5`, `V5`, `d13` 형식을 허용합니다.
fn parse_pin(token: &str) -> Option<u16> {
    let token = token.trim();
    let digits = match token.chars().next()? {
        c if c.is_ascii_alphabetic() => &token[1..],
        _ => token,
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u16>().ok()
}

fn split_head(text: &str, is_separator: impl Fn(char) -> bool) -> Option<(&str, &str)> {
    let idx = text.find(&is_separator)?;
    let head = &text[..idx];
    let rest = text[idx..].trim_start_matches(&is_separator);
    if head.is_empty() || rest.is_empty() {
        return None;
    }
    Some((head, rest))
}

/// 디바이스 정보 (INTERNAL) 바디를 해석합니다.
///
/// null 구분 key/value 쌍의 나열이며, 알려진 키는 필드로 매핑하고
/// 모르는 키(또는 숫자 변환에 실패한 값)는 `extra`에 그대로 보존합니다.
pub fn parse_device_info(body: &[u8]) -> DeviceInfo {
    let text = String::from_utf8_lossy(body);
    let mut tokens: Vec<&str> = text.split('\0').collect();
    while tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }

    let mut info = DeviceInfo::default();
    for pair in tokens.chunks(2) {
        let key = pair[0];
        let value = pair.get(1).copied().unwrap_or("");
        if key.is_empty() {
            continue;
        }

        match key {
            "fw" => info.firmware_version = Some(value.to_string()),
            "build" => info.build_id = Some(value.to_string()),
            "dev" => info.device_model = Some(value.to_string()),
            "tmpl" => info.template_id = Some(value.to_string()),
            "h-beat" => match value.parse::<u32>() {
                Ok(secs) => info.heartbeat_interval = Some(secs),
                Err(_) => {
                    info.extra.insert(key.to_string(), value.to_string());
                }
            },
            "buff-in" => match value.parse::<u32>() {
                Ok(size) => info.buffer_size = Some(size),
                Err(_) => {
                    info.extra.insert(key.to_string(), value.to_string());
                }
            },
            _ => {
                info.extra.insert(key.to_string(), value.to_string());
            }
        }
    }

    info
}
