//! 통합 IoT 센터
//!
//! 디바이스 게이트웨이(`gatewayserver`)와 대시보드 실시간 서버(`realtimeserver`)를
//! 이벤트 브리지로 연결해 하나의 프로세스로 실행합니다.

pub mod unified_server;

#[cfg(test)]
mod tests;

pub use unified_server::{build_device_store, IotCenter, IotCenterAddrs, IotCenterConfig};
