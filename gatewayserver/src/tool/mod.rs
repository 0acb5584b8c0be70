//! 게이트웨이 공통 유틸리티 모듈

pub mod error;
pub mod simple_utils;

pub use simple_utils::SimpleUtils;
