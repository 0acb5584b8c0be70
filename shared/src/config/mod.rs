//! 환경 설정 공통 유틸리티

pub mod env_loader;

pub use env_loader::{env_opt, env_parse, load_env_file};
