pub mod current_time;
pub mod hex_utils;

pub use current_time::CurrentTime;
pub use hex_utils::HexUtils;
