use chrono::Utc;

/// 현재 시각 유틸리티
pub struct CurrentTime;

impl CurrentTime {
    /// Unix 밀리초
    pub fn now_millis() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Unix 초
    pub fn now_secs() -> i64 {
        Utc::now().timestamp()
    }
}
