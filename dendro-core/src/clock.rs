//! Wall clock helpers
//!
//! Timestamps travel as fractional seconds since the Unix epoch.

use chrono::Utc;

/// Current time in seconds since the Unix epoch
pub fn now_sec() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_sec_is_recent() {
        let now = now_sec();
        // 2023-01-01T00:00:00Z
        assert!(now > 1_672_531_200.0);
    }
}
