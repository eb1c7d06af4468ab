//! Display helpers shared by every log and token view

use chrono::{Local, LocalResult, TimeZone};
use oneapi_core::DEFAULT_QUOTA_PER_UNIT;

/// Abbreviate large counts: `12345` → `12.3k`, `2500000` → `2.5M`
pub fn render_number(n: i64) -> String {
    let value = n as f64;
    if value >= 1e9 {
        format!("{:.1}B", value / 1e9)
    } else if value >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if value >= 1e4 {
        format!("{:.1}k", value / 1e3)
    } else {
        n.to_string()
    }
}

/// Local `YYYY-MM-DD HH:MM:SS` for a unix timestamp in seconds
pub fn timestamp_to_string(timestamp: i64) -> String {
    match Local.timestamp_opt(timestamp, 0) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => {
            t.format("%Y-%m-%d %H:%M:%S").to_string()
        }
        LocalResult::None => timestamp.to_string(),
    }
}

/// Request latency in milliseconds; zero means "not measured"
pub fn render_latency(elapsed_ms: i64) -> String {
    if elapsed_ms == 0 {
        String::new()
    } else {
        format!("{} ms", elapsed_ms)
    }
}

/// How quota amounts are shown, as published by the site status
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaFormat {
    quota_per_unit: f64,
    display_in_currency: bool,
}

impl Default for QuotaFormat {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTA_PER_UNIT, false)
    }
}

impl QuotaFormat {
    pub fn new(quota_per_unit: f64, display_in_currency: bool) -> Self {
        let quota_per_unit = if quota_per_unit > 0.0 {
            quota_per_unit
        } else {
            DEFAULT_QUOTA_PER_UNIT
        };
        Self {
            quota_per_unit,
            display_in_currency,
        }
    }

    pub fn display_in_currency(&self) -> bool {
        self.display_in_currency
    }

    /// Quota converted to currency units, with `digits` decimals
    pub fn calculate_quota(&self, quota: i64, digits: usize) -> String {
        format!("{:.*}", digits, quota as f64 / self.quota_per_unit)
    }

    pub fn render_quota(&self, quota: i64, digits: usize) -> String {
        if self.display_in_currency {
            format!("${}", self.calculate_quota(quota, digits))
        } else {
            render_number(quota)
        }
    }

    /// `(equivalent: $x)` hint for raw quota inputs; empty unless showing currency
    pub fn render_quota_with_prompt(&self, quota: i64, digits: usize) -> String {
        if self.display_in_currency {
            format!("(equivalent: ${})", self.calculate_quota(quota, digits))
        } else {
            String::new()
        }
    }
}
