//! Public system status (`/api/status`)

use serde::{Deserialize, Serialize};

/// Default number of quota units per currency unit
pub const DEFAULT_QUOTA_PER_UNIT: f64 = 500_000.0;

/// Site-wide display settings published by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    #[serde(default)]
    pub system_name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default = "default_quota_per_unit")]
    pub quota_per_unit: f64,
    #[serde(default)]
    pub display_in_currency: bool,
}

fn default_quota_per_unit() -> f64 {
    DEFAULT_QUOTA_PER_UNIT
}
