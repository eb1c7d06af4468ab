//! API token models

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use validator::Validate;

use crate::error::CoreError;

/// `expired_time` value meaning the token never expires
pub const NEVER_EXPIRES: i64 = -1;

/// Token as returned by `/api/token/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: i64,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub key: String,
    pub status: TokenStatus,
    pub name: String,
    #[serde(default)]
    pub created_time: i64,
    #[serde(default)]
    pub accessed_time: i64,
    /// Unix seconds, or [`NEVER_EXPIRES`]
    #[serde(default = "never")]
    pub expired_time: i64,
    #[serde(default)]
    pub remain_quota: i64,
    #[serde(default)]
    pub unlimited_quota: bool,
    #[serde(default)]
    pub used_quota: i64,
    /// Comma-separated model allow-list; empty or null means all models
    #[serde(default)]
    pub models: Option<String>,
    #[serde(default)]
    pub subnet: Option<String>,
}

fn never() -> i64 {
    NEVER_EXPIRES
}

impl Token {
    /// Allowed models as a list
    pub fn model_list(&self) -> Vec<String> {
        split_models(self.models.as_deref().unwrap_or_default())
    }

    pub fn never_expires(&self) -> bool {
        self.expired_time == NEVER_EXPIRES
    }
}

/// Token lifecycle state. `0` is deliberately unused by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum TokenStatus {
    Enabled,
    Disabled,
    Expired,
    Exhausted,
}

impl TokenStatus {
    pub fn code(self) -> i64 {
        match self {
            TokenStatus::Enabled => 1,
            TokenStatus::Disabled => 2,
            TokenStatus::Expired => 3,
            TokenStatus::Exhausted => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TokenStatus::Enabled => "Enabled",
            TokenStatus::Disabled => "Disabled",
            TokenStatus::Expired => "Expired",
            TokenStatus::Exhausted => "Exhausted",
        }
    }
}

impl TryFrom<i64> for TokenStatus {
    type Error = CoreError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(TokenStatus::Enabled),
            2 => Ok(TokenStatus::Disabled),
            3 => Ok(TokenStatus::Expired),
            4 => Ok(TokenStatus::Exhausted),
            other => Err(CoreError::UnknownTokenStatus(other)),
        }
    }
}

impl From<TokenStatus> for i64 {
    fn from(status: TokenStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Body of a token create (`POST`) or update (`PUT`) request
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct TokenForm {
    /// Set only for updates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(range(min = 0, message = "remain_quota must be greater than or equal to 0"))]
    pub remain_quota: i64,
    pub expired_time: i64,
    pub unlimited_quota: bool,
    pub subnet: String,
    #[serde(serialize_with = "join_models")]
    pub models: Vec<String>,
}

impl Default for TokenForm {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            remain_quota: 0,
            expired_time: NEVER_EXPIRES,
            unlimited_quota: false,
            subnet: String::new(),
            models: Vec::new(),
        }
    }
}

impl TokenForm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Pre-fill an edit form from an existing token
    pub fn from_token(token: &Token) -> Self {
        Self {
            id: Some(token.id),
            name: token.name.clone(),
            remain_quota: token.remain_quota,
            expired_time: token.expired_time,
            unlimited_quota: token.unlimited_quota,
            subnet: token.subnet.clone().unwrap_or_default(),
            models: token.model_list(),
        }
    }
}

fn join_models<S: Serializer>(models: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&models.join(","))
}

/// Split a comma-separated model list, dropping empty entries
pub fn split_models(models: &str) -> Vec<String> {
    models
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}
