//! Usage log models
//!
//! Log rows are recorded server-side for every relayed request (consumption),
//! top-up, administrative action, system event and channel test. The client
//! only ever reads them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A single usage log row as returned by `/api/log/` and `/api/log/self`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Server-assigned identifier (omitted by the self endpoint's default ordering)
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub user_id: i64,
    /// Unix seconds
    pub created_at: i64,
    #[serde(rename = "type")]
    pub log_type: LogType,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub token_name: String,
    #[serde(default)]
    pub model_name: String,
    /// Quota in the smallest quota unit
    #[serde(default)]
    pub quota: i64,
    #[serde(default)]
    pub prompt_tokens: i64,
    #[serde(default)]
    pub completion_tokens: i64,
    /// Channel id that served the request (0 when not applicable)
    #[serde(default, rename = "channel")]
    pub channel_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub request_id: Option<String>,
    /// Milliseconds
    #[serde(default)]
    pub elapsed_time: i64,
    #[serde(default)]
    pub is_stream: bool,
    #[serde(default)]
    pub system_prompt_reset: bool,
}

impl LogEntry {
    /// Total tokens billed for this row
    pub fn total_tokens(&self) -> i64 {
        self.prompt_tokens + self.completion_tokens
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Closed set of log categories.
///
/// The wire value `0` means "all types" in queries and never appears on a
/// stored row, so it is not a variant; filters use `Option<LogType>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum LogType {
    Recharge,
    Consumption,
    Management,
    System,
    Test,
}

/// Wire code and display label for every log type
const LOG_TYPE_TABLE: [(LogType, i64, &str); 5] = [
    (LogType::Recharge, 1, "Recharge"),
    (LogType::Consumption, 2, "Consumed"),
    (LogType::Management, 3, "Management"),
    (LogType::System, 4, "System"),
    (LogType::Test, 5, "Test"),
];

impl LogType {
    /// All variants in wire order
    pub const ALL: [LogType; 5] = [
        LogType::Recharge,
        LogType::Consumption,
        LogType::Management,
        LogType::System,
        LogType::Test,
    ];

    /// Wire code sent as the `type` query parameter
    pub fn code(self) -> i64 {
        LOG_TYPE_TABLE[self.index()].1
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        LOG_TYPE_TABLE[self.index()].2
    }

    fn index(self) -> usize {
        match self {
            LogType::Recharge => 0,
            LogType::Consumption => 1,
            LogType::Management => 2,
            LogType::System => 3,
            LogType::Test => 4,
        }
    }

    /// Parse a filter value where `0` means "all types"
    pub fn from_filter_code(code: i64) -> Result<Option<Self>, CoreError> {
        if code == 0 {
            Ok(None)
        } else {
            Self::try_from(code).map(Some)
        }
    }
}

impl TryFrom<i64> for LogType {
    type Error = CoreError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        LOG_TYPE_TABLE
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(t, _, _)| *t)
            .ok_or(CoreError::UnknownLogType(code))
    }
}

impl From<LogType> for i64 {
    fn from(t: LogType) -> Self {
        t.code()
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LogType {
    type Err = CoreError;

    /// Accepts the wire code or a case-insensitive name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.trim().parse::<i64>() {
            return Self::try_from(code);
        }
        match s.trim().to_ascii_lowercase().as_str() {
            "recharge" | "topup" => Ok(LogType::Recharge),
            "consumption" | "consume" | "consumed" | "usage" => Ok(LogType::Consumption),
            "management" | "manage" | "admin" => Ok(LogType::Management),
            "system" => Ok(LogType::System),
            "test" => Ok(LogType::Test),
            _ => Err(CoreError::UnknownLogType(-1)),
        }
    }
}

/// Filter values shared by page and aggregate log queries.
///
/// Empty strings and `None` mean "no constraint". `username` and `channel`
/// only apply to admin-scope requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    pub log_type: Option<LogType>,
    pub username: String,
    pub token_name: String,
    pub model_name: String,
    /// Unix seconds, inclusive
    pub start_timestamp: Option<i64>,
    /// Unix seconds, inclusive
    pub end_timestamp: Option<i64>,
    pub channel: Option<i64>,
}

/// Columns the server accepts in `sort_by`; anything else falls back to
/// default ordering (newest first), so the client never sends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    CreatedTime,
    PromptTokens,
    CompletionTokens,
    Quota,
    ElapsedTime,
}

impl SortColumn {
    pub const ALL: [SortColumn; 5] = [
        SortColumn::CreatedTime,
        SortColumn::PromptTokens,
        SortColumn::CompletionTokens,
        SortColumn::Quota,
        SortColumn::ElapsedTime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortColumn::CreatedTime => "created_time",
            SortColumn::PromptTokens => "prompt_tokens",
            SortColumn::CompletionTokens => "completion_tokens",
            SortColumn::Quota => "quota",
            SortColumn::ElapsedTime => "elapsed_time",
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortColumn {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::UnknownSortColumn(s.to_string()))
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    /// Arrow shown next to the active column header
    pub fn arrow(self) -> &'static str {
        match self {
            SortOrder::Asc => "↑",
            SortOrder::Desc => "↓",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(CoreError::InvalidSortOrder(s.to_string())),
        }
    }
}
