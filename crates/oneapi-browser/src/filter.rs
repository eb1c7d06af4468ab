//! Filter state of the log browser
//!
//! Text inputs are coerced here and nowhere else. Editing a field never
//! triggers a fetch on its own.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDateTime, TimeZone, Utc};
use oneapi_core::{LogFilter, LogType};

use crate::error::FilterError;

/// Accepted local date-time layouts
const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Editable text fields of the filter form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Username,
    TokenName,
    ModelName,
    StartTime,
    EndTime,
    Channel,
}

impl FilterField {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterField::Username => "username",
            FilterField::TokenName => "token_name",
            FilterField::ModelName => "model_name",
            FilterField::StartTime => "start_timestamp",
            FilterField::EndTime => "end_timestamp",
            FilterField::Channel => "channel",
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "username" => Ok(FilterField::Username),
            "token_name" => Ok(FilterField::TokenName),
            "model_name" => Ok(FilterField::ModelName),
            "start_timestamp" | "start" => Ok(FilterField::StartTime),
            "end_timestamp" | "end" => Ok(FilterField::EndTime),
            "channel" => Ok(FilterField::Channel),
            other => Err(format!("Unknown filter field: {}", other)),
        }
    }
}

/// Current filter values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    filter: LogFilter,
}

impl FilterState {
    /// Filters shown when the browser opens: the last seven days up to one
    /// hour from `now`, all log types
    pub fn with_defaults(now: DateTime<Utc>) -> Self {
        let filter = LogFilter {
            start_timestamp: Some((now - Duration::days(7)).timestamp()),
            end_timestamp: Some((now + Duration::hours(1)).timestamp()),
            ..Default::default()
        };
        Self { filter }
    }

    pub fn from_filter(filter: LogFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &LogFilter {
        &self.filter
    }

    pub fn log_type(&self) -> Option<LogType> {
        self.filter.log_type
    }

    pub fn set_log_type(&mut self, log_type: Option<LogType>) {
        self.filter.log_type = log_type;
    }

    pub fn set_username(&mut self, username: &str) {
        self.filter.username = username.to_string();
    }

    /// Replace one field from user input.
    ///
    /// Blank input clears the field. On error the previous value is kept.
    pub fn set_field(&mut self, field: FilterField, value: &str) -> Result<(), FilterError> {
        match field {
            FilterField::Username => self.set_username(value),
            FilterField::TokenName => self.filter.token_name = value.to_string(),
            FilterField::ModelName => self.filter.model_name = value.to_string(),
            FilterField::StartTime => self.filter.start_timestamp = parse_timestamp(value)?,
            FilterField::EndTime => self.filter.end_timestamp = parse_timestamp(value)?,
            FilterField::Channel => self.filter.channel = parse_channel(value)?,
        }
        Ok(())
    }
}

fn parse_channel(value: &str) -> Result<Option<i64>, FilterError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<i64>()
        .map(|c| Some(c).filter(|c| *c != 0))
        .map_err(|_| FilterError::InvalidChannel(value.to_string()))
}

/// Unix seconds, or a local date-time in one of [`DATE_TIME_FORMATS`]
pub fn parse_timestamp(value: &str) -> Result<Option<i64>, FilterError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if let Ok(seconds) = value.parse::<i64>() {
        return Ok(Some(seconds));
    }

    let naive = DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| FilterError::InvalidTimestamp(value.to_string()))?;

    match Local.from_local_datetime(&naive) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => Ok(Some(t.timestamp())),
        LocalResult::None => Err(FilterError::InvalidTimestamp(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_defaults() {
        let state = FilterState::with_defaults(now());
        let filter = state.filter();
        assert_eq!(filter.start_timestamp, Some(1_700_000_000 - 7 * 86_400));
        assert_eq!(filter.end_timestamp, Some(1_700_000_000 + 3_600));
        assert_eq!(filter.log_type, None);
        assert_eq!(filter.username, "");
    }

    #[test]
    fn test_set_text_fields() {
        let mut state = FilterState::with_defaults(now());
        state.set_field(FilterField::Username, "alice").unwrap();
        state.set_field(FilterField::ModelName, "gpt-4o").unwrap();
        assert_eq!(state.filter().username, "alice");
        assert_eq!(state.filter().model_name, "gpt-4o");
    }

    #[test]
    fn test_channel_coercion() {
        let mut state = FilterState::with_defaults(now());
        state.set_field(FilterField::Channel, " 7 ").unwrap();
        assert_eq!(state.filter().channel, Some(7));

        state.set_field(FilterField::Channel, "0").unwrap();
        assert_eq!(state.filter().channel, None);
    }

    #[test]
    fn test_bad_channel_keeps_previous_value() {
        let mut state = FilterState::with_defaults(now());
        state.set_field(FilterField::Channel, "3").unwrap();
        let err = state.set_field(FilterField::Channel, "three").unwrap_err();
        assert_eq!(err, FilterError::InvalidChannel("three".into()));
        assert_eq!(state.filter().channel, Some(3));
    }

    #[test]
    fn test_timestamp_forms() {
        assert_eq!(parse_timestamp("1700000000"), Ok(Some(1_700_000_000)));
        assert_eq!(parse_timestamp(""), Ok(None));

        let spaced = parse_timestamp("2024-05-01 12:30").unwrap();
        let with_t = parse_timestamp("2024-05-01T12:30:00").unwrap();
        assert!(spaced.is_some());
        assert_eq!(spaced, with_t);
    }

    #[test]
    fn test_bad_timestamp_keeps_previous_value() {
        let mut state = FilterState::with_defaults(now());
        let before = state.filter().start_timestamp;
        assert!(state.set_field(FilterField::StartTime, "yesterday").is_err());
        assert_eq!(state.filter().start_timestamp, before);
    }

    #[test]
    fn test_field_names() {
        assert_eq!("start".parse::<FilterField>(), Ok(FilterField::StartTime));
        assert!("bogus".parse::<FilterField>().is_err());
    }
}
