//! Aggregate usage statistics

use serde::{Deserialize, Serialize};

/// Quota and token totals over a filter set (`/api/log/stat`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSnapshot {
    #[serde(default)]
    pub quota: i64,
    #[serde(default)]
    pub token: i64,
}

/// One dashboard row: usage of a model on a given day.
///
/// The backend serialises these without field tags, hence PascalCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DailyModelStat {
    /// `YYYY-MM-DD`
    pub day: String,
    pub model_name: String,
    #[serde(default)]
    pub request_count: i64,
    #[serde(default)]
    pub quota: i64,
    #[serde(default)]
    pub prompt_tokens: i64,
    #[serde(default)]
    pub completion_tokens: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_without_token_total() {
        let stat: StatSnapshot = serde_json::from_str(r#"{"quota": 900}"#).unwrap();
        assert_eq!(stat, StatSnapshot { quota: 900, token: 0 });
    }

    #[test]
    fn test_dashboard_row_field_names() {
        let row: DailyModelStat = serde_json::from_str(
            r#"{"Day":"2024-05-01","ModelName":"gpt-4o","RequestCount":3,"Quota":10,"PromptTokens":5,"CompletionTokens":2}"#,
        )
        .unwrap();
        assert_eq!(row.model_name, "gpt-4o");
        assert_eq!(row.request_count, 3);
    }
}
