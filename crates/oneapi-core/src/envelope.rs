//! The `{success, message, data}` wrapper used by every One API response

use serde::{Deserialize, Serialize};

/// Response envelope returned by every backend endpoint
///
/// `data` is absent on most failures and on mutating calls that only
/// acknowledge (`POST`/`PUT`/`DELETE` may return `success` alone).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Build a successful envelope carrying `data`
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: String::new(),
            data: Some(data),
        }
    }

    /// Build a failed envelope with a human-readable message
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// Split the envelope into the payload or the server's message.
    ///
    /// A successful envelope without a payload yields `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_with_data() {
        let env: Envelope<Vec<i32>> =
            serde_json::from_str(r#"{"success":true,"message":"","data":[1,2]}"#).unwrap();
        assert_eq!(env.into_result(), Ok(Some(vec![1, 2])));
    }

    #[test]
    fn test_failure_keeps_message() {
        let env: Envelope<Vec<i32>> =
            serde_json::from_str(r#"{"success":false,"message":"no permission"}"#).unwrap();
        assert_eq!(env.into_result(), Err("no permission".to_string()));
    }

    #[test]
    fn test_success_without_data() {
        let env: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"success":true,"message":""}"#).unwrap();
        assert_eq!(env.into_result(), Ok(None));
    }
}
