//! Error types for the headless console

use oneapi_client::OneApiError;
use thiserror::Error;

/// Rejected filter input. The field keeps its previous value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Invalid channel: {0} (expected an integer)")]
    InvalidChannel(String),

    #[error("Invalid time: {0} (expected unix seconds or YYYY-MM-DD HH:MM[:SS])")]
    InvalidTimestamp(String),
}

/// Errors from the persisted settings store
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings file must hold a JSON object")]
    NotAnObject,
}

/// Errors from fetching site information into settings
#[derive(Debug, Error)]
pub enum SiteError {
    #[error(transparent)]
    Api(#[from] OneApiError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}
