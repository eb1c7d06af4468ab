//! Site information cached in settings
//!
//! Each call makes one request and, on success, writes the result through
//! to the settings store.

use std::collections::HashMap;

use oneapi_client::OneApiClient;
use oneapi_core::SystemStatus;
use tracing::{debug, instrument};

use crate::error::SiteError;
use crate::settings::Settings;

/// Fetch `/api/status` and store its display values
#[instrument(skip_all)]
pub async fn load_status(
    client: &OneApiClient,
    settings: &Settings,
) -> Result<SystemStatus, SiteError> {
    let status = client.status().await?;
    settings.apply_status(&status)?;
    debug!(quota_per_unit = status.quota_per_unit, "Stored site status");
    Ok(status)
}

/// Fetch the per-channel model lists and store them
#[instrument(skip_all)]
pub async fn load_channel_models(
    client: &OneApiClient,
    settings: &Settings,
) -> Result<HashMap<String, Vec<String>>, SiteError> {
    let models = client.channel_models().await?;
    settings.set_channel_models(&models)?;
    Ok(models)
}

/// Fetch the about page and store it as-is
#[instrument(skip_all)]
pub async fn load_about(client: &OneApiClient, settings: &Settings) -> Result<String, SiteError> {
    let about = client.about().await?;
    settings.set_about(&about)?;
    Ok(about)
}

/// Whether the about content should be embedded rather than rendered
pub fn about_is_url(about: &str) -> bool {
    about.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use oneapi_client::testing::MockOneApi;

    #[tokio::test]
    async fn test_load_status_updates_settings() {
        let mock = MockOneApi::new().with_status(SystemStatus {
            system_name: "Relay".into(),
            version: "v1".into(),
            quota_per_unit: 1000.0,
            display_in_currency: true,
        });
        let server = mock.serve().await.unwrap();
        let settings = Settings::in_memory();

        load_status(&server.client, &settings).await.unwrap();

        assert_eq!(settings.quota_format().render_quota(2000, 2), "$2.00");
        assert_eq!(settings.system_name().as_deref(), Some("Relay"));
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_settings_alone() {
        let mock = MockOneApi::new().with_about("hello");
        let server = mock.serve().await.unwrap();
        let settings = Settings::in_memory();
        mock.fail_next_with_status(500);

        assert!(load_about(&server.client, &settings).await.is_err());
        assert_eq!(settings.about(), None);

        load_about(&server.client, &settings).await.unwrap();
        assert_eq!(settings.about().as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_channel_models_round_trip_through_settings() {
        let mut models = HashMap::new();
        models.insert("1".to_string(), vec!["gpt-4o".to_string()]);
        let mock = MockOneApi::new().with_channel_models(models.clone());
        let server = mock.serve().await.unwrap();
        let settings = Settings::in_memory();

        load_channel_models(&server.client, &settings).await.unwrap();
        assert_eq!(settings.channel_models(), models);
    }

    #[test]
    fn test_about_is_url() {
        assert!(about_is_url("https://example.com/about"));
        assert!(!about_is_url("# About us"));
    }
}
