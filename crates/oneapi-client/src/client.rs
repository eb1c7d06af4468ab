//! One API HTTP client implementation

use std::collections::HashMap;
use std::time::Duration;

use oneapi_core::{
    DailyModelStat, Envelope, LogEntry, StatSnapshot, SystemStatus, Token, TokenForm, UserDetail,
    UserSummary,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;
use validator::Validate;

use crate::error::{OneApiError, Result};
use crate::query::{LogQuery, StatQuery};

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One API REST client
///
/// Every method performs exactly one request; failures are returned, never
/// retried.
#[derive(Debug, Clone)]
pub struct OneApiClient {
    client: Client,
    base_url: Url,
}

impl OneApiClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the One API server (e.g., "http://localhost:3000")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new client with custom timeouts
    pub fn with_config(
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        let base_url = Url::parse(base_url)?;

        Ok(Self { client, base_url })
    }

    /// Create a client that authenticates every request with a user access token.
    ///
    /// The token is set as a default `Authorization: Bearer <token>` header.
    pub fn with_access_token(base_url: &str, token: &str) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        let header_value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| OneApiError::ValidationError(format!("Invalid access token: {}", e)))?;
        headers.insert(reqwest::header::AUTHORIZATION, header_value);

        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .default_headers(headers)
            .build()?;

        let base_url = Url::parse(base_url)?;

        Ok(Self { client, base_url })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // =========================================================================
    // Logs
    // =========================================================================

    /// Fetch one page of logs.
    ///
    /// The endpoint (`/api/log/` or `/api/log/self`) follows the query's scope.
    #[instrument(skip(self, query), fields(scope = %query.scope(), page = query.page()))]
    pub async fn get_logs(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
        let url = self.base_url.join(query.path())?;
        debug!("Fetching logs from {}", url);

        let response = self.client.get(url).query(&query.pairs()).send().await?;
        self.handle_envelope::<Vec<LogEntry>>(response)
            .await
            .map(Option::unwrap_or_default)
    }

    /// Fetch aggregate quota/token totals for a filter set
    #[instrument(skip(self, query), fields(scope = %query.scope()))]
    pub async fn get_log_stat(&self, query: &StatQuery) -> Result<StatSnapshot> {
        let url = self.base_url.join(query.path())?;

        let response = self.client.get(url).query(&query.pairs()).send().await?;
        self.handle_envelope::<StatSnapshot>(response)
            .await
            .map(Option::unwrap_or_default)
    }

    /// Per-day, per-model usage of the current user
    #[instrument(skip(self))]
    pub async fn get_dashboard(&self) -> Result<Vec<DailyModelStat>> {
        self.get_list("/api/user/dashboard", &[]).await
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Typeahead lookup of users (admin only)
    #[instrument(skip(self))]
    pub async fn search_users(&self, keyword: &str) -> Result<Vec<UserSummary>> {
        self.get_list("/api/user/search", &[("keyword", keyword.to_string())])
            .await
    }

    /// Get a user by id (admin only)
    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: i64) -> Result<UserDetail> {
        self.get_required(&format!("/api/user/{}", user_id), &[])
            .await
    }

    /// Get the user the access token belongs to
    #[instrument(skip(self))]
    pub async fn get_self(&self) -> Result<UserDetail> {
        self.get_required("/api/user/self", &[]).await
    }

    /// Models the current user may call
    #[instrument(skip(self))]
    pub async fn available_models(&self) -> Result<Vec<String>> {
        self.get_list("/api/user/available_models", &[]).await
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    /// List the current user's tokens, one page at a time.
    ///
    /// `order` may be `remain_quota` or `used_quota`; anything else sorts by
    /// id, newest first.
    #[instrument(skip(self))]
    pub async fn list_tokens(&self, page: usize, order: Option<&str>) -> Result<Vec<Token>> {
        let mut params = vec![("p", page.to_string())];
        if let Some(order) = order.filter(|o| !o.is_empty()) {
            params.push(("order", order.to_string()));
        }
        self.get_list("/api/token/", &params).await
    }

    /// Search the current user's tokens by name prefix
    #[instrument(skip(self))]
    pub async fn search_tokens(&self, keyword: &str) -> Result<Vec<Token>> {
        self.get_list("/api/token/search", &[("keyword", keyword.to_string())])
            .await
    }

    /// Get a single token
    #[instrument(skip(self))]
    pub async fn get_token(&self, token_id: i64) -> Result<Token> {
        self.get_required(&format!("/api/token/{}", token_id), &[])
            .await
    }

    /// Create a token. The form is validated before anything is sent.
    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn create_token(&self, form: &TokenForm) -> Result<()> {
        form.validate()?;
        let mut form = form.clone();
        form.id = None;

        let url = self.base_url.join("/api/token/")?;
        let response = self.client.post(url).json(&form).send().await?;
        self.handle_envelope::<serde_json::Value>(response)
            .await
            .map(|_| ())
    }

    /// Update an existing token. The form is validated before anything is sent.
    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn update_token(&self, token_id: i64, form: &TokenForm) -> Result<()> {
        form.validate()?;
        let mut form = form.clone();
        form.id = Some(token_id);

        let url = self.base_url.join("/api/token/")?;
        let response = self.client.put(url).json(&form).send().await?;
        self.handle_envelope::<serde_json::Value>(response)
            .await
            .map(|_| ())
    }

    /// Delete a token
    #[instrument(skip(self))]
    pub async fn delete_token(&self, token_id: i64) -> Result<()> {
        let url = self.base_url.join(&format!("/api/token/{}", token_id))?;
        let response = self.client.delete(url).send().await?;
        self.handle_envelope::<serde_json::Value>(response)
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Site information
    // =========================================================================

    /// Models offered per channel type
    #[instrument(skip(self))]
    pub async fn channel_models(&self) -> Result<HashMap<String, Vec<String>>> {
        let url = self.base_url.join("/api/models")?;
        let response = self.client.get(url).send().await?;
        self.handle_envelope(response)
            .await
            .map(Option::unwrap_or_default)
    }

    /// The operator's "about" page: markdown/HTML, or a URL to embed
    #[instrument(skip(self))]
    pub async fn about(&self) -> Result<String> {
        let url = self.base_url.join("/api/about")?;
        let response = self.client.get(url).send().await?;
        self.handle_envelope(response)
            .await
            .map(Option::unwrap_or_default)
    }

    /// Public site status (quota unit, currency display, name)
    #[instrument(skip(self))]
    pub async fn status(&self) -> Result<SystemStatus> {
        self.get_required("/api/status", &[]).await
    }

    // =========================================================================
    // Helper Methods
    // =========================================================================

    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = self.base_url.join(path)?;
        let response = self.client.get(url).query(params).send().await?;
        self.handle_envelope::<Vec<T>>(response)
            .await
            .map(Option::unwrap_or_default)
    }

    async fn get_required<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = self.base_url.join(path)?;
        let response = self.client.get(url).query(params).send().await?;
        self.handle_envelope(response)
            .await?
            .ok_or_else(|| OneApiError::ParseError(format!("{}: response has no data", path)))
    }

    /// Check the HTTP status, then unwrap the `{success, message, data}` envelope
    async fn handle_envelope<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<Option<T>> {
        let status = response.status();

        if !status.is_success() {
            return Err(self.extract_error_from_status(response, status).await);
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| OneApiError::ParseError(e.to_string()))?;
        envelope.into_result().map_err(OneApiError::ApiError)
    }

    async fn extract_error_from_status(
        &self,
        response: reqwest::Response,
        status: StatusCode,
    ) -> OneApiError {
        // Try to parse error response body
        let message = match response.json::<Envelope<serde_json::Value>>().await {
            Ok(env) if !env.message.is_empty() => env.message,
            _ => format!("HTTP {}", status),
        };

        match status {
            StatusCode::TOO_MANY_REQUESTS => OneApiError::RateLimited,
            StatusCode::METHOD_NOT_ALLOWED => OneApiError::DemoMode,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => OneApiError::Unauthorized(message),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => OneApiError::Timeout,
            _ => OneApiError::server_error(status.as_u16(), message),
        }
    }
}
