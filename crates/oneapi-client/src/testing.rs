//! Test utilities for oneapi-client
//!
//! Provides an in-process mock of the One API backend and a server harness
//! that serves it on a random local port.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use oneapi_core::{
    DailyModelStat, Envelope, LogEntry, LogType, StatSnapshot, SystemStatus, Token, TokenStatus,
    UserDetail, UserSummary,
};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tokio::net::TcpListener;

use crate::{OneApiClient, Result};

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: OneApiClient,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve an axum Router on a random local port
    ///
    /// # Example
    ///
    /// ```ignore
    /// use oneapi_client::testing::{MockOneApi, TestServer};
    ///
    /// let mock = MockOneApi::new();
    /// let server = TestServer::start(mock.router()).await?;
    /// let logs = server.client.get_logs(&query).await?;
    /// ```
    pub async fn start(router: Router) -> Result<Self> {
        Self::start_with_timeout(router, Duration::from_secs(5), Duration::from_secs(2)).await
    }

    /// Create a new test server with custom timeouts
    pub async fn start_with_timeout(
        router: Router,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let base_url = format!("http://{}", addr);
        let client = OneApiClient::with_config(&base_url, timeout, connect_timeout)?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get a reference to the client
    pub fn client(&self) -> &OneApiClient {
        &self.client
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

// =============================================================================
// Mock backend
// =============================================================================

/// Request seen by the mock, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, String>,
}

impl RecordedRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.query.contains_key(name)
    }
}

/// Failure to inject into the next request
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// Non-2xx HTTP status
    Status(u16),
    /// HTTP 200 with `success: false`
    Message(String),
}

/// Page size the backend uses when the request does not specify one
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Default)]
struct MockState {
    logs: RwLock<Vec<LogEntry>>,
    users: RwLock<Vec<UserDetail>>,
    current_user: RwLock<Option<UserDetail>>,
    tokens: RwLock<Vec<Token>>,
    models: RwLock<Vec<String>>,
    channel_models: RwLock<HashMap<String, Vec<String>>>,
    dashboard: RwLock<Vec<DailyModelStat>>,
    about: RwLock<String>,
    status: RwLock<Option<SystemStatus>>,
    requests: Mutex<Vec<RecordedRequest>>,
    failures: Mutex<VecDeque<MockFailure>>,
}

/// In-memory One API backend implementing the endpoints the console uses.
///
/// Log listing honours the same filters, ordering and `p`/`page_size`
/// paging as the real server; every request is recorded for assertions.
#[derive(Clone, Default)]
pub struct MockOneApi {
    state: Arc<MockState>,
}

impl MockOneApi {
    /// Empty backend whose current user is an admin named `root`
    pub fn new() -> Self {
        let mock = Self::default();
        mock.set_current_user(UserDetail {
            id: 1,
            username: "root".to_string(),
            display_name: "Root User".to_string(),
            role: 100,
            status: 1,
            email: String::new(),
            group: "default".to_string(),
            quota: 500_000,
            used_quota: 0,
            request_count: 0,
        });
        mock
    }

    pub fn with_logs(self, logs: Vec<LogEntry>) -> Self {
        self.set_logs(logs);
        self
    }

    pub fn with_users(self, users: Vec<UserDetail>) -> Self {
        *self.state.users.write() = users;
        self
    }

    pub fn with_tokens(self, tokens: Vec<Token>) -> Self {
        *self.state.tokens.write() = tokens;
        self
    }

    pub fn with_models(self, models: Vec<String>) -> Self {
        *self.state.models.write() = models;
        self
    }

    pub fn with_channel_models(self, models: HashMap<String, Vec<String>>) -> Self {
        *self.state.channel_models.write() = models;
        self
    }

    pub fn with_dashboard(self, rows: Vec<DailyModelStat>) -> Self {
        *self.state.dashboard.write() = rows;
        self
    }

    pub fn with_about(self, about: impl Into<String>) -> Self {
        *self.state.about.write() = about.into();
        self
    }

    pub fn with_status(self, status: SystemStatus) -> Self {
        *self.state.status.write() = Some(status);
        self
    }

    /// Replace the stored log rows (kept newest-first by id like the server)
    pub fn set_logs(&self, logs: Vec<LogEntry>) {
        *self.state.logs.write() = logs;
    }

    pub fn set_current_user(&self, user: UserDetail) {
        *self.state.current_user.write() = Some(user);
    }

    /// Make the next request fail with the given HTTP status
    pub fn fail_next_with_status(&self, status: u16) {
        self.state
            .failures
            .lock()
            .push_back(MockFailure::Status(status));
    }

    /// Make the next request answer `success: false` with `message`
    pub fn fail_next_with_message(&self, message: impl Into<String>) {
        self.state
            .failures
            .lock()
            .push_back(MockFailure::Message(message.into()));
    }

    /// All requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    /// Requests received for one exact path
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    pub fn clear_requests(&self) {
        self.state.requests.lock().clear();
    }

    pub fn tokens(&self) -> Vec<Token> {
        self.state.tokens.read().clone()
    }

    /// Build the axum router serving this mock
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/log/", get(list_all_logs))
            .route("/api/log/self", get(list_self_logs))
            .route("/api/log/stat", get(all_stat))
            .route("/api/log/self/stat", get(self_stat))
            .route("/api/user/search", get(search_users))
            .route("/api/user/self", get(current_user))
            .route("/api/user/available_models", get(available_models))
            .route("/api/user/dashboard", get(dashboard))
            .route("/api/user/{id}", get(get_user))
            .route(
                "/api/token/",
                get(list_tokens).post(create_token).put(update_token),
            )
            .route("/api/token/search", get(search_tokens))
            .route("/api/token/{id}", get(get_token).delete(delete_token))
            .route("/api/models", get(channel_models))
            .route("/api/about", get(about))
            .route("/api/status", get(status))
            .layer(middleware::from_fn_with_state(self.clone(), record_request))
            .with_state(self.clone())
    }

    /// Start a [`TestServer`] for this mock
    pub async fn serve(&self) -> Result<TestServer> {
        TestServer::start(self.router()).await
    }

    fn current_user_id(&self) -> i64 {
        self.state
            .current_user
            .read()
            .as_ref()
            .map(|u| u.id)
            .unwrap_or_default()
    }

    fn filtered_logs(&self, params: &HashMap<String, String>, user_id: Option<i64>) -> Vec<LogEntry> {
        let log_type = int_param(params, "type").filter(|t| *t != 0);
        let start = int_param(params, "start_timestamp").filter(|t| *t != 0);
        let end = int_param(params, "end_timestamp").filter(|t| *t != 0);
        let channel = int_param(params, "channel").filter(|c| *c != 0);
        let username = text_param(params, "username");
        let token_name = text_param(params, "token_name");
        let model_name = text_param(params, "model_name");

        self.state
            .logs
            .read()
            .iter()
            .filter(|l| user_id.map_or(true, |id| l.user_id == id))
            .filter(|l| log_type.map_or(true, |t| l.log_type.code() == t))
            .filter(|l| start.map_or(true, |s| l.created_at >= s))
            .filter(|l| end.map_or(true, |e| l.created_at <= e))
            .filter(|l| channel.map_or(true, |c| l.channel_id == c))
            .filter(|l| username.map_or(true, |u| l.username == u))
            .filter(|l| token_name.map_or(true, |t| l.token_name == t))
            .filter(|l| model_name.map_or(true, |m| l.model_name == m))
            .cloned()
            .collect()
    }

    fn page_of_logs(&self, params: &HashMap<String, String>, user_id: Option<i64>) -> Vec<LogEntry> {
        let mut logs = self.filtered_logs(params, user_id);
        sort_logs(
            &mut logs,
            text_param(params, "sort_by").unwrap_or_default(),
            text_param(params, "sort_order").unwrap_or_default(),
        );

        let page = int_param(params, "p").unwrap_or(0).max(0) as usize;
        let page_size = int_param(params, "page_size")
            .filter(|s| *s > 0)
            .map(|s| s as usize)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        logs.into_iter()
            .skip(page * page_size)
            .take(page_size)
            .collect()
    }

    fn stat_of_logs(&self, params: &HashMap<String, String>, user_id: Option<i64>) -> StatSnapshot {
        // Totals only ever count consumption rows, whatever `type` says
        let mut params = params.clone();
        params.insert("type".into(), LogType::Consumption.code().to_string());
        let rows = self.filtered_logs(&params, user_id);
        StatSnapshot {
            quota: rows.iter().map(|l| l.quota).sum(),
            token: rows.iter().map(|l| l.total_tokens()).sum(),
        }
    }
}

fn int_param(params: &HashMap<String, String>, name: &str) -> Option<i64> {
    params.get(name).and_then(|v| v.trim().parse().ok())
}

fn text_param<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params.get(name).map(String::as_str).filter(|v| !v.is_empty())
}

/// Same column whitelist as the server; unknown columns mean id desc
fn sort_logs(logs: &mut [LogEntry], sort_by: &str, sort_order: &str) {
    let key: fn(&LogEntry) -> i64 = match sort_by {
        "created_time" => |l| l.created_at,
        "prompt_tokens" => |l| l.prompt_tokens,
        "completion_tokens" => |l| l.completion_tokens,
        "quota" => |l| l.quota,
        "elapsed_time" => |l| l.elapsed_time,
        _ => {
            logs.sort_by(|a, b| b.id.cmp(&a.id));
            return;
        }
    };
    if sort_order == "asc" {
        logs.sort_by_key(key);
    } else {
        logs.sort_by_key(|l| std::cmp::Reverse(key(l)));
    }
}

async fn record_request(State(mock): State<MockOneApi>, request: Request, next: Next) -> Response {
    let query = request
        .uri()
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();
    mock.state.requests.lock().push(RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query,
    });

    let failure = mock.state.failures.lock().pop_front();
    match failure {
        Some(MockFailure::Status(code)) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                Json(Envelope::<()>::failure(format!("injected status {}", code))),
            )
                .into_response()
        }
        Some(MockFailure::Message(message)) => Json(Envelope::<()>::failure(message)).into_response(),
        None => next.run(request).await,
    }
}

fn ok<T: serde::Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope::ok(data))
}

fn not_found(message: &str) -> Json<Envelope<()>> {
    Json(Envelope::failure(message))
}

async fn list_all_logs(
    State(mock): State<MockOneApi>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    ok(mock.page_of_logs(&params, None))
}

async fn list_self_logs(
    State(mock): State<MockOneApi>,
    Query(mut params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    params.remove("username");
    params.remove("channel");
    let user_id = mock.current_user_id();
    ok(mock.page_of_logs(&params, Some(user_id)))
}

async fn all_stat(
    State(mock): State<MockOneApi>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    ok(mock.stat_of_logs(&params, None))
}

async fn self_stat(
    State(mock): State<MockOneApi>,
    Query(mut params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    params.remove("username");
    params.remove("channel");
    let user_id = mock.current_user_id();
    ok(mock.stat_of_logs(&params, Some(user_id)))
}

async fn search_users(
    State(mock): State<MockOneApi>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let keyword = params.get("keyword").cloned().unwrap_or_default();
    let users: Vec<UserSummary> = mock
        .state
        .users
        .read()
        .iter()
        .filter(|u| {
            u.username.contains(&keyword)
                || u.display_name.contains(&keyword)
                || u.id.to_string() == keyword
        })
        .map(|u| UserSummary {
            id: u.id,
            username: u.username.clone(),
            display_name: u.display_name.clone(),
        })
        .collect();
    ok(users)
}

async fn current_user(State(mock): State<MockOneApi>) -> Response {
    match mock.state.current_user.read().clone() {
        Some(user) => ok(user).into_response(),
        None => (StatusCode::UNAUTHORIZED, not_found("not logged in")).into_response(),
    }
}

async fn get_user(State(mock): State<MockOneApi>, Path(id): Path<i64>) -> Response {
    let user = mock.state.users.read().iter().find(|u| u.id == id).cloned();
    match user {
        Some(user) => ok(user).into_response(),
        None => not_found("user not found").into_response(),
    }
}

async fn available_models(State(mock): State<MockOneApi>) -> impl IntoResponse {
    ok(mock.state.models.read().clone())
}

async fn dashboard(State(mock): State<MockOneApi>) -> impl IntoResponse {
    ok(mock.state.dashboard.read().clone())
}

async fn channel_models(State(mock): State<MockOneApi>) -> impl IntoResponse {
    ok(mock.state.channel_models.read().clone())
}

async fn about(State(mock): State<MockOneApi>) -> impl IntoResponse {
    ok(mock.state.about.read().clone())
}

async fn status(State(mock): State<MockOneApi>) -> Response {
    match mock.state.status.read().clone() {
        Some(status) => ok(status).into_response(),
        None => not_found("status unavailable").into_response(),
    }
}

async fn list_tokens(
    State(mock): State<MockOneApi>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let page = int_param(&params, "p").unwrap_or(0).max(0) as usize;
    let mut tokens = mock.state.tokens.read().clone();
    match text_param(&params, "order") {
        Some("remain_quota") => tokens.sort_by(|a, b| {
            (b.unlimited_quota, b.remain_quota).cmp(&(a.unlimited_quota, a.remain_quota))
        }),
        Some("used_quota") => tokens.sort_by(|a, b| b.used_quota.cmp(&a.used_quota)),
        _ => tokens.sort_by(|a, b| b.id.cmp(&a.id)),
    }
    let page: Vec<Token> = tokens
        .into_iter()
        .skip(page * DEFAULT_PAGE_SIZE)
        .take(DEFAULT_PAGE_SIZE)
        .collect();
    ok(page)
}

async fn search_tokens(
    State(mock): State<MockOneApi>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let keyword = params.get("keyword").cloned().unwrap_or_default();
    let tokens: Vec<Token> = mock
        .state
        .tokens
        .read()
        .iter()
        .filter(|t| t.name.starts_with(&keyword))
        .cloned()
        .collect();
    ok(tokens)
}

async fn get_token(State(mock): State<MockOneApi>, Path(id): Path<i64>) -> Response {
    let token = mock.state.tokens.read().iter().find(|t| t.id == id).cloned();
    match token {
        Some(token) => ok(token).into_response(),
        None => not_found("token not found").into_response(),
    }
}

/// Body accepted by token create/update
#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(default)]
    id: Option<i64>,
    name: String,
    #[serde(default)]
    remain_quota: i64,
    #[serde(default = "never_expires")]
    expired_time: i64,
    #[serde(default)]
    unlimited_quota: bool,
    #[serde(default)]
    subnet: String,
    #[serde(default)]
    models: String,
}

fn never_expires() -> i64 {
    oneapi_core::NEVER_EXPIRES
}

async fn create_token(State(mock): State<MockOneApi>, Json(body): Json<TokenBody>) -> Response {
    if body.name.is_empty() {
        return Json(Envelope::<()>::failure("token name must not be empty")).into_response();
    }
    let user_id = mock.current_user_id();
    let mut tokens = mock.state.tokens.write();
    let id = tokens.iter().map(|t| t.id).max().unwrap_or(0) + 1;
    tokens.push(Token {
        id,
        user_id,
        key: format!("mock{:044}", id),
        status: TokenStatus::Enabled,
        name: body.name,
        created_time: 0,
        accessed_time: 0,
        expired_time: body.expired_time,
        remain_quota: body.remain_quota,
        unlimited_quota: body.unlimited_quota,
        used_quota: 0,
        models: Some(body.models),
        subnet: Some(body.subnet),
    });
    Json(Envelope::<()>::ok(())).into_response()
}

async fn update_token(State(mock): State<MockOneApi>, Json(body): Json<TokenBody>) -> Response {
    let mut tokens = mock.state.tokens.write();
    let Some(token) = body
        .id
        .and_then(|id| tokens.iter_mut().find(|t| t.id == id))
    else {
        return not_found("token not found").into_response();
    };
    token.name = body.name;
    token.remain_quota = body.remain_quota;
    token.expired_time = body.expired_time;
    token.unlimited_quota = body.unlimited_quota;
    token.models = Some(body.models);
    token.subnet = Some(body.subnet);
    ok(token.clone()).into_response()
}

async fn delete_token(State(mock): State<MockOneApi>, Path(id): Path<i64>) -> Response {
    let mut tokens = mock.state.tokens.write();
    let before = tokens.len();
    tokens.retain(|t| t.id != id);
    if tokens.len() == before {
        not_found("token not found").into_response()
    } else {
        Json(Envelope::<()>::ok(())).into_response()
    }
}

/// Build a log row with the fields the console filters on
pub fn sample_log(id: i64, created_at: i64, log_type: LogType) -> LogEntry {
    LogEntry {
        id,
        user_id: 1,
        created_at,
        log_type,
        content: format!("log {}", id),
        username: "root".to_string(),
        token_name: "default".to_string(),
        model_name: "gpt-4o".to_string(),
        quota: id * 10,
        prompt_tokens: id,
        completion_tokens: 1,
        channel_id: 1,
        request_id: None,
        elapsed_time: 100 + id,
        is_stream: false,
        system_prompt_reset: false,
    }
}

/// `count` consumption rows with ids `1..=count`, one second apart
pub fn sample_logs(count: i64) -> Vec<LogEntry> {
    (1..=count)
        .map(|id| sample_log(id, 1_700_000_000 + id, LogType::Consumption))
        .collect()
}

/// Wait for a condition with timeout
pub async fn wait_for<F, Fut>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_logs_default_is_id_desc() {
        let mut logs = sample_logs(3);
        sort_logs(&mut logs, "", "");
        let ids: Vec<i64> = logs.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_sort_logs_by_quota_asc() {
        let mut logs = sample_logs(3);
        logs.reverse();
        sort_logs(&mut logs, "quota", "asc");
        let quotas: Vec<i64> = logs.iter().map(|l| l.quota).collect();
        assert_eq!(quotas, vec![10, 20, 30]);
    }

    #[test]
    fn test_page_of_logs_respects_page_size() {
        let mock = MockOneApi::new().with_logs(sample_logs(25));
        let mut params = HashMap::new();
        params.insert("p".to_string(), "1".to_string());
        params.insert("page_size".to_string(), "20".to_string());
        let page = mock.page_of_logs(&params, None);
        assert_eq!(page.len(), 5);
        assert_eq!(page[0].id, 5);
    }
}
