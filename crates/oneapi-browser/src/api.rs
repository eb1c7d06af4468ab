//! The seam between the log browser and the REST client

use async_trait::async_trait;
use oneapi_client::{LogQuery, OneApiClient, Result, StatQuery};
use oneapi_core::{LogEntry, StatSnapshot, UserSummary};

/// Requests the log browser needs from the backend
#[async_trait]
pub trait LogApi: Send + Sync {
    /// One page of logs for the query's scope, filters and sort
    async fn fetch_logs(&self, query: &LogQuery) -> Result<Vec<LogEntry>>;

    /// Aggregate quota/token totals for the query's filters
    async fn fetch_stat(&self, query: &StatQuery) -> Result<StatSnapshot>;

    /// User typeahead
    async fn search_users(&self, keyword: &str) -> Result<Vec<UserSummary>>;
}

#[async_trait]
impl LogApi for OneApiClient {
    async fn fetch_logs(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
        self.get_logs(query).await
    }

    async fn fetch_stat(&self, query: &StatQuery) -> Result<StatSnapshot> {
        self.get_log_stat(query).await
    }

    async fn search_users(&self, keyword: &str) -> Result<Vec<UserSummary>> {
        OneApiClient::search_users(self, keyword).await
    }
}
