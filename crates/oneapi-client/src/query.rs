//! Typed query-string builders for the log endpoints
//!
//! Parameters are emitted only when they carry a constraint: empty strings,
//! an unset log type, unset timestamps and channel `0` are left out, and the
//! admin-only `username`/`channel` pair is dropped for self-scope queries no
//! matter what the filter holds.

use oneapi_core::{LogFilter, Scope, SortColumn, SortOrder};

/// Query for one page of logs (`/api/log/` or `/api/log/self`)
#[derive(Debug, Clone, PartialEq)]
pub struct LogQuery {
    scope: Scope,
    filter: LogFilter,
    page: usize,
    page_size: usize,
    sort: Option<(SortColumn, SortOrder)>,
}

impl LogQuery {
    pub fn new(scope: Scope, filter: LogFilter, page: usize, page_size: usize) -> Self {
        Self {
            scope,
            filter,
            page,
            page_size,
            sort: None,
        }
    }

    /// Request server-side ordering; `None` keeps the default (newest first)
    pub fn with_sort(mut self, sort: Option<(SortColumn, SortOrder)>) -> Self {
        self.sort = sort;
        self
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn filter(&self) -> &LogFilter {
        &self.filter
    }

    pub fn sort(&self) -> Option<(SortColumn, SortOrder)> {
        self.sort
    }

    /// Endpoint path for this query's scope
    pub fn path(&self) -> &'static str {
        self.scope.logs_path()
    }

    /// Ordered `(name, value)` pairs for the query string
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("p", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        push_filter(&mut pairs, self.scope, &self.filter);
        if let Some((column, order)) = self.sort {
            pairs.push(("sort_by", column.as_str().to_string()));
            pairs.push(("sort_order", order.as_str().to_string()));
        }
        pairs
    }
}

/// Query for aggregate statistics (`/api/log/stat` or `/api/log/self/stat`)
#[derive(Debug, Clone, PartialEq)]
pub struct StatQuery {
    scope: Scope,
    filter: LogFilter,
}

impl StatQuery {
    pub fn new(scope: Scope, filter: LogFilter) -> Self {
        Self { scope, filter }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn filter(&self) -> &LogFilter {
        &self.filter
    }

    pub fn path(&self) -> &'static str {
        self.scope.stat_path()
    }

    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_filter(&mut pairs, self.scope, &self.filter);
        pairs
    }
}

fn push_filter(pairs: &mut Vec<(&'static str, String)>, scope: Scope, filter: &LogFilter) {
    if let Some(log_type) = filter.log_type {
        pairs.push(("type", log_type.code().to_string()));
    }
    if scope.is_admin() {
        push_text(pairs, "username", &filter.username);
    }
    push_text(pairs, "token_name", &filter.token_name);
    push_text(pairs, "model_name", &filter.model_name);
    if let Some(start) = filter.start_timestamp {
        pairs.push(("start_timestamp", start.to_string()));
    }
    if let Some(end) = filter.end_timestamp {
        pairs.push(("end_timestamp", end.to_string()));
    }
    if scope.is_admin() {
        if let Some(channel) = filter.channel.filter(|c| *c != 0) {
            pairs.push(("channel", channel.to_string()));
        }
    }
}

fn push_text(pairs: &mut Vec<(&'static str, String)>, name: &'static str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        pairs.push((name, value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oneapi_core::LogType;
    use pretty_assertions::assert_eq;

    fn full_filter() -> LogFilter {
        LogFilter {
            log_type: Some(LogType::Consumption),
            username: "alice".into(),
            token_name: "ci".into(),
            model_name: "gpt-4o".into(),
            start_timestamp: Some(100),
            end_timestamp: Some(200),
            channel: Some(3),
        }
    }

    fn names(pairs: &[(&'static str, String)]) -> Vec<&'static str> {
        pairs.iter().map(|(n, _)| *n).collect()
    }

    #[test]
    fn test_admin_query_carries_every_field() {
        let query = LogQuery::new(Scope::Admin, full_filter(), 2, 20);
        assert_eq!(
            query.pairs(),
            vec![
                ("p", "2".to_string()),
                ("page_size", "20".to_string()),
                ("type", "2".to_string()),
                ("username", "alice".to_string()),
                ("token_name", "ci".to_string()),
                ("model_name", "gpt-4o".to_string()),
                ("start_timestamp", "100".to_string()),
                ("end_timestamp", "200".to_string()),
                ("channel", "3".to_string()),
            ]
        );
        assert_eq!(query.path(), "/api/log/");
    }

    #[test]
    fn test_self_query_strips_username_and_channel() {
        let query = LogQuery::new(Scope::SelfOnly, full_filter(), 0, 10);
        let names = names(&query.pairs());
        assert!(!names.contains(&"username"));
        assert!(!names.contains(&"channel"));
        assert!(names.contains(&"token_name"));
        assert_eq!(query.path(), "/api/log/self");
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let query = LogQuery::new(Scope::Admin, LogFilter::default(), 0, 10);
        assert_eq!(names(&query.pairs()), vec!["p", "page_size"]);
    }

    #[test]
    fn test_channel_zero_is_omitted() {
        let filter = LogFilter {
            channel: Some(0),
            username: "   ".into(),
            ..Default::default()
        };
        let query = LogQuery::new(Scope::Admin, filter, 0, 10);
        assert_eq!(names(&query.pairs()), vec!["p", "page_size"]);
    }

    #[test]
    fn test_sort_params_only_when_set() {
        let unsorted = LogQuery::new(Scope::Admin, LogFilter::default(), 0, 10);
        assert!(!names(&unsorted.pairs()).contains(&"sort_by"));

        let sorted = unsorted.with_sort(Some((SortColumn::Quota, SortOrder::Asc)));
        let pairs = sorted.pairs();
        assert_eq!(pairs[pairs.len() - 2], ("sort_by", "quota".to_string()));
        assert_eq!(pairs[pairs.len() - 1], ("sort_order", "asc".to_string()));
    }

    #[test]
    fn test_stat_query_has_no_paging() {
        let query = StatQuery::new(Scope::SelfOnly, full_filter());
        let names = names(&query.pairs());
        assert!(!names.contains(&"p"));
        assert!(!names.contains(&"page_size"));
        assert!(!names.contains(&"username"));
        assert_eq!(query.path(), "/api/log/self/stat");
    }
}
