//! Output formatting for oneapi-cli (table, json, csv)

use clap::ValueEnum;
use colored::Colorize;
use oneapi_browser::{
    render_latency, render_number, timestamp_to_string, Level, Notification, Notifier, QuotaFormat,
    UserOption,
};
use oneapi_core::{DailyModelStat, LogEntry, Token, UserDetail};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print data in the configured format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                if data.is_empty() {
                    if !self.quiet {
                        println!("No data");
                    }
                } else {
                    println!("{}", Table::new(data));
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
            OutputFormat::Csv => print!("{}", to_csv(data)),
        }
    }

    /// Print a single item in the configured format
    pub fn print_one<T: Tabled + Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Table => println!("{}", Table::new([data])),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
                );
            }
            OutputFormat::Csv => print!("{}", to_csv(&[data])),
        }
    }

    /// Print key-value pairs in the order given
    pub fn print_kv(&self, pairs: &[(&str, String)]) {
        match self.format {
            OutputFormat::Table => {
                for (key, value) in pairs {
                    println!("{}: {}", key.bold(), value);
                }
            }
            OutputFormat::Json => {
                let map: serde_json::Map<String, serde_json::Value> = pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&map).unwrap_or_else(|_| "{}".to_string())
                );
            }
            OutputFormat::Csv => {
                let keys: Vec<String> = pairs.iter().map(|(k, _)| escape_csv(k)).collect();
                let values: Vec<String> = pairs.iter().map(|(_, v)| escape_csv(v)).collect();
                println!("{}", keys.join(","));
                println!("{}", values.join(","));
            }
        }
    }
}

/// Render rows as CSV, header first; empty input renders nothing
fn to_csv<T: Serialize>(data: &[T]) -> String {
    let mut out = String::new();
    let Some(first) = data.first() else {
        return out;
    };

    let headers: Vec<String> = match serde_json::to_value(first) {
        Ok(serde_json::Value::Object(map)) => map.keys().cloned().collect(),
        _ => return out,
    };
    out.push_str(&headers.join(","));
    out.push('\n');

    for item in data {
        if let Ok(serde_json::Value::Object(row)) = serde_json::to_value(item) {
            let values: Vec<String> = headers
                .iter()
                .map(|h| {
                    row.get(h)
                        .map(|v| match v {
                            serde_json::Value::String(s) => escape_csv(s),
                            other => escape_csv(&other.to_string()),
                        })
                        .unwrap_or_default()
                })
                .collect();
            out.push_str(&values.join(","));
            out.push('\n');
        }
    }
    out
}

/// Escape a value for CSV output
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// =============================================================================
// Notifications
// =============================================================================

/// Prints browser notifications to stderr, colored by level
pub struct CliNotifier {
    quiet: bool,
}

impl CliNotifier {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Notifier for CliNotifier {
    fn notify(&self, notification: Notification) {
        let message = notification.message.as_str();
        match notification.level {
            Level::Error => eprintln!("{}", message.red()),
            Level::Warning if !self.quiet => eprintln!("{}", message.yellow()),
            Level::Info if !self.quiet => eprintln!("{}", message),
            Level::Success if !self.quiet => eprintln!("{}", message.green()),
            _ => {}
        }
    }
}

// =============================================================================
// Display types for various commands
// =============================================================================

/// One usage log row
#[derive(Debug, Tabled, Serialize)]
pub struct LogRow {
    #[tabled(rename = "Time")]
    pub time: String,
    #[tabled(rename = "Type")]
    #[serde(rename = "type")]
    pub log_type: String,
    #[tabled(rename = "Channel")]
    pub channel: String,
    #[tabled(rename = "User")]
    pub username: String,
    #[tabled(rename = "Token")]
    pub token_name: String,
    #[tabled(rename = "Model")]
    pub model_name: String,
    #[tabled(rename = "Prompt")]
    pub prompt_tokens: i64,
    #[tabled(rename = "Completion")]
    pub completion_tokens: i64,
    #[tabled(rename = "Quota")]
    pub quota: String,
    #[tabled(rename = "Latency")]
    pub latency: String,
    #[tabled(rename = "Stream")]
    pub stream: String,
    #[tabled(rename = "Detail")]
    pub content: String,
}

impl LogRow {
    pub fn new(entry: &LogEntry, quota: &QuotaFormat) -> Self {
        Self {
            time: timestamp_to_string(entry.created_at),
            log_type: entry.log_type.label().to_string(),
            channel: if entry.channel_id == 0 {
                String::new()
            } else {
                entry.channel_id.to_string()
            },
            username: entry.username.clone(),
            token_name: entry.token_name.clone(),
            model_name: entry.model_name.clone(),
            prompt_tokens: entry.prompt_tokens,
            completion_tokens: entry.completion_tokens,
            quota: if entry.quota == 0 {
                String::new()
            } else {
                quota.render_quota(entry.quota, 6)
            },
            latency: render_latency(entry.elapsed_time),
            stream: if entry.is_stream { "yes" } else { "" }.to_string(),
            content: entry.content.clone(),
        }
    }
}

/// Typeahead match from the user search
#[derive(Debug, Tabled, Serialize)]
pub struct UserRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Username")]
    pub username: String,
    #[tabled(rename = "Label")]
    pub label: String,
}

impl From<&UserOption> for UserRow {
    fn from(option: &UserOption) -> Self {
        Self {
            id: option.id.map(|id| id.to_string()).unwrap_or_default(),
            username: option.value.clone(),
            label: option.label.clone(),
        }
    }
}

/// Account details shown by `users show` and `whoami`
pub fn user_pairs(user: &UserDetail, quota: &QuotaFormat) -> Vec<(&'static str, String)> {
    vec![
        ("ID", user.id.to_string()),
        ("Username", user.username.clone()),
        ("Display Name", user.display_name.clone()),
        ("Role", user.role.to_string()),
        ("Scope", user.scope().to_string()),
        ("Status", user.status.to_string()),
        ("Email", user.email.clone()),
        ("Group", user.group.clone()),
        ("Quota", quota.render_quota(user.quota, 2)),
        ("Used Quota", quota.render_quota(user.used_quota, 2)),
        ("Requests", user.request_count.to_string()),
    ]
}

/// API token listing
#[derive(Debug, Tabled, Serialize)]
pub struct TokenRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Used")]
    pub used_quota: String,
    #[tabled(rename = "Remaining")]
    pub remain_quota: String,
    #[tabled(rename = "Created")]
    pub created: String,
    #[tabled(rename = "Expires")]
    pub expires: String,
}

impl TokenRow {
    pub fn new(token: &Token, quota: &QuotaFormat) -> Self {
        Self {
            id: token.id,
            name: token.name.clone(),
            status: token.status.label().to_string(),
            used_quota: quota.render_quota(token.used_quota, 2),
            remain_quota: if token.unlimited_quota {
                "Unlimited".to_string()
            } else {
                quota.render_quota(token.remain_quota, 2)
            },
            created: timestamp_to_string(token.created_time),
            expires: if token.never_expires() {
                "Never".to_string()
            } else {
                timestamp_to_string(token.expired_time)
            },
        }
    }
}

/// One model's usage on one day
#[derive(Debug, Tabled, Serialize)]
pub struct DashboardRow {
    #[tabled(rename = "Day")]
    pub day: String,
    #[tabled(rename = "Model")]
    pub model_name: String,
    #[tabled(rename = "Requests")]
    pub request_count: i64,
    #[tabled(rename = "Quota")]
    pub quota: String,
    #[tabled(rename = "Prompt")]
    pub prompt_tokens: String,
    #[tabled(rename = "Completion")]
    pub completion_tokens: String,
}

impl DashboardRow {
    pub fn new(stat: &DailyModelStat, quota: &QuotaFormat) -> Self {
        Self {
            day: stat.day.clone(),
            model_name: stat.model_name.clone(),
            request_count: stat.request_count,
            quota: quota.render_quota(stat.quota, 2),
            prompt_tokens: render_number(stat.prompt_tokens),
            completion_tokens: render_number(stat.completion_tokens),
        }
    }
}

/// Models offered by one channel type
#[derive(Debug, Tabled, Serialize)]
pub struct ChannelModelsRow {
    #[tabled(rename = "Channel Type")]
    pub channel_type: String,
    #[tabled(rename = "Models")]
    pub models: String,
}

/// Single model name
#[derive(Debug, Tabled, Serialize)]
pub struct ModelRow {
    #[tabled(rename = "Model")]
    pub model: String,
}
