//! Log browsing and aggregate statistics

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use oneapi_browser::{FilterField, FilterState, LogBrowser, PageLoad, Settings};
use oneapi_client::OneApiClient;
use oneapi_core::{LogType, Scope, SortColumn, SortOrder};

use crate::output::{CliNotifier, LogRow, OutputContext, OutputFormat};

/// Filters shared by `logs` and `stat`
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Log type: recharge, consumption, management, system, test or a code
    #[arg(long = "type")]
    pub log_type: Option<LogType>,

    /// Username (admin only)
    #[arg(long)]
    pub username: Option<String>,

    /// Token name
    #[arg(long)]
    pub token_name: Option<String>,

    /// Model name
    #[arg(long)]
    pub model: Option<String>,

    /// Channel ID, 0 for any (admin only)
    #[arg(long)]
    pub channel: Option<String>,

    /// Start time: unix seconds or "YYYY-MM-DD HH:MM[:SS]" [default: 7 days ago]
    #[arg(long)]
    pub start: Option<String>,

    /// End time: unix seconds or "YYYY-MM-DD HH:MM[:SS]" [default: 1 hour from now]
    #[arg(long)]
    pub end: Option<String>,
}

impl FilterArgs {
    /// Text fields given on the command line
    fn fields(&self) -> Vec<(FilterField, &str)> {
        [
            (FilterField::Username, &self.username),
            (FilterField::TokenName, &self.token_name),
            (FilterField::ModelName, &self.model),
            (FilterField::Channel, &self.channel),
            (FilterField::StartTime, &self.start),
            (FilterField::EndTime, &self.end),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_deref().map(|v| (field, v)))
        .collect()
    }

    fn filter_state(&self) -> Result<FilterState> {
        let mut state = FilterState::with_defaults(Utc::now());
        for (field, value) in self.fields() {
            state
                .set_field(field, value)
                .with_context(|| format!("Invalid {} filter", field))?;
        }
        state.set_log_type(self.log_type);
        Ok(state)
    }
}

/// Arguments of the `logs` command
#[derive(Args, Debug, Clone)]
pub struct LogsArgs {
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Sort column: created_time, prompt_tokens, completion_tokens, quota, elapsed_time
    #[arg(long)]
    pub sort_by: Option<SortColumn>,

    /// Sort direction, used with --sort-by
    #[arg(long, default_value = "desc")]
    pub order: SortOrder,

    /// Page to show (1-based)
    #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
    pub page: u64,

    /// Rows per page for this run [default: stored page size]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub page_size: Option<u64>,
}

fn build_browser(
    client: &OneApiClient,
    scope: Scope,
    settings: Settings,
    filters: &FilterArgs,
    ctx: &OutputContext,
) -> Result<LogBrowser> {
    if !scope.is_admin() && (filters.username.is_some() || filters.channel.is_some()) {
        ctx.warn("--username and --channel are ignored outside the admin scope");
    }
    let state = filters.filter_state()?;
    Ok(
        LogBrowser::new(Arc::new(client.clone()), scope, settings)
            .with_filter(state.filter().clone())
            .with_notifier(Arc::new(CliNotifier::new(ctx.quiet))),
    )
}

/// Open the log browser and walk forward to the requested page
pub async fn logs(
    client: &OneApiClient,
    scope: Scope,
    settings: &Settings,
    args: &LogsArgs,
    ctx: &OutputContext,
) -> Result<()> {
    let quota = settings.quota_format();

    // A one-off page size stays out of the stored settings
    let browser_settings = match args.page_size {
        Some(size) => {
            let one_off = Settings::in_memory();
            one_off.set_page_size(size as usize)?;
            one_off
        }
        None => settings.clone(),
    };

    let mut browser = build_browser(client, scope, browser_settings, &args.filters, ctx)?;
    if let Some(column) = args.sort_by {
        browser = browser.with_sort(column, args.order);
    }

    let target = (args.page - 1) as usize;
    let mut load = browser.open().await;
    for page in 1..=target {
        if load == PageLoad::Failed || page >= browser.page_count() {
            break;
        }
        load = browser.go_to_page(page).await;
    }

    if load == PageLoad::Failed {
        bail!("Failed to load page {}", browser.active_page() + 1);
    }
    if browser.active_page() < target {
        ctx.warn(&format!(
            "Page {} is past the last page; showing page {}",
            args.page,
            browser.active_page() + 1
        ));
    }

    let rows: Vec<LogRow> = browser
        .current_rows()
        .iter()
        .map(|entry| LogRow::new(entry, &quota))
        .collect();
    ctx.print(&rows);

    if ctx.format == OutputFormat::Table {
        let mut pager = format!(
            "Page {} of {} ({} rows cached, {} per page)",
            browser.active_page() + 1,
            browser.page_count(),
            browser.cached_extent(),
            browser.page_size()
        );
        if let Some((column, order)) = browser.sort().active() {
            pager.push_str(&format!(", sorted by {} {}", column, order.arrow()));
        }
        ctx.info(&pager);
    }

    Ok(())
}

/// Reveal the aggregate quota and token count for the filters
pub async fn stat(
    client: &OneApiClient,
    scope: Scope,
    settings: &Settings,
    filters: &FilterArgs,
    ctx: &OutputContext,
) -> Result<()> {
    let quota = settings.quota_format();
    let browser = build_browser(client, scope, settings.clone(), filters, ctx)?;

    let Some(snapshot) = browser.reveal_stats().await.snapshot() else {
        bail!("Failed to load statistics");
    };

    let mut pairs = vec![
        ("Quota", quota.render_quota(snapshot.quota, 6)),
        ("Tokens", snapshot.token.to_string()),
    ];
    if quota.display_in_currency() {
        pairs.push(("Raw Quota", snapshot.quota.to_string()));
    }
    ctx.print_kv(&pairs);
    Ok(())
}
