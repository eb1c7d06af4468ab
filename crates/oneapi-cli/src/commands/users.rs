//! User lookup commands

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use oneapi_browser::{LogBrowser, SearchOutcome, Settings};
use oneapi_client::OneApiClient;
use oneapi_core::Scope;

use crate::output::{user_pairs, CliNotifier, OutputContext, UserRow};

/// Run the username typeahead once and list its options
pub async fn users_search(
    client: &OneApiClient,
    scope: Scope,
    keyword: &str,
    ctx: &OutputContext,
) -> Result<()> {
    let browser = LogBrowser::new(Arc::new(client.clone()), scope, Settings::in_memory())
        .with_notifier(Arc::new(CliNotifier::new(ctx.quiet)));

    match browser.search_users(keyword).await {
        SearchOutcome::Unavailable => bail!("User search requires an admin account"),
        SearchOutcome::Failed => bail!("User search failed"),
        SearchOutcome::Cleared => {
            ctx.info("Nothing to search for");
            Ok(())
        }
        SearchOutcome::Loaded(_) | SearchOutcome::Stale => {
            let rows: Vec<UserRow> = browser.user_options().iter().map(UserRow::from).collect();
            ctx.print(&rows);
            Ok(())
        }
    }
}

pub async fn users_show(
    client: &OneApiClient,
    id: i64,
    settings: &Settings,
    ctx: &OutputContext,
) -> Result<()> {
    let user = client
        .get_user(id)
        .await
        .with_context(|| format!("Failed to load user {}", id))?;
    ctx.print_kv(&user_pairs(&user, &settings.quota_format()));
    Ok(())
}

pub async fn whoami(client: &OneApiClient, settings: &Settings, ctx: &OutputContext) -> Result<()> {
    let user = client
        .get_self()
        .await
        .context("Failed to load the current user")?;
    ctx.print_kv(&user_pairs(&user, &settings.quota_format()));
    Ok(())
}
