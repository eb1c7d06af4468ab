//! API token management

use anyhow::{Context, Result};
use clap::Args;
use oneapi_browser::{filter::parse_timestamp, Settings};
use oneapi_client::OneApiClient;
use oneapi_core::{split_models, TokenForm, NEVER_EXPIRES};

use crate::output::{OutputContext, TokenRow};

/// Editable token fields; unset fields keep their current value
#[derive(Args, Debug, Clone, Default)]
pub struct TokenFields {
    /// Token name
    #[arg(long)]
    pub name: Option<String>,

    /// Remaining quota, in raw quota units
    #[arg(long)]
    pub remain_quota: Option<i64>,

    /// Whether the quota is unlimited
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub unlimited: Option<bool>,

    /// Expiry: "never", unix seconds or "YYYY-MM-DD HH:MM[:SS]"
    #[arg(long)]
    pub expires: Option<String>,

    /// Comma-separated model whitelist, empty for all
    #[arg(long)]
    pub models: Option<String>,

    /// Allowed client subnet, empty for any
    #[arg(long)]
    pub subnet: Option<String>,
}

impl TokenFields {
    fn apply(&self, form: &mut TokenForm) -> Result<()> {
        if let Some(name) = &self.name {
            form.name = name.clone();
        }
        if let Some(remain_quota) = self.remain_quota {
            form.remain_quota = remain_quota;
        }
        if let Some(unlimited) = self.unlimited {
            form.unlimited_quota = unlimited;
        }
        if let Some(expires) = &self.expires {
            form.expired_time = parse_expiry(expires)?;
        }
        if let Some(models) = &self.models {
            form.models = split_models(models);
        }
        if let Some(subnet) = &self.subnet {
            form.subnet = subnet.trim().to_string();
        }
        Ok(())
    }
}

fn parse_expiry(value: &str) -> Result<i64> {
    if value.trim().eq_ignore_ascii_case("never") {
        return Ok(NEVER_EXPIRES);
    }
    let expiry = parse_timestamp(value).context("Invalid expiry")?;
    Ok(expiry.unwrap_or(NEVER_EXPIRES))
}

pub async fn tokens_list(
    client: &OneApiClient,
    page: usize,
    order: Option<&str>,
    settings: &Settings,
    ctx: &OutputContext,
) -> Result<()> {
    let tokens = client
        .list_tokens(page, order)
        .await
        .context("Failed to list tokens")?;
    let quota = settings.quota_format();
    let rows: Vec<TokenRow> = tokens.iter().map(|t| TokenRow::new(t, &quota)).collect();
    ctx.print(&rows);
    Ok(())
}

pub async fn tokens_search(
    client: &OneApiClient,
    keyword: &str,
    settings: &Settings,
    ctx: &OutputContext,
) -> Result<()> {
    let tokens = client
        .search_tokens(keyword)
        .await
        .context("Failed to search tokens")?;
    let quota = settings.quota_format();
    let rows: Vec<TokenRow> = tokens.iter().map(|t| TokenRow::new(t, &quota)).collect();
    ctx.print(&rows);
    Ok(())
}

pub async fn tokens_show(
    client: &OneApiClient,
    id: i64,
    settings: &Settings,
    ctx: &OutputContext,
) -> Result<()> {
    let token = client
        .get_token(id)
        .await
        .with_context(|| format!("Failed to load token {}", id))?;
    let quota = settings.quota_format();
    let row = TokenRow::new(&token, &quota);

    let models = token.model_list();
    ctx.print_kv(&[
        ("ID", row.id.to_string()),
        ("Name", row.name),
        ("Key", token.key.clone()),
        ("Status", row.status),
        ("Used", row.used_quota),
        (
            "Remaining",
            format!(
                "{} {}",
                row.remain_quota,
                quota.render_quota_with_prompt(token.remain_quota, 2)
            )
            .trim_end()
            .to_string(),
        ),
        ("Created", row.created),
        ("Expires", row.expires),
        (
            "Models",
            if models.is_empty() {
                "all".to_string()
            } else {
                models.join(",")
            },
        ),
        ("Subnet", token.subnet.clone().unwrap_or_default()),
    ]);
    Ok(())
}

pub async fn tokens_create(
    client: &OneApiClient,
    fields: &TokenFields,
    ctx: &OutputContext,
) -> Result<()> {
    let mut form = TokenForm::default();
    fields.apply(&mut form)?;
    client
        .create_token(&form)
        .await
        .context("Failed to create token")?;
    ctx.success(&format!("Token '{}' created", form.name));
    Ok(())
}

pub async fn tokens_update(
    client: &OneApiClient,
    id: i64,
    fields: &TokenFields,
    ctx: &OutputContext,
) -> Result<()> {
    let token = client
        .get_token(id)
        .await
        .with_context(|| format!("Failed to load token {}", id))?;
    let mut form = TokenForm::from_token(&token);
    fields.apply(&mut form)?;
    client
        .update_token(id, &form)
        .await
        .with_context(|| format!("Failed to update token {}", id))?;
    ctx.success(&format!("Token {} updated", id));
    Ok(())
}

pub async fn tokens_delete(client: &OneApiClient, id: i64, ctx: &OutputContext) -> Result<()> {
    client
        .delete_token(id)
        .await
        .with_context(|| format!("Failed to delete token {}", id))?;
    ctx.success(&format!("Token {} deleted", id));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_apply_only_given_fields() {
        let mut form = TokenForm::new("old");
        form.remain_quota = 500;
        let fields = TokenFields {
            models: Some("gpt-4o, claude-3 ,".into()),
            unlimited: Some(true),
            ..Default::default()
        };

        fields.apply(&mut form).unwrap();
        assert_eq!(form.name, "old");
        assert_eq!(form.remain_quota, 500);
        assert!(form.unlimited_quota);
        assert_eq!(form.models, vec!["gpt-4o".to_string(), "claude-3".to_string()]);
    }

    #[test]
    fn test_expiry_forms() {
        assert_eq!(parse_expiry("never").unwrap(), NEVER_EXPIRES);
        assert_eq!(parse_expiry("Never").unwrap(), NEVER_EXPIRES);
        assert_eq!(parse_expiry("1700000000").unwrap(), 1_700_000_000);
        assert!(parse_expiry("next week").is_err());
    }
}
