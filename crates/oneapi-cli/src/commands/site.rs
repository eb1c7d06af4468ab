//! Site-wide information: models, dashboard, about page and status

use anyhow::{Context, Result};
use oneapi_browser::{site, Settings};
use oneapi_client::OneApiClient;

use crate::output::{ChannelModelsRow, DashboardRow, ModelRow, OutputContext, OutputFormat};

pub async fn models(client: &OneApiClient, ctx: &OutputContext) -> Result<()> {
    let models = client
        .available_models()
        .await
        .context("Failed to load available models")?;
    let rows: Vec<ModelRow> = models.into_iter().map(|model| ModelRow { model }).collect();
    ctx.print(&rows);
    Ok(())
}

pub async fn channel_models(
    client: &OneApiClient,
    settings: &Settings,
    ctx: &OutputContext,
) -> Result<()> {
    let models = site::load_channel_models(client, settings)
        .await
        .context("Failed to load channel models")?;

    let mut rows: Vec<ChannelModelsRow> = models
        .into_iter()
        .map(|(channel_type, models)| ChannelModelsRow {
            channel_type,
            models: models.join(", "),
        })
        .collect();
    rows.sort_by(|a, b| a.channel_type.cmp(&b.channel_type));
    ctx.print(&rows);
    Ok(())
}

pub async fn dashboard(
    client: &OneApiClient,
    settings: &Settings,
    ctx: &OutputContext,
) -> Result<()> {
    let stats = client
        .get_dashboard()
        .await
        .context("Failed to load dashboard")?;
    let quota = settings.quota_format();
    let rows: Vec<DashboardRow> = stats.iter().map(|s| DashboardRow::new(s, &quota)).collect();
    ctx.print(&rows);
    Ok(())
}

pub async fn about(client: &OneApiClient, settings: &Settings, ctx: &OutputContext) -> Result<()> {
    let about = site::load_about(client, settings)
        .await
        .context("Failed to load about content")?;

    if ctx.format != OutputFormat::Table {
        ctx.print_kv(&[
            ("about", about.clone()),
            ("is_url", site::about_is_url(&about).to_string()),
        ]);
    } else if about.trim().is_empty() {
        ctx.info("No about content has been set for this site");
    } else if site::about_is_url(&about) {
        ctx.info(&format!("About page: {}", about));
    } else {
        println!("{}", about);
    }
    Ok(())
}

pub async fn status(client: &OneApiClient, settings: &Settings, ctx: &OutputContext) -> Result<()> {
    let status = site::load_status(client, settings)
        .await
        .context("Failed to load site status")?;
    ctx.print_kv(&[
        ("System Name", status.system_name),
        ("Version", status.version),
        ("Quota Per Unit", status.quota_per_unit.to_string()),
        ("Display In Currency", status.display_in_currency.to_string()),
    ]);
    Ok(())
}
