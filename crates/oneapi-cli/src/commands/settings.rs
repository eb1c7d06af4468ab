//! Persisted console settings

use anyhow::{Context, Result};
use oneapi_browser::Settings;
use serde_json::Value;

use crate::output::OutputContext;

pub fn settings_show(settings: &Settings, ctx: &OutputContext) -> Result<()> {
    let snapshot = settings.snapshot();
    if snapshot.is_empty() {
        ctx.info("No settings stored");
        return Ok(());
    }

    let pairs: Vec<(&str, String)> = snapshot
        .iter()
        .map(|(key, value)| (key.as_str(), render_value(value)))
        .collect();
    ctx.print_kv(&pairs);
    Ok(())
}

pub fn set_page_size(settings: &Settings, size: usize, ctx: &OutputContext) -> Result<()> {
    settings
        .set_page_size(size)
        .context("Failed to store page size")?;
    ctx.success(&format!("Page size set to {}", size));
    Ok(())
}

/// Strings unquoted, everything else as compact JSON
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
