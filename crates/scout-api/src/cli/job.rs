//! Job inspection CLI commands.

use anyhow::Context;
use comfy_table::{presets::UTF8_FULL, Table};

use scout_core::job::JobStore;

use crate::state::AppState;

/// `scout job show <id>`
pub async fn show_job(state: &AppState, id: &str, json: bool) -> anyhow::Result<()> {
    let record = state
        .engine
        .store()
        .get(id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .with_context(|| format!("job '{id}' not found"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("Job:      {}", record.id);
    println!("Status:   {}", record.status);
    println!("Progress: {}%", record.progress);
    if let Some(error) = &record.error {
        println!("Error:    {error}");
    }
    if let Some(result) = &record.result {
        println!("Result:   {}", serde_json::to_string_pretty(result)?);
    }
    if !record.candidate_links.is_empty() {
        println!("Candidate links:");
        for link in &record.candidate_links {
            println!("  - {} ({})", link.title, link.url);
        }
    }

    if !record.logs.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Time", "Kind", "Message"]);
        for entry in &record.logs {
            table.add_row(vec![
                entry.timestamp.format("%H:%M:%S").to_string(),
                format!("{:?}", entry.kind).to_uppercase(),
                entry.message.clone(),
            ]);
        }
        println!("{table}");
    }

    Ok(())
}

/// `scout job list --limit N`
pub async fn list_jobs(state: &AppState, limit: u32, json: bool) -> anyhow::Result<()> {
    let records = state
        .engine
        .store()
        .list_recent(limit)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Id", "Status", "Progress", "Created"]);
    for record in &records {
        table.add_row(vec![
            record.id.clone(),
            record.status.to_string(),
            format!("{}%", record.progress),
            record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    println!("{table}");

    Ok(())
}
