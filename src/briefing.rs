//! Briefing commands.
//!
//! `daybrief briefing --user <id>` runs the full orchestrator and prints the
//! [`BriefingResponse`](daybrief_core::orchestrator::BriefingResponse).
//! `daybrief analyze --type <kind> <file>` runs a single document through
//! the unit matching `kind`.
//!
//! Both always print a JSON payload; model failures show up as
//! `"status": "error"` entries rather than a non-zero exit.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::service::Services;

/// `daybrief briefing --user <id>`
pub async fn run_briefing(config: &Config, user_id: i64) -> Result<()> {
    let services = Services::from_config(config).await?;
    let response = services.orchestrator.get_daily_briefing(user_id).await;
    services.close().await;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// `daybrief analyze --type <kind> <file>`; `-` reads stdin.
pub async fn run_analyze(config: &Config, document_type: &str, path: &Path) -> Result<()> {
    let content = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };

    let services = Services::from_config(config).await?;
    let result = services
        .orchestrator
        .analyze_document(&content, document_type)
        .await;
    services.close().await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
