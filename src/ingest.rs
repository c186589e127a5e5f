//! Ingestion commands.
//!
//! `daybrief ingest` reads a JSON file holding one tagged message or an
//! array of them (see [`IngestMessage`]), renders each to text plus
//! metadata, and feeds it through the retrieval pipeline. `daybrief add`
//! stores a single free-text document.
//!
//! Re-ingesting the same file is safe: chunk ids are derived from content,
//! source, timestamp and owner, so repeats overwrite instead of growing
//! the index.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use daybrief_core::messages::IngestMessage;
use daybrief_core::models::Metadata;
use daybrief_core::pipeline::RetrievalPipeline;
use daybrief_core::Error;

use crate::config::Config;
use crate::service::Services;

/// Outcome of an ingest run.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct IngestReport {
    pub messages: usize,
    pub chunks: usize,
    pub skipped: usize,
}

/// Parse a JSON document holding one message object or an array of them.
pub fn parse_messages(json: &str) -> Result<Vec<IngestMessage>> {
    let value: Value = serde_json::from_str(json).context("Input is not valid JSON")?;
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value(item)
                    .with_context(|| format!("Invalid message at index {}", i))
            })
            .collect(),
        other => Ok(vec![
            serde_json::from_value(other).context("Invalid message")?
        ]),
    }
}

/// Store `messages` for `user_id`. Messages that render to blank text are
/// skipped; any other failure aborts the run.
pub async fn ingest_messages(
    pipeline: &RetrievalPipeline,
    user_id: i64,
    messages: Vec<IngestMessage>,
) -> Result<IngestReport> {
    let mut report = IngestReport::default();

    for (i, message) in messages.into_iter().enumerate() {
        let source = message.source().to_string();
        let (text, metadata) = message.into_document(user_id);
        match pipeline.add_text(&text, metadata).await {
            Ok(ids) => {
                report.messages += 1;
                report.chunks += ids.len();
            }
            Err(Error::InvalidInput(reason)) => {
                warn!(index = i, source = %source, reason = %reason, "skipping message");
                report.skipped += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to ingest message {}", i));
            }
        }
    }

    info!(
        user_id,
        messages = report.messages,
        chunks = report.chunks,
        skipped = report.skipped,
        "ingest complete"
    );
    Ok(report)
}

/// `daybrief ingest --user <id> <file>`
pub async fn run_ingest(config: &Config, user_id: i64, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let messages = parse_messages(&content)?;

    let services = Services::from_config(config).await?;
    let report = ingest_messages(&services.pipeline, user_id, messages).await?;
    services.close().await;

    println!(
        "Ingested {} message(s) as {} chunk(s); {} skipped.",
        report.messages, report.chunks, report.skipped
    );
    Ok(())
}

/// `daybrief add --user <id> --source <type> <text>`
pub async fn run_add(config: &Config, user_id: i64, source: &str, text: &str) -> Result<()> {
    let mut metadata = Metadata::new();
    metadata.insert("source".into(), Value::from(source));
    metadata.insert("user_id".into(), Value::from(user_id));

    let services = Services::from_config(config).await?;
    let ids = services.pipeline.add_text(text, metadata).await?;
    services.close().await;

    println!("{}", serde_json::to_string_pretty(&ids)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_and_array() {
        let one = r#"{"kind": "generic", "content": "hi", "source": "notes",
                      "timestamp": "2025-03-01T09:00:00Z"}"#;
        assert_eq!(parse_messages(one).unwrap().len(), 1);

        let many = format!("[{}, {}]", one, one);
        assert_eq!(parse_messages(&many).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_reports_bad_index() {
        let json = r#"[
            {"kind": "generic", "content": "hi", "source": "notes", "timestamp": "2025-03-01T09:00:00Z"},
            {"kind": "fax", "content": "?"}
        ]"#;
        let err = parse_messages(json).unwrap_err();
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(parse_messages("not json").is_err());
    }
}
