//! Retrieval commands: similarity query, recent entries, user-scoped delete.
//!
//! All output is pretty-printed JSON on stdout so it can be piped into
//! other tools.

use anyhow::Result;
use serde::Serialize;

use daybrief_core::filter::MetadataFilter;

use crate::config::Config;
use crate::service::Services;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Build the optional `source` filter shared by query and delete.
pub fn source_filter(source: Option<&str>) -> Result<MetadataFilter> {
    let mut filter = MetadataFilter::new();
    if let Some(source) = source {
        filter.set("source", source)?;
    }
    Ok(filter)
}

/// `daybrief query --user <id> [-n N] [--source S] <query>`
pub async fn run_query(
    config: &Config,
    user_id: i64,
    query: &str,
    limit: Option<usize>,
    source: Option<&str>,
) -> Result<()> {
    let n_results = limit.unwrap_or(config.retrieval.default_results);
    let filter = source_filter(source)?;

    let services = Services::from_config(config).await?;
    let hits = services
        .pipeline
        .query_for_user(user_id, query, n_results, filter)
        .await?;
    services.close().await;

    print_json(&hits)
}

/// `daybrief recent [--days D] [--limit N]`
pub async fn run_recent(config: &Config, days: Option<i64>, limit: Option<usize>) -> Result<()> {
    let days = days.unwrap_or(config.retrieval.recent_days);
    let limit = limit.unwrap_or(config.retrieval.scan_limit);

    let services = Services::from_config(config).await?;
    let entries = services.pipeline.get_recent(days, limit).await?;
    services.close().await;

    print_json(&entries)
}

/// `daybrief delete --user <id> [--source S]`
pub async fn run_delete(config: &Config, user_id: i64, source: Option<&str>) -> Result<()> {
    let filter = source_filter(source)?;

    let services = Services::from_config(config).await?;
    let deleted = services.pipeline.delete_documents(user_id, filter).await?;
    services.close().await;

    print_json(&serde_json::json!({ "user_id": user_id, "deleted": deleted }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_filter() {
        assert!(source_filter(None).unwrap().is_empty());
        let filter = source_filter(Some("email")).unwrap();
        assert_eq!(filter.len(), 1);
        assert_eq!(filter.get("source").and_then(|v| v.as_str()), Some("email"));
    }
}
