//! Index statistics and health overview.
//!
//! `daybrief stats` prints the collection summary reported by the retrieval
//! pipeline, followed by a per-source breakdown read straight from SQLite.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use daybrief_core::models::{parse_timestamp, CollectionStats};

use crate::config::Config;
use crate::service::Services;

/// Per-source entry counts for one collection.
#[derive(Debug, PartialEq)]
pub struct SourceStats {
    pub source: String,
    pub entries: i64,
    pub users: i64,
    pub last_added: Option<String>,
}

/// Group a collection's entries by their `source` metadata field.
pub async fn source_breakdown(pool: &SqlitePool, collection: &str) -> Result<Vec<SourceStats>> {
    let rows = sqlx::query(
        r#"
        SELECT
            COALESCE(json_extract(metadata_json, '$.source'), 'unknown') AS source,
            COUNT(*) AS entries,
            COUNT(DISTINCT json_extract(metadata_json, '$.user_id')) AS users,
            MAX(added_at) AS last_added
        FROM index_entries
        WHERE collection = ?
        GROUP BY 1
        ORDER BY entries DESC, source ASC
        "#,
    )
    .bind(collection)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| SourceStats {
            source: row.get("source"),
            entries: row.get("entries"),
            users: row.get("users"),
            last_added: row.get("last_added"),
        })
        .collect())
}

/// Run the stats command: query the index and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let services = Services::from_config(config).await?;
    let collection_stats = services.pipeline.get_collection_stats().await;
    let by_source = source_breakdown(&services.pool, &config.db.collection).await?;
    services.close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("daybrief index stats");
    println!("===================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();

    match collection_stats {
        CollectionStats::Available(stats) => {
            println!("  Collection:  {}", stats.name);
            println!("  Entries:     {}", stats.total_count);
        }
        CollectionStats::Unavailable { error } => {
            println!("  Collection:  unavailable ({})", error);
        }
    }

    if !by_source.is_empty() {
        println!();
        println!("  By source:");
        println!(
            "  {:<24} {:>8} {:>6}   {}",
            "SOURCE", "ENTRIES", "USERS", "LAST ADDED"
        );
        println!("  {}", "-".repeat(60));

        let now = Utc::now();
        for s in &by_source {
            let added_display = s
                .last_added
                .as_deref()
                .and_then(parse_timestamp)
                .map(|ts| format_relative(ts, now))
                .unwrap_or_else(|| "never".to_string());
            println!(
                "  {:<24} {:>8} {:>6}   {}",
                s.source, s.entries, s.users, added_display
            );
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format `ts` relative to `now` (e.g. "3 hours ago"); older than a month
/// falls back to the calendar date.
fn format_relative(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = (now - ts).num_seconds();

    if delta < 0 {
        return ts.format("%Y-%m-%d %H:%M").to_string();
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        ts.format("%Y-%m-%d %H:%M").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_format_relative() {
        let now = Utc::now();
        assert_eq!(format_relative(now, now), "just now");
        assert_eq!(format_relative(now - Duration::minutes(1), now), "1 min ago");
        assert_eq!(format_relative(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(format_relative(now - Duration::days(2), now), "2 days ago");
    }
}
