//! Core data models used throughout daybrief.
//!
//! These types represent the stored entries, query hits, index statistics,
//! and analysis results that flow through the retrieval pipeline and the
//! briefing orchestrator.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form metadata attached to every stored chunk.
///
/// Always carries `source`, `user_id`, `timestamp`, `chunk_index` and
/// `total_chunks` once it has passed through the pipeline, plus any
/// source-specific fields.
pub type Metadata = serde_json::Map<String, Value>;

/// A stored entry as returned by an unranked scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
}

impl IndexEntry {
    /// The entry's `timestamp` field, falling back to `added_at`.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.metadata
            .get("timestamp")
            .or_else(|| self.metadata.get("added_at"))
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
    }
}

/// A similarity-query hit. Smaller `distance` means more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    pub distance: f32,
}

/// A document returned by a content-type search: ranked hits carry a
/// distance, scan results do not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

impl From<QueryHit> for RetrievedDocument {
    fn from(hit: QueryHit) -> Self {
        Self {
            id: hit.id,
            content: hit.content,
            metadata: hit.metadata,
            distance: Some(hit.distance),
        }
    }
}

impl From<IndexEntry> for RetrievedDocument {
    fn from(entry: IndexEntry) -> Self {
        Self {
            id: entry.id,
            content: entry.content,
            metadata: entry.metadata,
            distance: None,
        }
    }
}

/// Size and location of a vector index collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_count: u64,
    pub name: String,
    pub backing_location: String,
}

/// Stats payload handed to callers; failures become data instead of errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CollectionStats {
    Available(IndexStats),
    Unavailable { error: String },
}

/// The four analysis unit kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Email,
    Calendar,
    Social,
    Priority,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Calendar => "calendar",
            Self::Social => "social",
            Self::Priority => "priority",
        }
    }

    /// Human label used in failure messages ("Email analysis failed: ...").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::Calendar => "Calendar",
            Self::Social => "Social",
            Self::Priority => "Priority",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Completed,
    Error,
}

/// Output of one analysis unit invocation. Response-scoped, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub agent_type: AgentType,
    /// Never empty: model text on success, a readable failure string otherwise.
    pub analysis: String,
    pub status: AnalysisStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
}

impl AnalysisResult {
    pub fn completed(agent_type: AgentType, analysis: impl Into<String>) -> Self {
        Self {
            agent_type,
            analysis: analysis.into(),
            status: AnalysisStatus::Completed,
            timestamp: Some(now_iso()),
            document_type: None,
        }
    }

    pub fn error(agent_type: AgentType, analysis: impl Into<String>) -> Self {
        Self {
            agent_type,
            analysis: analysis.into(),
            status: AnalysisStatus::Error,
            timestamp: Some(now_iso()),
            document_type: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == AnalysisStatus::Error
    }

    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = Some(document_type.into());
        self
    }
}

/// Current time as an ISO-8601 / RFC 3339 UTC string.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an ISO-8601 timestamp, accepting both zoned and naive (assumed UTC) forms.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_timestamp_zoned_and_naive() {
        let zoned = parse_timestamp("2025-01-01T00:00:00Z").unwrap();
        let naive = parse_timestamp("2025-01-01T00:00:00.000000").unwrap();
        assert_eq!(zoned, naive);
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_entry_timestamp_falls_back_to_added_at() {
        let mut metadata = Metadata::new();
        metadata.insert("added_at".into(), json!("2024-06-01T12:00:00Z"));
        let entry = IndexEntry {
            id: "a".into(),
            content: "x".into(),
            metadata,
        };
        assert!(entry.timestamp().is_some());
    }

    #[test]
    fn test_analysis_result_serializes_lowercase() {
        let r = AnalysisResult::error(AgentType::Calendar, "Calendar analysis failed: boom");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["agent_type"], "calendar");
        assert_eq!(v["status"], "error");
        assert!(v.get("document_type").is_none());
    }

    #[test]
    fn test_unavailable_stats_shape() {
        let stats = CollectionStats::Unavailable {
            error: "down".into(),
        };
        assert_eq!(serde_json::to_value(&stats).unwrap(), json!({"error": "down"}));
    }
}
