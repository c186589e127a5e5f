//! Retrieval tools that analysis steps can call through the orchestrator.
//!
//! A [`ToolBox`] wraps the [`RetrievalPipeline`] and exposes three tools
//! whose outputs are plain text meant to be pasted into a model prompt.
//! Tool failures never propagate: they become text such as
//! `"Error performing search: ..."`.
//!
//! | Tool | Call | Output |
//! |------|------|--------|
//! | `semantic_search` | [`ToolCall::SemanticSearch`] | Top 5 hits, 200-char previews |
//! | `recent_documents` | [`ToolCall::RecentDocuments`] | Up to 10 entries from the last N days, 150-char previews |
//! | `document_stats` | [`ToolCall::DocumentStats`] | Collection stats line |
//!
//! Every tool runs on behalf of one user and only sees that user's entries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::filter::MetadataFilter;
use crate::models::{CollectionStats, Metadata};
use crate::pipeline::RetrievalPipeline;

const SEARCH_RESULTS: usize = 5;
const SEARCH_PREVIEW_CHARS: usize = 200;
const RECENT_RESULTS: usize = 10;
const RECENT_PREVIEW_CHARS: usize = 150;

/// A queued tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    SemanticSearch { query: String },
    RecentDocuments { days: i64 },
    DocumentStats,
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SemanticSearch { .. } => "semantic_search",
            Self::RecentDocuments { .. } => "recent_documents",
            Self::DocumentStats => "document_stats",
        }
    }
}

/// The text a tool produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool: String,
    pub output: String,
}

/// Text-producing retrieval tools over a shared pipeline.
pub struct ToolBox {
    pipeline: Arc<RetrievalPipeline>,
}

impl ToolBox {
    pub fn new(pipeline: Arc<RetrievalPipeline>) -> Self {
        Self { pipeline }
    }

    /// Execute `call` for `user_id`.
    pub async fn run(&self, user_id: i64, call: &ToolCall) -> ToolOutput {
        let output = match call {
            ToolCall::SemanticSearch { query } => self.semantic_search(user_id, query).await,
            ToolCall::RecentDocuments { days } => self.recent_documents(user_id, *days).await,
            ToolCall::DocumentStats => self.document_stats().await,
        };
        ToolOutput {
            tool: call.name().to_string(),
            output,
        }
    }

    /// Similarity search over the user's documents.
    pub async fn semantic_search(&self, user_id: i64, query: &str) -> String {
        let hits = match self
            .pipeline
            .query_for_user(user_id, query, SEARCH_RESULTS, MetadataFilter::new())
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                error!(error = %e, "semantic search tool failed");
                return format!("Error performing search: {}", e);
            }
        };

        if hits.is_empty() {
            return "No relevant documents found.".to_string();
        }

        hits.iter()
            .map(|h| format_entry(&h.metadata, &h.content, SEARCH_PREVIEW_CHARS))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The user's documents from the last `days` days, newest first.
    pub async fn recent_documents(&self, user_id: i64, days: i64) -> String {
        let owner = match MetadataFilter::new().with("user_id", user_id) {
            Ok(f) => f,
            Err(e) => return format!("Error retrieving recent documents: {}", e),
        };
        let recent = match self.pipeline.get_recent(days, usize::MAX).await {
            Ok(entries) => entries
                .into_iter()
                .filter(|e| owner.matches(&e.metadata))
                .collect::<Vec<_>>(),
            Err(e) => {
                error!(error = %e, "recent documents tool failed");
                return format!("Error retrieving recent documents: {}", e);
            }
        };

        if recent.is_empty() {
            return format!("No documents found from the last {} days.", days);
        }

        let listed = recent
            .iter()
            .take(RECENT_RESULTS)
            .map(|e| format_entry(&e.metadata, &e.content, RECENT_PREVIEW_CHARS))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Found {} documents from the last {} days:\n\n{}",
            recent.len(),
            days,
            listed
        )
    }

    pub async fn document_stats(&self) -> String {
        match self.pipeline.get_collection_stats().await {
            CollectionStats::Available(s) => format!(
                "Document collection stats: total_count={}, name={}, backing_location={}",
                s.total_count, s.name, s.backing_location
            ),
            CollectionStats::Unavailable { error } => {
                format!("Error getting document stats: {}", error)
            }
        }
    }
}

fn format_entry(metadata: &Metadata, content: &str, max_chars: usize) -> String {
    format!(
        "Source: {} | Time: {}\nContent: {}\n",
        text_field(metadata, "source"),
        text_field(metadata, "timestamp"),
        truncate_preview(content, max_chars)
    )
}

fn text_field(metadata: &Metadata, key: &str) -> String {
    match metadata.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

/// First `max_chars` characters, with `...` appended when anything was cut.
pub fn truncate_preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &content[..byte_idx]),
        None => content.to_string(),
    }
}
