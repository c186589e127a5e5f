//! Retrieval pipeline: chunking + vector index behind one facade.
//!
//! Coordinates ingestion (`text → chunk → embed → upsert`), similarity
//! query, ownership-scoped deletion, and the scan-based helpers used by
//! the analysis tools.
//!
//! # Ownership
//!
//! The vector index knows nothing about users. Every user-scoped operation
//! here writes the caller's `user_id` into the filter before delegating,
//! overwriting whatever the caller supplied. [`RetrievalPipeline::delete_documents`]
//! is the only deletion path and always does this.
//!
//! # Scan cost
//!
//! [`get_recent`](RetrievalPipeline::get_recent),
//! [`get_user_documents`](RetrievalPipeline::get_user_documents) and the
//! unranked branch of [`search_by_content_type`](RetrievalPipeline::search_by_content_type)
//! read every stored entry and filter in memory. Cost is O(total entries),
//! which is fine for one user's mailbox-sized corpus and nothing larger.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::chunk::Chunker;
use crate::error::{Error, Result};
use crate::filter::MetadataFilter;
use crate::models::{
    now_iso, CollectionStats, IndexEntry, Metadata, QueryHit, RetrievedDocument,
};
use crate::store::VectorIndex;

/// Facade composing a [`Chunker`] and a [`VectorIndex`].
///
/// Construct once at startup and share via `Arc`; every method takes `&self`.
pub struct RetrievalPipeline {
    chunker: Chunker,
    index: Arc<dyn VectorIndex>,
}

impl RetrievalPipeline {
    pub fn new(chunker: Chunker, index: Arc<dyn VectorIndex>) -> Self {
        Self { chunker, index }
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// Chunk, embed and store `text`. Returns the stored chunk ids.
    ///
    /// `metadata` must carry an integer `user_id`. `timestamp` defaults to
    /// now when absent. Re-adding identical text with the same `source`,
    /// `timestamp` and owner yields the same ids and does not grow the index.
    pub async fn add_text(&self, text: &str, mut metadata: Metadata) -> Result<Vec<String>> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("cannot ingest empty text".into()));
        }
        if metadata.get("user_id").and_then(Value::as_i64).is_none() {
            return Err(Error::InvalidInput(
                "metadata must carry an integer user_id".into(),
            ));
        }
        let source = metadata
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        metadata
            .entry("timestamp")
            .or_insert_with(|| Value::from(now_iso()));

        let (documents, metadatas): (Vec<String>, Vec<Metadata>) = self
            .chunker
            .chunk_with_metadata(text, &metadata)
            .into_iter()
            .unzip();

        let ids = self.index.add(None, documents, metadatas).await?;
        info!(
            chunks = ids.len(),
            source = %source,
            "added text to retrieval pipeline"
        );
        Ok(ids)
    }

    /// Similarity query with a caller-supplied filter.
    pub async fn query_texts(
        &self,
        query: &str,
        n_results: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<QueryHit>> {
        let hits = self.index.query(query, n_results, filter).await?;
        debug!(hits = hits.len(), query = %preview(query, 50), "query completed");
        Ok(hits)
    }

    /// Similarity query scoped to one user: `user_id` in `filter` is overwritten.
    pub async fn query_for_user(
        &self,
        user_id: i64,
        query: &str,
        n_results: usize,
        filter: MetadataFilter,
    ) -> Result<Vec<QueryHit>> {
        let filter = filter.with("user_id", user_id)?;
        self.query_texts(query, n_results, &filter).await
    }

    /// Entries whose `timestamp` (or `added_at`) is within the last `days`,
    /// newest first, at most `limit`. Full scan.
    ///
    /// A window too large to represent reaches back to the earliest
    /// representable instant.
    pub async fn get_recent(&self, days: i64, limit: usize) -> Result<Vec<IndexEntry>> {
        let cutoff = Duration::try_days(days)
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .unwrap_or(if days < 0 {
                DateTime::<Utc>::MAX_UTC
            } else {
                DateTime::<Utc>::MIN_UTC
            });
        let mut recent: Vec<(DateTime<Utc>, IndexEntry)> = self
            .index
            .get_all(None)
            .await?
            .into_iter()
            .filter_map(|entry| entry.timestamp().map(|ts| (ts, entry)))
            .filter(|(ts, _)| *ts >= cutoff)
            .collect();

        recent.sort_by(|a, b| b.0.cmp(&a.0));
        recent.truncate(limit);
        Ok(recent.into_iter().map(|(_, e)| e).collect())
    }

    /// Delete the caller's entries matching `filter`.
    ///
    /// `user_id` in `filter` is always replaced with `user_id`, so a caller
    /// can never reach another user's entries, whatever filter they send.
    pub async fn delete_documents(&self, user_id: i64, filter: MetadataFilter) -> Result<u64> {
        if let Some(claimed) = filter.get("user_id") {
            if claimed.as_f64() != Some(user_id as f64) {
                warn!(user_id, claimed = %claimed, "delete filter named another user; scoped to caller");
            }
        }
        let filter = filter.with("user_id", user_id)?;
        let deleted = self.index.delete(&filter).await?;
        info!(user_id, deleted, "deleted documents");
        Ok(deleted)
    }

    /// Entries of one `source` type. Ranked by similarity when `query` is
    /// non-empty; otherwise an unranked scan.
    pub async fn search_by_content_type(
        &self,
        content_type: &str,
        query: &str,
        n_results: usize,
    ) -> Result<Vec<RetrievedDocument>> {
        let filter = MetadataFilter::new().with("source", content_type)?;

        if !query.is_empty() {
            let hits = self.query_texts(query, n_results, &filter).await?;
            return Ok(hits.into_iter().map(RetrievedDocument::from).collect());
        }

        Ok(self
            .index
            .get_all(None)
            .await?
            .into_iter()
            .filter(|e| filter.matches(&e.metadata))
            .take(n_results)
            .map(RetrievedDocument::from)
            .collect())
    }

    /// Every entry owned by `user_id`, newest first, at most `n_results`. Full scan.
    pub async fn get_user_documents(
        &self,
        user_id: i64,
        n_results: usize,
    ) -> Result<Vec<IndexEntry>> {
        let filter = MetadataFilter::new().with("user_id", user_id)?;
        let mut docs: Vec<IndexEntry> = self
            .index
            .get_all(None)
            .await?
            .into_iter()
            .filter(|e| filter.matches(&e.metadata))
            .collect();

        docs.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        docs.truncate(n_results);
        Ok(docs)
    }

    /// Index stats; a failure is returned as an error payload, never raised.
    pub async fn get_collection_stats(&self) -> CollectionStats {
        match self.index.stats().await {
            Ok(stats) => CollectionStats::Available(stats),
            Err(e) => {
                warn!(error = %e, "failed to read collection stats");
                CollectionStats::Unavailable {
                    error: e.to_string(),
                }
            }
        }
    }
}

/// First `max` characters of `s`.
pub(crate) fn preview(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
