//! Vector index abstraction for daybrief.
//!
//! The [`VectorIndex`] trait defines every storage operation the retrieval
//! pipeline needs, enabling pluggable backends (SQLite in the app crate,
//! in-memory here).
//!
//! An index owns its [`Embedder`](crate::embedding::Embedder) and uses it for
//! both `add` and `query`, so documents and queries always share one
//! embedding space. The index has no notion of ownership: user scoping is
//! enforced by the pipeline through metadata filters.
//!
//! Implementations must be `Send + Sync` to work with async runtimes. The
//! index is shared across concurrent requests; each backend supplies its
//! own write discipline (a lock for memory, the database for SQLite).

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::filter::MetadataFilter;
use crate::models::{now_iso, IndexEntry, IndexStats, Metadata, QueryHit};

/// Abstract vector index backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`add`](VectorIndex::add) | Embed and upsert documents |
/// | [`query`](VectorIndex::query) | Filtered similarity search, ascending distance |
/// | [`get_all`](VectorIndex::get_all) | Unranked scan |
/// | [`delete`](VectorIndex::delete) | Delete every entry matching a filter |
/// | [`stats`](VectorIndex::stats) | Count, name and backing location |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Collection name.
    fn name(&self) -> &str;

    /// Upsert documents. When `ids` is `None`, each id is derived with
    /// [`derive_entry_id`], so re-adding identical content overwrites
    /// instead of duplicating. Returns the ids in input order.
    async fn add(
        &self,
        ids: Option<Vec<String>>,
        documents: Vec<String>,
        metadatas: Vec<Metadata>,
    ) -> Result<Vec<String>>;

    /// Return up to `k` entries matching `filter`, ordered by ascending distance.
    async fn query(
        &self,
        query_text: &str,
        k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<QueryHit>>;

    /// Return stored entries without ranking, at most `limit` when given.
    async fn get_all(&self, limit: Option<usize>) -> Result<Vec<IndexEntry>>;

    /// Delete every entry whose metadata matches `filter`. Returns the count
    /// deleted; zero matches is not an error.
    async fn delete(&self, filter: &MetadataFilter) -> Result<u64>;

    /// Entry count, collection name and backing location.
    async fn stats(&self) -> Result<IndexStats>;
}

/// Deterministic entry id: hex SHA-256 over document text, `source`,
/// `timestamp` and (when present) `user_id`.
///
/// Identical content ingested twice by the same owner maps to the same id.
pub fn derive_entry_id(document: &str, metadata: &Metadata) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document.as_bytes());
    for key in ["source", "timestamp", "user_id"] {
        hasher.update(b"\x1f");
        hasher.update(field_text(metadata.get(key)).as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

fn field_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// A validated add batch: ids resolved and `added_at` stamped.
pub struct PreparedBatch {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<Metadata>,
}

/// Check batch lengths, derive missing ids and stamp `added_at`.
///
/// Shared by every backend's `add`.
pub fn prepare_batch(
    ids: Option<Vec<String>>,
    documents: Vec<String>,
    mut metadatas: Vec<Metadata>,
) -> Result<PreparedBatch> {
    if documents.len() != metadatas.len() {
        return Err(Error::InvalidInput(format!(
            "{} documents but {} metadata entries",
            documents.len(),
            metadatas.len()
        )));
    }

    let ids = match ids {
        Some(ids) => {
            if ids.len() != documents.len() {
                return Err(Error::InvalidInput(format!(
                    "{} documents but {} ids",
                    documents.len(),
                    ids.len()
                )));
            }
            ids
        }
        None => documents
            .iter()
            .zip(metadatas.iter())
            .map(|(doc, meta)| derive_entry_id(doc, meta))
            .collect(),
    };

    let stamp = now_iso();
    for metadata in metadatas.iter_mut() {
        metadata
            .entry("added_at")
            .or_insert_with(|| Value::from(stamp.clone()));
    }

    Ok(PreparedBatch {
        ids,
        documents,
        metadatas,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(v: Value) -> Metadata {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_derived_id_is_stable() {
        let m = meta(json!({"source": "calendar", "timestamp": "2025-01-01T00:00:00Z", "user_id": 7}));
        assert_eq!(derive_entry_id("notes", &m), derive_entry_id("notes", &m));
        assert_eq!(derive_entry_id("notes", &m).len(), 64);
    }

    #[test]
    fn test_derived_id_ignores_unrelated_fields() {
        let a = meta(json!({"source": "email", "timestamp": "t", "chunk_size": 3}));
        let b = meta(json!({"source": "email", "timestamp": "t", "chunk_size": 9}));
        assert_eq!(derive_entry_id("x", &a), derive_entry_id("x", &b));
    }

    #[test]
    fn test_derived_id_differs_by_owner_and_source() {
        let a = meta(json!({"source": "email", "timestamp": "t", "user_id": 1}));
        let b = meta(json!({"source": "email", "timestamp": "t", "user_id": 2}));
        let c = meta(json!({"source": "social", "timestamp": "t", "user_id": 1}));
        assert_ne!(derive_entry_id("x", &a), derive_entry_id("x", &b));
        assert_ne!(derive_entry_id("x", &a), derive_entry_id("x", &c));
    }

    #[test]
    fn test_prepare_batch_rejects_length_mismatch() {
        let err = prepare_batch(None, vec!["a".into()], vec![]).err().unwrap();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = prepare_batch(Some(vec![]), vec!["a".into()], vec![Metadata::new()])
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_prepare_batch_stamps_added_at_once() {
        let mut existing = Metadata::new();
        existing.insert("added_at".into(), json!("keep"));
        let batch = prepare_batch(
            None,
            vec!["a".into(), "b".into()],
            vec![existing, Metadata::new()],
        )
        .unwrap();
        assert_eq!(batch.metadatas[0]["added_at"], json!("keep"));
        assert!(batch.metadatas[1]["added_at"].is_string());
        assert_eq!(batch.ids.len(), 2);
    }
}
