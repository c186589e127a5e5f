//! In-memory [`VectorIndex`] implementation for testing and embedding in
//! other processes.
//!
//! Uses a `HashMap` behind `std::sync::RwLock` for thread safety. Query is
//! brute-force cosine distance over every entry that passes the filter.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::embedding::{cosine_distance, Embedder};
use crate::error::{Error, Result};
use crate::filter::MetadataFilter;
use crate::models::{IndexEntry, IndexStats, Metadata, QueryHit};

use super::{prepare_batch, VectorIndex};

struct StoredEntry {
    content: String,
    metadata: Metadata,
    vector: Vec<f32>,
}

/// In-memory vector index.
pub struct InMemoryIndex {
    name: String,
    embedder: Arc<dyn Embedder>,
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl InMemoryIndex {
    pub fn new(name: impl Into<String>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            name: name.into(),
            embedder,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, StoredEntry>>> {
        self.entries
            .read()
            .map_err(|_| Error::storage("in-memory index lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, StoredEntry>>> {
        self.entries
            .write()
            .map_err(|_| Error::storage("in-memory index lock poisoned"))
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add(
        &self,
        ids: Option<Vec<String>>,
        documents: Vec<String>,
        metadatas: Vec<Metadata>,
    ) -> Result<Vec<String>> {
        let batch = prepare_batch(ids, documents, metadatas)?;
        if batch.documents.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.embedder.embed_documents(&batch.documents).await?;
        if vectors.len() != batch.documents.len() {
            return Err(Error::Embedding(format!(
                "expected {} vectors, got {}",
                batch.documents.len(),
                vectors.len()
            )));
        }

        let mut entries = self.write()?;
        for ((id, content), (metadata, vector)) in batch
            .ids
            .iter()
            .zip(batch.documents)
            .zip(batch.metadatas.into_iter().zip(vectors))
        {
            entries.insert(
                id.clone(),
                StoredEntry {
                    content,
                    metadata,
                    vector,
                },
            );
        }
        debug!(count = batch.ids.len(), index = %self.name, "upserted entries");
        Ok(batch.ids)
    }

    async fn query(
        &self,
        query_text: &str,
        k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<QueryHit>> {
        let query_vec = self.embedder.embed_query(query_text).await?;
        let entries = self.read()?;

        let mut hits: Vec<QueryHit> = entries
            .iter()
            .filter(|(_, e)| filter.matches(&e.metadata))
            .map(|(id, e)| QueryHit {
                id: id.clone(),
                content: e.content.clone(),
                metadata: e.metadata.clone(),
                distance: cosine_distance(&query_vec, &e.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn get_all(&self, limit: Option<usize>) -> Result<Vec<IndexEntry>> {
        let entries = self.read()?;
        let iter = entries.iter().map(|(id, e)| IndexEntry {
            id: id.clone(),
            content: e.content.clone(),
            metadata: e.metadata.clone(),
        });
        Ok(match limit {
            Some(n) => iter.take(n).collect(),
            None => iter.collect(),
        })
    }

    async fn delete(&self, filter: &MetadataFilter) -> Result<u64> {
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|_, e| !filter.matches(&e.metadata));
        let deleted = (before - entries.len()) as u64;
        debug!(deleted, index = %self.name, "deleted entries");
        Ok(deleted)
    }

    async fn stats(&self) -> Result<IndexStats> {
        let entries = self.read()?;
        Ok(IndexStats {
            total_count: entries.len() as u64,
            name: self.name.clone(),
            backing_location: "memory".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use serde_json::{json, Value};

    fn meta(v: Value) -> Metadata {
        v.as_object().cloned().unwrap()
    }

    fn index() -> InMemoryIndex {
        InMemoryIndex::new("test", Arc::new(HashEmbedder::default()))
    }

    #[tokio::test]
    async fn test_add_is_upsert() {
        let idx = index();
        let m = meta(json!({"source": "email", "timestamp": "t", "user_id": 1}));
        let first = idx
            .add(None, vec!["hello".into()], vec![m.clone()])
            .await
            .unwrap();
        let second = idx.add(None, vec!["hello".into()], vec![m]).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(idx.stats().await.unwrap().total_count, 1);
    }

    #[tokio::test]
    async fn test_query_orders_by_distance_and_filters() {
        let idx = index();
        idx.add(
            Some(vec!["a".into(), "b".into(), "c".into()]),
            vec![
                "budget review meeting".into(),
                "meeting".into(),
                "meeting agenda".into(),
            ],
            vec![
                meta(json!({"user_id": 1})),
                meta(json!({"user_id": 1})),
                meta(json!({"user_id": 2})),
            ],
        )
        .await
        .unwrap();

        let filter = MetadataFilter::new().with("user_id", 1).unwrap();
        let hits = idx.query("meeting", 10, &filter).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "b");
        assert!(hits[0].distance <= hits[1].distance);
        assert!(hits.iter().all(|h| h.metadata["user_id"] == json!(1)));
    }

    #[tokio::test]
    async fn test_query_returns_fewer_than_k() {
        let idx = index();
        idx.add(None, vec!["only".into()], vec![Metadata::new()])
            .await
            .unwrap();
        let hits = idx.query("only", 5, &MetadataFilter::new()).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_counts_matches() {
        let idx = index();
        idx.add(
            None,
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                meta(json!({"user_id": 1, "source": "email"})),
                meta(json!({"user_id": 1, "source": "social"})),
                meta(json!({"user_id": 2, "source": "email"})),
            ],
        )
        .await
        .unwrap();

        let f = MetadataFilter::new().with("source", "email").unwrap();
        assert_eq!(idx.delete(&f).await.unwrap(), 2);
        assert_eq!(idx.delete(&f).await.unwrap(), 0);
        assert_eq!(idx.get_all(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_all_limit() {
        let idx = index();
        idx.add(
            None,
            vec!["a".into(), "b".into(), "c".into()],
            vec![Metadata::new(), Metadata::new(), Metadata::new()],
        )
        .await
        .unwrap();
        assert_eq!(idx.get_all(Some(2)).await.unwrap().len(), 2);
        let all = idx.get_all(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|e| e.metadata.contains_key("added_at")));
    }
}
