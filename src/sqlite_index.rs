//! SQLite-backed [`VectorIndex`] implementation.
//!
//! One table, `index_entries`, keyed by `(collection, id)`. Vectors are
//! stored as little-endian f32 BLOBs. Query and delete load the
//! collection's rows and evaluate [`MetadataFilter`] in Rust, so filter
//! semantics are identical to the in-memory index. Similarity is
//! brute-force cosine.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use daybrief_core::embedding::{blob_to_vec, cosine_distance, vec_to_blob, Embedder};
use daybrief_core::error::{Error, Result};
use daybrief_core::filter::MetadataFilter;
use daybrief_core::models::{IndexEntry, IndexStats, Metadata, QueryHit};
use daybrief_core::store::{prepare_batch, VectorIndex};

/// SQLite implementation of the [`VectorIndex`] trait.
pub struct SqliteIndex {
    pool: SqlitePool,
    collection: String,
    embedder: Arc<dyn Embedder>,
    location: String,
}

impl SqliteIndex {
    /// The pool must already have the schema applied
    /// ([`crate::migrate::apply_schema`]).
    pub fn new(
        pool: SqlitePool,
        collection: impl Into<String>,
        embedder: Arc<dyn Embedder>,
        db_path: &Path,
    ) -> Self {
        Self {
            pool,
            collection: collection.into(),
            embedder,
            location: db_path.display().to_string(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_rows(&self, with_embedding: bool) -> Result<Vec<StoredRow>> {
        let sql = if with_embedding {
            "SELECT id, content, metadata_json, embedding FROM index_entries WHERE collection = ? ORDER BY rowid"
        } else {
            "SELECT id, content, metadata_json, NULL AS embedding FROM index_entries WHERE collection = ? ORDER BY rowid"
        };
        let rows = sqlx::query(sql)
            .bind(&self.collection)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::storage)?;

        rows.iter()
            .map(|row| {
                let metadata_json: String = row.get("metadata_json");
                let blob: Option<Vec<u8>> = row.get("embedding");
                Ok(StoredRow {
                    id: row.get("id"),
                    content: row.get("content"),
                    metadata: parse_metadata(&metadata_json)?,
                    vector: blob.map(|b| blob_to_vec(&b)).unwrap_or_default(),
                })
            })
            .collect()
    }
}

struct StoredRow {
    id: String,
    content: String,
    metadata: Metadata,
    vector: Vec<f32>,
}

fn parse_metadata(json: &str) -> Result<Metadata> {
    Ok(serde_json::from_str(json)?)
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    fn name(&self) -> &str {
        &self.collection
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

        let mut tx = self.pool.begin().await.map_err(Error::storage)?;
        for (((id, content), metadata), vector) in batch
            .ids
            .iter()
            .zip(&batch.documents)
            .zip(&batch.metadatas)
            .zip(&vectors)
        {
            let added_at = metadata
                .get("added_at")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            sqlx::query(
                r#"
                INSERT INTO index_entries (id, collection, content, metadata_json, embedding, added_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    content = excluded.content,
                    metadata_json = excluded.metadata_json,
                    embedding = excluded.embedding,
                    added_at = excluded.added_at
                "#,
            )
            .bind(id)
            .bind(&self.collection)
            .bind(content)
            .bind(serde_json::to_string(metadata)?)
            .bind(vec_to_blob(vector))
            .bind(added_at)
            .execute(&mut *tx)
            .await
            .map_err(Error::storage)?;
        }
        tx.commit().await.map_err(Error::storage)?;

        debug!(count = batch.ids.len(), collection = %self.collection, "upserted entries");
        Ok(batch.ids)
    }

    async fn query(
        &self,
        query_text: &str,
        k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<QueryHit>> {
        let query_vec = self.embedder.embed_query(query_text).await?;

        let mut hits: Vec<QueryHit> = self
            .load_rows(true)
            .await?
            .into_iter()
            .filter(|row| filter.matches(&row.metadata))
            .map(|row| QueryHit {
                distance: cosine_distance(&query_vec, &row.vector),
                id: row.id,
                content: row.content,
                metadata: row.metadata,
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
        let rows = self.load_rows(false).await?;
        let entries = rows.into_iter().map(|row| IndexEntry {
            id: row.id,
            content: row.content,
            metadata: row.metadata,
        });
        Ok(match limit {
            Some(n) => entries.take(n).collect(),
            None => entries.collect(),
        })
    }

    async fn delete(&self, filter: &MetadataFilter) -> Result<u64> {
        let doomed: Vec<String> = self
            .load_rows(false)
            .await?
            .into_iter()
            .filter(|row| filter.matches(&row.metadata))
            .map(|row| row.id)
            .collect();

        if doomed.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(Error::storage)?;
        let mut deleted = 0u64;
        for id in &doomed {
            let result = sqlx::query("DELETE FROM index_entries WHERE collection = ? AND id = ?")
                .bind(&self.collection)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(Error::storage)?;
            deleted += result.rows_affected();
        }
        tx.commit().await.map_err(Error::storage)?;

        debug!(deleted, collection = %self.collection, "deleted entries");
        Ok(deleted)
    }

    async fn stats(&self) -> Result<IndexStats> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM index_entries WHERE collection = ?")
                .bind(&self.collection)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::storage)?;

        Ok(IndexStats {
            total_count: count.max(0) as u64,
            name: self.collection.clone(),
            backing_location: self.location.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::{db, migrate};
    use daybrief_core::embedding::HashEmbedder;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn meta(v: Value) -> Metadata {
        v.as_object().cloned().unwrap()
    }

    async fn open(tmp: &TempDir, collection: &str) -> SqliteIndex {
        let mut config = Config::default();
        config.db.path = tmp.path().join("data").join("index.sqlite");
        let pool = db::connect(&config).await.unwrap();
        migrate::apply_schema(&pool).await.unwrap();
        SqliteIndex::new(
            pool,
            collection,
            Arc::new(HashEmbedder::default()),
            &config.db.path,
        )
    }

    #[tokio::test]
    async fn test_upsert_and_stats() {
        let tmp = TempDir::new().unwrap();
        let idx = open(&tmp, "docs").await;
        let m = meta(json!({"source": "email", "timestamp": "t", "user_id": 1}));

        let a = idx.add(None, vec!["hello".into()], vec![m.clone()]).await.unwrap();
        let b = idx.add(None, vec!["hello".into()], vec![m]).await.unwrap();
        assert_eq!(a, b);

        let stats = idx.stats().await.unwrap();
        assert_eq!(stats.total_count, 1);
        assert_eq!(stats.name, "docs");
        assert!(stats.backing_location.ends_with("index.sqlite"));
    }

    #[tokio::test]
    async fn test_query_filter_and_order() {
        let tmp = TempDir::new().unwrap();
        let idx = open(&tmp, "docs").await;
        idx.add(
            Some(vec!["a".into(), "b".into(), "c".into()]),
            vec![
                "grocery list".into(),
                "meeting notes".into(),
                "meeting notes".into(),
            ],
            vec![
                meta(json!({"user_id": 7})),
                meta(json!({"user_id": 7})),
                meta(json!({"user_id": 8})),
            ],
        )
        .await
        .unwrap();

        let filter = MetadataFilter::new().with("user_id", 7).unwrap();
        let hits = idx.query("meeting", 5, &filter).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "b");
        assert!(hits[0].distance < hits[1].distance);
        assert!(hits.iter().all(|h| h.metadata["user_id"] == json!(7)));
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let tmp = TempDir::new().unwrap();
        let one = open(&tmp, "one").await;
        let two = SqliteIndex::new(
            one.pool().clone(),
            "two",
            Arc::new(HashEmbedder::default()),
            Path::new("shared"),
        );
        one.add(None, vec!["x".into()], vec![Metadata::new()]).await.unwrap();
        assert_eq!(one.stats().await.unwrap().total_count, 1);
        assert_eq!(two.stats().await.unwrap().total_count, 0);
        assert!(two.get_all(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_filter() {
        let tmp = TempDir::new().unwrap();
        let idx = open(&tmp, "docs").await;
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

        let f = MetadataFilter::new()
            .with("user_id", 1)
            .unwrap()
            .with("source", "email")
            .unwrap();
        assert_eq!(idx.delete(&f).await.unwrap(), 1);
        assert_eq!(idx.delete(&f).await.unwrap(), 0);
        let rest = idx.get_all(None).await.unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(idx.get_all(Some(1)).await.unwrap().len(), 1);
        assert!(rest.iter().all(|e| e.metadata.contains_key("added_at")));
    }
}
