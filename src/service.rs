//! Assembles the runtime object graph from configuration.
//!
//! ```text
//! Config ─► SqlitePool ─► SqliteIndex ─┐
//!        ─► Embedder ──────────────────┤
//!        ─► Chunker ───────────────────┴─► RetrievalPipeline ─┐
//!        ─► CompletionModel ───────────────────────────────────┴─► Orchestrator
//! ```
//!
//! Built once per CLI invocation; the pipeline is shared by `Arc`.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

use daybrief_core::chunk::Chunker;
use daybrief_core::orchestrator::{Orchestrator, OrchestratorOptions};
use daybrief_core::pipeline::RetrievalPipeline;

use crate::completion::create_completion_model;
use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::migrate;
use crate::sqlite_index::SqliteIndex;

pub struct Services {
    pub pool: SqlitePool,
    pub pipeline: Arc<RetrievalPipeline>,
    pub orchestrator: Orchestrator,
}

impl Services {
    /// Open the database (creating the schema if needed) and wire every
    /// component.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool)
            .await
            .context("Failed to apply database schema")?;

        let embedder = create_embedder(&config.embedding)?;
        let model = create_completion_model(&config.completion)?;
        debug!(
            embedder = embedder.model_name(),
            model = model.model_name(),
            collection = %config.db.collection,
            "services configured"
        );

        let index = SqliteIndex::new(
            pool.clone(),
            config.db.collection.clone(),
            embedder,
            &config.db.path,
        );
        let chunker = Chunker::new(config.chunking.chunk_size, config.chunking.overlap)?;
        let pipeline = Arc::new(RetrievalPipeline::new(chunker, Arc::new(index)));

        let orchestrator = Orchestrator::new(model)
            .with_pipeline(pipeline.clone())
            .with_options(OrchestratorOptions {
                parallel_units: config.briefing.parallel_units,
                context_documents: config.briefing.context_documents,
                ..OrchestratorOptions::default()
            });

        Ok(Self {
            pool,
            pipeline,
            orchestrator,
        })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
