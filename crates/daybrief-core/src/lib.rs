//! # Daybrief Core
//!
//! Runtime-agnostic logic for daybrief: data models, chunking, metadata
//! filters, the embedding and completion gateway traits, the vector index
//! abstraction, the retrieval pipeline, analysis units, and the briefing
//! orchestrator.
//!
//! This crate contains no sqlx, HTTP client, or filesystem I/O. The
//! `daybrief` app crate supplies the SQLite index and network gateways.
//!
//! ```text
//!  IngestMessage ─► RetrievalPipeline ─► Chunker ─► VectorIndex ◄─ Embedder
//!                          │
//!                          ▼
//!                    Orchestrator ─► Analyst ×3 ─► PriorityAnalyst ◄─ CompletionModel
//! ```

pub mod agents;
pub mod chunk;
pub mod completion;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod format;
pub mod messages;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod store;
pub mod tools;

pub use error::{Error, Result};
