//! # daybrief
//!
//! A local-first daily briefing engine.
//!
//! Mail, calendar and chat messages are chunked, embedded and stored in
//! SQLite. On request, four analysis units (email, calendar, social,
//! priority) read the user's recent documents, call a chat model, and
//! merge into one prioritized briefing.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────┐
//! │  Messages   │──▶│  Pipeline   │──▶│  SQLite  │
//! │ mail/cal/IM │   │ Chunk+Embed │   │  index   │
//! └─────────────┘   └─────────────┘   └────┬─────┘
//!                                          │
//!                                          ▼
//!                                   ┌──────────────┐
//!                                   │ Orchestrator │──▶ briefing JSON
//!                                   │  4 units+LLM │
//!                                   └──────────────┘
//! ```
//!
//! The domain logic lives in [`daybrief_core`]; this crate adds the
//! SQLite index, HTTP gateways, configuration and the CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_index`] | SQLite-backed vector index |
//! | [`embedding`] | Ollama / OpenAI embedders |
//! | [`completion`] | OpenAI-compatible chat client |
//! | [`service`] | Wiring from config to orchestrator |
//! | [`ingest`] | Message ingestion |
//! | [`search`] | Query, recent, delete |
//! | [`briefing`] | Briefing and single-document analysis |
//! | [`stats`] | Index statistics |

pub mod briefing;
pub mod completion;
pub mod config;
pub mod db;
pub mod embedding;
pub mod ingest;
pub mod migrate;
pub mod search;
pub mod service;
pub mod sqlite_index;
pub mod stats;
