//! TOML configuration.
//!
//! Every section has defaults, so a config file only needs to name what it
//! changes. API keys are read from the environment (`OPENAI_API_KEY`,
//! `GROQ_API_KEY`), never from the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "./config/daybrief.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub briefing: BriefingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            collection: default_collection(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/daybrief.sqlite")
}
fn default_collection() -> String {
    "daybrief_documents".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    daybrief_core::chunk::DEFAULT_CHUNK_SIZE
}
fn default_overlap() -> usize {
    daybrief_core::chunk::DEFAULT_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_results")]
    pub default_results: usize,
    #[serde(default = "default_recent_days")]
    pub recent_days: i64,
    #[serde(default = "default_scan_limit")]
    pub scan_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_results: default_results(),
            recent_days: default_recent_days(),
            scan_limit: default_scan_limit(),
        }
    }
}

fn default_results() -> usize {
    5
}
fn default_recent_days() -> i64 {
    7
}
fn default_scan_limit() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_embedding_provider() -> String {
    "hash".to_string()
}
fn default_embedding_timeout() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_provider")]
    pub provider: String,
    #[serde(default = "default_completion_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_completion_provider(),
            model: default_completion_model(),
            url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_completion_timeout(),
        }
    }
}

fn default_completion_provider() -> String {
    "disabled".to_string()
}
fn default_completion_model() -> String {
    "llama-3.1-8b-instant".to_string()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_completion_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct BriefingConfig {
    #[serde(default = "default_parallel_units")]
    pub parallel_units: bool,
    #[serde(default = "default_context_documents")]
    pub context_documents: usize,
}

impl Default for BriefingConfig {
    fn default() -> Self {
        Self {
            parallel_units: default_parallel_units(),
            context_documents: default_context_documents(),
        }
    }
}

fn default_parallel_units() -> bool {
    true
}
fn default_context_documents() -> usize {
    10
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate a config from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!(
            "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.overlap,
            config.chunking.chunk_size
        );
    }

    // Validate retrieval
    if config.retrieval.default_results < 1 {
        anyhow::bail!("retrieval.default_results must be >= 1");
    }
    if config.retrieval.recent_days < 0 {
        anyhow::bail!("retrieval.recent_days must be >= 0");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "hash" => {}
        "ollama" | "openai" => {
            if config.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.dims.is_none() {
                anyhow::bail!(
                    "embedding.dims must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, hash, ollama, or openai.",
            other
        ),
    }
    if config.embedding.is_enabled() && config.embedding.dims == Some(0) {
        anyhow::bail!(
            "embedding.dims must be > 0 when provider is '{}'",
            config.embedding.provider
        );
    }

    // Validate completion
    match config.completion.provider.as_str() {
        "disabled" | "ollama" | "openai" | "groq" => {}
        other => anyhow::bail!(
            "Unknown completion provider: '{}'. Must be disabled, ollama, openai, or groq.",
            other
        ),
    }
    if !(0.0..=2.0).contains(&config.completion.temperature) {
        anyhow::bail!("completion.temperature must be in [0.0, 2.0]");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.db.collection, "daybrief_documents");
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.overlap, 50);
        assert_eq!(config.retrieval.default_results, 5);
        assert_eq!(config.embedding.provider, "hash");
        assert_eq!(config.completion.provider, "disabled");
        assert!(config.briefing.parallel_units);
        assert_eq!(config.briefing.context_documents, 10);
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_config(
            r#"
[db]
path = "/tmp/brief.sqlite"

[completion]
provider = "groq"
max_tokens = 512
"#,
        )
        .unwrap();
        assert_eq!(config.db.path, PathBuf::from("/tmp/brief.sqlite"));
        assert_eq!(config.db.collection, "daybrief_documents");
        assert_eq!(config.completion.max_tokens, 512);
        assert!((config.completion.temperature - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rejects_overlap_not_below_chunk_size() {
        let err = parse_config("[chunking]\nchunk_size = 50\noverlap = 50\n").unwrap_err();
        assert!(err.to_string().contains("chunking.overlap"));
    }

    #[test]
    fn test_rejects_unknown_providers() {
        assert!(parse_config("[embedding]\nprovider = \"magic\"\n").is_err());
        assert!(parse_config("[completion]\nprovider = \"magic\"\n").is_err());
    }

    #[test]
    fn test_network_embedder_needs_model() {
        assert!(parse_config("[embedding]\nprovider = \"ollama\"\n").is_err());
        assert!(parse_config(
            "[embedding]\nprovider = \"ollama\"\nmodel = \"nomic-embed-text\"\ndims = 768\n"
        )
        .is_ok());
    }
}
