//! Registry-Dredge: exhaustive extraction of capped search registries
//!
//! This crate implements a crawler for search-only web registries that cap the
//! number of results a single page view may expose. It recursively subdivides
//! alphabetic query prefixes until every result page fits under the cap, then
//! parses and deduplicates records into a durable, deterministic checkpoint file.

pub mod config;
pub mod corpus;
pub mod crawler;
pub mod enumerate;
pub mod fetch;

use thiserror::Error;

/// Main error type for Registry-Dredge operations
#[derive(Debug, Error)]
pub enum DredgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Parse error: {0}")]
    Parse(#[from] crawler::ParseError),

    #[error("Corpus error: {0}")]
    Corpus(#[from] corpus::CorpusError),

    #[error("Background parse task panicked or was cancelled: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector in config: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Registry-Dredge operations
pub type Result<T> = std::result::Result<T, DredgeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use corpus::{Deduplicator, Record};
pub use crawler::{CaptchaGate, CrawlPipeline, JobOutcome, PipelineStatus, ResultParser};
pub use enumerate::{PrefixEnumerator, QueryPrefix};
pub use fetch::{FetchError, PageFetcher};
