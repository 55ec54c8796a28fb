//! Crawler module: per-job pipelines and the run orchestration
//!
//! This module contains the crawl core:
//! - Captcha/blocking gate protocol
//! - Result page parsing into records
//! - The per-job fetch/classify/parse pipeline and its one-deep parse slot
//! - The runner that staggers one pipeline per category

mod captcha;
mod parser;
mod pipeline;
mod runner;

pub use captcha::{CaptchaGate, INDICATOR_PHRASES};
pub use parser::{ParseError, ParsedResults, ResultParser, ShapeMismatch};
pub use pipeline::{CrawlPipeline, JobReport, PipelineStatus};
pub use runner::{JobOutcome, JobRunner};

use crate::config::Config;
use crate::fetch::HttpFetcher;
use crate::Result;

/// Runs every configured job with the crate's HTTP session fetcher
///
/// This is the main entry point for a crawl: it opens one HTTP registry
/// session per job and drives all pipelines to completion.
///
/// # Arguments
///
/// * `config` - The loaded crawl configuration
///
/// # Returns
///
/// One outcome per configured job; per-job failures are recorded in the
/// outcome rather than aborting the run.
pub async fn run_registry_crawl(config: Config) -> Result<Vec<JobOutcome>> {
    let runner = JobRunner::new(&config);
    let registry = config.registry.clone();
    let result_timeout = std::time::Duration::from_secs(config.crawl.result_timeout_secs);
    let outcomes = runner
        .run(|_job| HttpFetcher::new(&registry, result_timeout).map_err(Into::into))
        .await;
    Ok(outcomes)
}
