//! Crawl pipeline: one job's fetch/classify/parse loop
//!
//! The pipeline drives the prefix enumerator against the registry:
//!
//! ```text
//! Searching -> AwaitingPage -> CaptchaCheck -> Classifying
//!     -> {Subdividing | Advancing} -> (loop) -> Draining -> Done
//! ```
//!
//! Parsing and deduplication run on a single background task while the main
//! loop already issues the next fetch, hiding network latency behind parse
//! work. The pipeline is one deep: before a new parse task starts, the
//! previous one is joined, so the corpus and its checkpoint file never see
//! two writers at once, and page N is fully inserted before page N+1's parse
//! begins.

use crate::config::{CrawlConfig, JobEntry, SelectorConfig};
use crate::corpus::{CorpusError, Deduplicator};
use crate::crawler::captcha::CaptchaGate;
use crate::crawler::parser::ResultParser;
use crate::enumerate::{PrefixEnumerator, Step};
use crate::fetch::PageFetcher;
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Observable pipeline state
///
/// `AwaitingIntervention` is the captcha wait: operational tooling can watch
/// for it rather than inferring a stall from silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    Searching,
    AwaitingPage,
    CaptchaCheck,
    AwaitingIntervention,
    Classifying,
    Subdividing,
    Advancing,
    Draining,
    Done,
}

/// Summary of one finished crawl job
#[derive(Debug, Clone)]
pub struct JobReport {
    pub category: String,
    pub unique_records: usize,
    pub pages_parsed: u64,
    pub prefixes_issued: u64,
}

/// Orchestrates one crawl job against one registry session
pub struct CrawlPipeline<F: PageFetcher> {
    job: JobEntry,
    crawl: CrawlConfig,
    fetcher: F,
    enumerator: PrefixEnumerator,
    parser: Arc<ResultParser>,
    gate: CaptchaGate,
    dedup: Arc<Mutex<Deduplicator>>,
    output_path: PathBuf,
    status_tx: watch::Sender<PipelineStatus>,
    status_rx: watch::Receiver<PipelineStatus>,
}

impl<F: PageFetcher> CrawlPipeline<F> {
    /// Creates a pipeline for one job
    ///
    /// # Arguments
    ///
    /// * `job` - The category, status filter and output file for this job
    /// * `crawl` - Cap, checkpoint cadence and captcha poll interval
    /// * `selectors` - Field selectors for the result parser
    /// * `output_dir` - Directory receiving the job's checkpoint file
    /// * `fetcher` - The job's own registry session
    pub fn new(
        job: JobEntry,
        crawl: CrawlConfig,
        selectors: &SelectorConfig,
        output_dir: &Path,
        fetcher: F,
    ) -> Result<Self> {
        let parser = Arc::new(ResultParser::new(selectors)?);
        let gate = CaptchaGate::new(Duration::from_secs(crawl.captcha_poll_secs));
        let output_path = output_dir.join(&job.output_file);
        let (status_tx, status_rx) = watch::channel(PipelineStatus::Searching);

        Ok(Self {
            job,
            crawl,
            fetcher,
            enumerator: PrefixEnumerator::new(),
            parser,
            gate,
            dedup: Arc::new(Mutex::new(Deduplicator::new())),
            output_path,
            status_tx,
            status_rx,
        })
    }

    /// A receiver that observes pipeline status transitions
    pub fn status(&self) -> watch::Receiver<PipelineStatus> {
        self.status_rx.clone()
    }

    fn set_status(&self, status: PipelineStatus) {
        // Receivers may all be dropped; the pipeline does not care
        let _ = self.status_tx.send(status);
    }

    /// Runs the job to exhaustion of the prefix space
    ///
    /// Terminates only when the enumerator is done (or a fatal error occurs);
    /// the sole unbounded suspension is the captcha wait.
    pub async fn run(mut self) -> Result<JobReport> {
        tracing::info!(category = %self.job.category, "starting crawl job");

        // Session establishment: open the form, clear any greeting
        // challenge, then configure category and status filter
        self.set_status(PipelineStatus::Searching);
        self.fetcher.navigate_to_search_form().await?;
        let mut landing = self.fetcher.refresh().await?;
        self.captcha_check(&mut landing).await?;
        self.fetcher
            .configure_for_category(&self.job.category, &self.job.status_filter)
            .await?;

        let cap = self.crawl.result_cap;
        let mut page_size_adjusted = false;
        let mut prev_parse: Option<JoinHandle<std::result::Result<(), CorpusError>>> = None;
        let mut pages_parsed: u64 = 0;
        let mut pages_since_checkpoint: u64 = 0;

        while let Some(prefix) = self.enumerator.current().cloned() {
            self.set_status(PipelineStatus::Searching);
            tracing::debug!(category = %self.job.category, prefix = %prefix, "submitting query");

            self.set_status(PipelineStatus::AwaitingPage);
            let mut content = self.fetcher.submit_query(prefix.as_str()).await?;

            self.captcha_check(&mut content).await?;

            // One-time, opportunistic page-size raise on the first result
            // view; the subdivision algorithm is correct under any cap, so a
            // failure here only costs throughput
            if !page_size_adjusted {
                page_size_adjusted = true;
                match self.fetcher.set_page_size_if_possible().await {
                    Ok(()) => {
                        content = self.fetcher.refresh().await?;
                        tracing::debug!(category = %self.job.category, "page size raised");
                    }
                    Err(e) => {
                        tracing::warn!(
                            category = %self.job.category,
                            error = %e,
                            "could not raise page size, continuing with site default"
                        );
                    }
                }
            }

            self.set_status(PipelineStatus::Classifying);
            let observed = self.fetcher.current_result_count(&content);

            // Pages worth parsing carry a positive count under the cap. A
            // capped page is known incomplete and its records are never
            // accepted; zero or unreadable counts carry nothing.
            if let Some(count) = observed.filter(|&c| c > 0 && c < cap) {
                // Join barrier: page N's records are fully inserted before
                // page N+1's parse task starts. At most one parse task is
                // ever in flight.
                if let Some(handle) = prev_parse.take() {
                    handle.await??;
                }

                pages_parsed += 1;
                pages_since_checkpoint += 1;
                let checkpoint_now = pages_since_checkpoint >= self.crawl.checkpoint_every;
                if checkpoint_now {
                    pages_since_checkpoint = 0;
                }

                let parser = Arc::clone(&self.parser);
                let dedup = Arc::clone(&self.dedup);
                let checkpoint_path = checkpoint_now.then(|| self.output_path.clone());
                let category = self.job.category.clone();
                let prefix_str = prefix.to_string();
                prev_parse = Some(tokio::task::spawn_blocking(move || {
                    parse_and_insert(
                        &parser,
                        &dedup,
                        &content,
                        count,
                        &prefix_str,
                        &category,
                        checkpoint_path.as_deref(),
                    )
                }));
            }

            // The fetch for the next prefix overlaps any parse task above
            match self.enumerator.step(observed, cap) {
                Step::Subdivided => {
                    tracing::debug!(
                        category = %self.job.category,
                        prefix = %prefix,
                        ?observed,
                        cap,
                        "capped result set, subdividing"
                    );
                    self.set_status(PipelineStatus::Subdividing);
                }
                Step::Advanced | Step::Finished => {
                    tracing::debug!(
                        category = %self.job.category,
                        prefix = %prefix,
                        ?observed,
                        "advancing"
                    );
                    self.set_status(PipelineStatus::Advancing);
                }
            }
        }

        // Wait for the last outstanding parse, then write the final checkpoint
        self.set_status(PipelineStatus::Draining);
        if let Some(handle) = prev_parse.take() {
            handle.await??;
        }

        let unique_records = {
            let dedup = self.dedup.lock().unwrap();
            dedup.checkpoint(&self.output_path)?;
            dedup.len()
        };

        self.set_status(PipelineStatus::Done);
        tracing::info!(
            category = %self.job.category,
            unique_records,
            pages_parsed,
            output = %self.output_path.display(),
            "crawl job complete"
        );

        Ok(JobReport {
            category: self.job.category.clone(),
            unique_records,
            pages_parsed,
            prefixes_issued: self.enumerator.issued(),
        })
    }

    /// Runs the captcha gate over freshly fetched content
    async fn captcha_check(&mut self, content: &mut String) -> Result<()> {
        self.set_status(PipelineStatus::CaptchaCheck);
        if CaptchaGate::is_blocked(content) {
            self.set_status(PipelineStatus::AwaitingIntervention);
            self.gate.clear(&mut self.fetcher, content).await?;
        }
        Ok(())
    }
}

/// Parses a page and inserts its records into the corpus
///
/// Runs on the pipeline's single background slot. The shape mismatch case is
/// reported and the page's best-effort records are kept.
fn parse_and_insert(
    parser: &ResultParser,
    dedup: &Mutex<Deduplicator>,
    content: &str,
    expected: u64,
    prefix: &str,
    category: &str,
    checkpoint_path: Option<&Path>,
) -> std::result::Result<(), CorpusError> {
    let parsed = parser.parse(content, expected);

    if let Some(mismatch) = &parsed.mismatch {
        tracing::warn!(
            category,
            prefix,
            expected = mismatch.expected,
            located = ?mismatch.located,
            "parse shape mismatch, keeping best-effort records"
        );
    }

    let mut dedup = dedup.lock().unwrap();
    let mut fresh = 0usize;
    for record in parsed.records {
        if dedup.insert(record) {
            fresh += 1;
        }
    }
    tracing::debug!(category, prefix, fresh, total = dedup.len(), "records inserted");

    if let Some(path) = checkpoint_path {
        dedup.checkpoint(path)?;
        tracing::debug!(category, checkpoint = %path.display(), "checkpoint written");
    }

    Ok(())
}

// Pipeline behavior is exercised end-to-end against a scripted fetcher in
// tests/pipeline.rs; the pure pieces (enumerator, parser, dedup) carry their
// own unit tests.
