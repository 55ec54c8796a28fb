//! Job runner: one staggered pipeline per registry category
//!
//! Jobs are fully independent: each owns its session, corpus and output
//! file. One job failing fatally never prevents the others from completing
//! and checkpointing their own corpus. The run is complete only when every
//! job has reached `Done`.

use crate::config::{Config, CrawlConfig, JobEntry, OutputConfig, SelectorConfig};
use crate::crawler::pipeline::{CrawlPipeline, PipelineStatus};
use crate::fetch::PageFetcher;
use crate::{DredgeError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Final state of one job after the run
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub category: String,
    pub unique_records: usize,
    pub pages_parsed: u64,
    /// Populated when the job ended fatally instead of reaching `Done`
    pub error: Option<String>,
}

/// Launches and awaits one crawl pipeline per configured job
pub struct JobRunner {
    crawl: CrawlConfig,
    selectors: SelectorConfig,
    output: OutputConfig,
    jobs: Vec<JobEntry>,
}

impl JobRunner {
    /// Creates a runner from a loaded configuration
    pub fn new(config: &Config) -> Self {
        Self {
            crawl: config.crawl.clone(),
            selectors: config.registry.selectors.clone(),
            output: config.output.clone(),
            jobs: config.jobs.clone(),
        }
    }

    /// Runs every configured job to completion
    ///
    /// `make_fetcher` is called once per job to open that job's own registry
    /// session; sessions are never shared between jobs. Job starts are
    /// staggered by the configured delay so sessions are not established
    /// simultaneously.
    pub async fn run<F, M>(&self, mut make_fetcher: M) -> Vec<JobOutcome>
    where
        F: PageFetcher + 'static,
        M: FnMut(&JobEntry) -> Result<F>,
    {
        let started_at = chrono::Local::now();
        let stagger = Duration::from_millis(self.crawl.stagger_ms);
        let output_dir = PathBuf::from(&self.output.directory);

        tracing::info!(
            jobs = self.jobs.len(),
            started_at = %started_at.format("%Y-%m-%d %H:%M:%S"),
            "starting crawl run"
        );

        let mut handles = Vec::with_capacity(self.jobs.len());
        for (index, job) in self.jobs.iter().enumerate() {
            let category = job.category.clone();

            let pipeline = match make_fetcher(job).and_then(|fetcher| {
                CrawlPipeline::new(
                    job.clone(),
                    self.crawl.clone(),
                    &self.selectors,
                    &output_dir,
                    fetcher,
                )
            }) {
                Ok(pipeline) => pipeline,
                Err(e) => {
                    tracing::error!(category = %category, error = %e, "could not start job");
                    handles.push((category, None, Some(e.to_string())));
                    continue;
                }
            };

            spawn_status_observer(&category, &pipeline);

            let delay = stagger * index as u32;
            let handle = tokio::spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                pipeline.run().await
            });
            handles.push((category, Some(handle), None));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (category, handle, startup_error) in handles {
            let outcome = match handle {
                None => JobOutcome {
                    category,
                    unique_records: 0,
                    pages_parsed: 0,
                    error: startup_error,
                },
                Some(handle) => match handle.await {
                    Ok(Ok(report)) => JobOutcome {
                        category,
                        unique_records: report.unique_records,
                        pages_parsed: report.pages_parsed,
                        error: None,
                    },
                    Ok(Err(e)) => {
                        tracing::error!(category = %category, error = %e, "job failed");
                        JobOutcome {
                            category,
                            unique_records: 0,
                            pages_parsed: 0,
                            error: Some(e.to_string()),
                        }
                    }
                    Err(e) => {
                        let e = DredgeError::TaskJoin(e);
                        tracing::error!(category = %category, error = %e, "job task lost");
                        JobOutcome {
                            category,
                            unique_records: 0,
                            pages_parsed: 0,
                            error: Some(e.to_string()),
                        }
                    }
                },
            };
            outcomes.push(outcome);
        }

        let finished_at = chrono::Local::now();
        let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
        tracing::info!(
            jobs = outcomes.len(),
            failed,
            finished_at = %finished_at.format("%Y-%m-%d %H:%M:%S"),
            elapsed_secs = (finished_at - started_at).num_seconds(),
            "crawl run finished"
        );

        outcomes
    }
}

/// Logs pipeline status transitions so operational tooling can follow each job
fn spawn_status_observer<F: PageFetcher>(category: &str, pipeline: &CrawlPipeline<F>) {
    let mut status_rx = pipeline.status();
    let category = category.to_string();
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = *status_rx.borrow();
            tracing::trace!(category = %category, ?status, "pipeline status");
            if status == PipelineStatus::AwaitingIntervention {
                tracing::warn!(category = %category, "awaiting manual intervention");
            }
        }
    });
}
