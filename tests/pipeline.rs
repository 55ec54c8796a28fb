//! End-to-end pipeline tests against a scripted in-memory fetcher
//!
//! These tests drive the full crawl loop - enumeration, classification,
//! captcha gating, the one-deep parse slot and checkpointing - without any
//! network, by scripting what each query prefix returns.

use async_trait::async_trait;
use registry_dredge::config::{
    Config, CrawlConfig, JobEntry, OutputConfig, RegistryConfig, SelectorConfig,
};
use registry_dredge::crawler::{CrawlPipeline, JobRunner, PipelineStatus};
use registry_dredge::fetch::{FetchError, PageFetcher};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn selectors() -> SelectorConfig {
    SelectorConfig {
        name: ".resultName".to_string(),
        address: ".resultAddress".to_string(),
        status: ".resultStatus".to_string(),
        registration_date: ".resultRegistrationDate".to_string(),
        entity_type: ".resultEntityType".to_string(),
        pager_banner: ".pagerBanner".to_string(),
        results_container: ".searchResultsTitle".to_string(),
    }
}

fn crawl_config(result_cap: u64, checkpoint_every: u64) -> CrawlConfig {
    CrawlConfig {
        result_cap,
        checkpoint_every,
        stagger_ms: 0,
        captcha_poll_secs: 1,
        result_timeout_secs: 60,
    }
}

fn job(category: &str, output_file: &str) -> JobEntry {
    JobEntry {
        category: category.to_string(),
        status_filter: "Active".to_string(),
        output_file: output_file.to_string(),
    }
}

fn entry_html(name: &str) -> String {
    format!(
        r#"<div class="resultName">{name}</div>
           <div class="resultAddress">1 Main St</div>
           <div class="resultStatus">Active</div>
           <div class="resultRegistrationDate">2001-05-14</div>
           <div class="resultEntityType">Co-operative with Share</div>"#
    )
}

/// A results page reporting `count` total matches and carrying the given entries
fn results_page(count: u64, names: &[String]) -> String {
    let entries: String = names.iter().map(|n| entry_html(n)).collect();
    format!(
        r#"<html><body>
           <div class="searchResultsTitle">Search Results</div>
           <div class="pagerBanner">total={count};</div>
           {entries}
           </body></html>"#
    )
}

/// A results view with no pager banner: the zero-match signal
fn empty_page() -> String {
    r#"<html><body><div class="searchResultsTitle">Search Results</div></body></html>"#
        .to_string()
}

fn captcha_page() -> String {
    "<html><body>Security check: please verify you are human</body></html>".to_string()
}

/// Scripted registry session: maps each prefix to a fixed page
struct ScriptedFetcher {
    pages: HashMap<String, String>,
    queries: Arc<Mutex<Vec<String>>>,
    /// Serve a captcha page the first time this prefix is submitted
    captcha_once_on: Option<String>,
    pending_after_captcha: Option<String>,
    fail_page_size: bool,
    fail_navigate: bool,
    /// Artificial per-query latency, to overlap fetches with parse tasks
    query_delay: Duration,
    /// When set, record how many checkpoint blocks this file holds at the
    /// moment each query is submitted
    checkpoint_watch: Option<std::path::PathBuf>,
    checkpoint_sizes: Arc<Mutex<Vec<(String, usize)>>>,
    last_prefix: Option<String>,
}

impl ScriptedFetcher {
    fn new(pages: HashMap<String, String>) -> Self {
        Self {
            pages,
            queries: Arc::new(Mutex::new(Vec::new())),
            captcha_once_on: None,
            pending_after_captcha: None,
            fail_page_size: false,
            fail_navigate: false,
            query_delay: Duration::ZERO,
            checkpoint_watch: None,
            checkpoint_sizes: Arc::new(Mutex::new(Vec::new())),
            last_prefix: None,
        }
    }

    fn queries_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.queries)
    }

    fn checkpoint_sizes_handle(&self) -> Arc<Mutex<Vec<(String, usize)>>> {
        Arc::clone(&self.checkpoint_sizes)
    }

    fn page_for(&self, prefix: &str) -> String {
        self.pages.get(prefix).cloned().unwrap_or_else(empty_page)
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn navigate_to_search_form(&mut self) -> Result<(), FetchError> {
        if self.fail_navigate {
            return Err(FetchError::MissingElement {
                selector: "#searchForm".to_string(),
            });
        }
        Ok(())
    }

    async fn configure_for_category(
        &mut self,
        _category: &str,
        _status_filter: &str,
    ) -> Result<(), FetchError> {
        Ok(())
    }

    async fn set_page_size_if_possible(&mut self) -> Result<(), FetchError> {
        if self.fail_page_size {
            return Err(FetchError::MissingElement {
                selector: "select[id*='PageSize']".to_string(),
            });
        }
        Ok(())
    }

    async fn submit_query(&mut self, prefix: &str) -> Result<String, FetchError> {
        if !self.query_delay.is_zero() {
            tokio::time::sleep(self.query_delay).await;
        }
        self.queries.lock().unwrap().push(prefix.to_string());
        self.last_prefix = Some(prefix.to_string());

        if let Some(path) = &self.checkpoint_watch {
            let blocks = std::fs::read_to_string(path)
                .map(|c| c.trim_end().split("\n\n").filter(|b| !b.is_empty()).count())
                .unwrap_or(0);
            self.checkpoint_sizes
                .lock()
                .unwrap()
                .push((prefix.to_string(), blocks));
        }

        if self.captcha_once_on.as_deref() == Some(prefix) {
            self.captcha_once_on = None;
            self.pending_after_captcha = Some(self.page_for(prefix));
            return Ok(captcha_page());
        }
        Ok(self.page_for(prefix))
    }

    async fn refresh(&mut self) -> Result<String, FetchError> {
        if let Some(page) = self.pending_after_captcha.take() {
            return Ok(page);
        }
        match &self.last_prefix {
            Some(prefix) => Ok(self.page_for(prefix)),
            None => Ok(empty_page()),
        }
    }

    fn current_result_count(&self, page_content: &str) -> Option<u64> {
        let start = page_content.find("total=")? + "total=".len();
        let rest = &page_content[start..];
        let end = rest.find(';')?;
        rest[..end].parse().ok()
    }
}

fn names(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix} Entity {i:03}")).collect()
}

fn checkpoint_blocks(path: &Path) -> Vec<String> {
    let content = std::fs::read_to_string(path).unwrap();
    content
        .trim_end()
        .split("\n\n")
        .filter(|b| !b.is_empty())
        .map(|b| b.to_string())
        .collect()
}

/// cap = 200; "A" reports 450 -> next query "AA"; "AZ" reports 0 -> next "B";
/// "B" reports 37 well-formed entries -> 37 records and next query "C".
#[tokio::test]
async fn test_subdivision_scenario_cap_200() {
    let mut pages = HashMap::new();
    // Capped page carries entries that must never be accepted
    pages.insert("A".to_string(), results_page(450, &names("Capped", 5)));
    pages.insert("B".to_string(), results_page(37, &names("B", 37)));

    let dir = tempfile::tempdir().unwrap();
    let fetcher = ScriptedFetcher::new(pages);
    let queries = fetcher.queries_handle();

    let pipeline = CrawlPipeline::new(
        job("Not-for-Profit Corporation", "nfp.txt"),
        crawl_config(200, 10),
        &selectors(),
        dir.path(),
        fetcher,
    )
    .unwrap();
    let status = pipeline.status();

    let report = pipeline.run().await.unwrap();

    let queries = queries.lock().unwrap();
    assert_eq!(queries[0], "A");
    assert_eq!(queries[1], "AA", "capped page must subdivide, not advance");

    let az_pos = queries.iter().position(|q| q == "AZ").unwrap();
    assert_eq!(queries[az_pos + 1], "B", "zero matches advances laterally");

    let b_pos = queries.iter().position(|q| q == "B").unwrap();
    assert_eq!(queries[b_pos + 1], "C", "under-cap page advances");

    assert_eq!(report.unique_records, 37);
    assert_eq!(report.pages_parsed, 1);
    assert_eq!(*status.borrow(), PipelineStatus::Done);

    // No record from the capped page may appear in the output
    let blocks = checkpoint_blocks(&dir.path().join("nfp.txt"));
    assert_eq!(blocks.len(), 37);
    assert!(blocks.iter().all(|b| !b.contains("Capped")));
}

#[tokio::test]
async fn test_every_prefix_issued_exactly_once() {
    let mut pages = HashMap::new();
    pages.insert("A".to_string(), results_page(450, &[]));

    let dir = tempfile::tempdir().unwrap();
    let fetcher = ScriptedFetcher::new(pages);
    let queries = fetcher.queries_handle();

    let pipeline = CrawlPipeline::new(
        job("Co-operative with Share", "coop.txt"),
        crawl_config(200, 10),
        &selectors(),
        dir.path(),
        fetcher,
    )
    .unwrap();
    pipeline.run().await.unwrap();

    let queries = queries.lock().unwrap();
    // A subdivided into AA..AZ, plus the remaining top level: 1 + 26 + 25
    assert_eq!(queries.len(), 52);
    let mut sorted = queries.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), queries.len(), "no prefix repeated");
}

#[tokio::test]
async fn test_duplicates_across_pages_collapse() {
    let shared = "Shared Entity".to_string();
    let mut pages = HashMap::new();
    pages.insert(
        "A".to_string(),
        results_page(2, &[shared.clone(), "Alpha Co".to_string()]),
    );
    pages.insert(
        "B".to_string(),
        results_page(2, &[shared.clone(), "Beta Co".to_string()]),
    );

    let dir = tempfile::tempdir().unwrap();
    let pipeline = CrawlPipeline::new(
        job("Co-operative Non-Share", "nonshare.txt"),
        crawl_config(200, 10),
        &selectors(),
        dir.path(),
        ScriptedFetcher::new(pages),
    )
    .unwrap();

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.unique_records, 3);

    let blocks = checkpoint_blocks(&dir.path().join("nonshare.txt"));
    assert_eq!(blocks.len(), 3);
}

/// Two runs whose pages arrive in a different prefix order must produce
/// byte-identical checkpoints.
#[tokio::test]
async fn test_checkpoint_deterministic_across_arrival_orders() {
    let set_one = names("One", 4);
    let set_two = names("Two", 4);

    let run = |first: Vec<String>, second: Vec<String>, delay_ms: u64| async move {
        let mut pages = HashMap::new();
        pages.insert("A".to_string(), results_page(4, &first));
        pages.insert("M".to_string(), results_page(4, &second));

        let dir = tempfile::tempdir().unwrap();
        let mut fetcher = ScriptedFetcher::new(pages);
        fetcher.query_delay = Duration::from_millis(delay_ms);

        let pipeline = CrawlPipeline::new(
            job("Not-for-Profit Corporation", "out.txt"),
            crawl_config(200, 1),
            &selectors(),
            dir.path(),
            fetcher,
        )
        .unwrap();
        pipeline.run().await.unwrap();
        std::fs::read(dir.path().join("out.txt")).unwrap()
    };

    let forward = run(set_one.clone(), set_two.clone(), 0).await;
    let reversed = run(set_two, set_one, 3).await;
    assert_eq!(forward, reversed);
}

/// With checkpoint cadence 1, page N's parse task writes a checkpoint when
/// it ends, and the join barrier runs before page N+1's parse task spawns.
/// So by the time the query for prefix N+2 is submitted, page N's records
/// must already be on disk - even though the fetch for N+1 overlapped page
/// N's parse. A second parse task in flight would break this ordering.
#[tokio::test]
async fn test_parse_join_barrier_orders_checkpoints() {
    // Large pages so a parse task takes long enough to overlap the next fetch
    let mut pages = HashMap::new();
    pages.insert("A".to_string(), results_page(300, &names("A", 300)));
    pages.insert("B".to_string(), results_page(300, &names("B", 300)));
    // A third parsed page so "B"'s task hits the join barrier before drain
    pages.insert("C".to_string(), results_page(10, &names("C", 10)));

    let dir = tempfile::tempdir().unwrap();
    let mut fetcher = ScriptedFetcher::new(pages);
    fetcher.checkpoint_watch = Some(dir.path().join("out.txt"));
    let sizes = fetcher.checkpoint_sizes_handle();

    let pipeline = CrawlPipeline::new(
        job("Not-for-Profit Corporation", "out.txt"),
        crawl_config(1000, 1),
        &selectors(),
        dir.path(),
        fetcher,
    )
    .unwrap();
    let report = pipeline.run().await.unwrap();
    assert_eq!(report.unique_records, 610);

    let sizes = sizes.lock().unwrap();
    let blocks_at = |prefix: &str| {
        sizes
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, blocks)| *blocks)
            .unwrap()
    };

    assert_eq!(blocks_at("A"), 0);
    // "A" was parsed and joined before "B"'s parse task could start, so its
    // checkpoint precedes the "C" query; likewise "B" precedes "D"
    assert!(blocks_at("C") >= 300, "page A not checkpointed before query C");
    assert!(blocks_at("D") >= 600, "page B not checkpointed before query D");

    // Checkpoint growth is monotonic across the whole run
    let observed: Vec<usize> = sizes.iter().map(|(_, blocks)| *blocks).collect();
    let mut sorted = observed.clone();
    sorted.sort_unstable();
    assert_eq!(observed, sorted);
}

#[tokio::test]
async fn test_captcha_blocks_then_resumes() {
    let mut pages = HashMap::new();
    pages.insert("C".to_string(), results_page(2, &names("C", 2)));

    let dir = tempfile::tempdir().unwrap();
    let mut fetcher = ScriptedFetcher::new(pages);
    fetcher.captcha_once_on = Some("C".to_string());

    let pipeline = CrawlPipeline::new(
        job("Not-for-Profit Corporation", "out.txt"),
        crawl_config(200, 10),
        &selectors(),
        dir.path(),
        fetcher,
    )
    .unwrap();

    let report = pipeline.run().await.unwrap();
    // The challenge cleared and the page behind it was still collected
    assert_eq!(report.unique_records, 2);
}

#[tokio::test]
async fn test_page_size_failure_is_non_fatal() {
    let mut pages = HashMap::new();
    pages.insert("A".to_string(), results_page(3, &names("A", 3)));

    let dir = tempfile::tempdir().unwrap();
    let mut fetcher = ScriptedFetcher::new(pages);
    fetcher.fail_page_size = true;

    let pipeline = CrawlPipeline::new(
        job("Not-for-Profit Corporation", "out.txt"),
        crawl_config(200, 10),
        &selectors(),
        dir.path(),
        fetcher,
    )
    .unwrap();

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.unique_records, 3);
}

#[tokio::test]
async fn test_empty_registry_writes_empty_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = CrawlPipeline::new(
        job("Not-for-Profit Corporation", "out.txt"),
        crawl_config(200, 10),
        &selectors(),
        dir.path(),
        ScriptedFetcher::new(HashMap::new()),
    )
    .unwrap();

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.unique_records, 0);

    let content = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert!(content.is_empty());
}

/// The subdivision algorithm must remain correct under any cap >= 1: with
/// cap 1, every non-empty page is capped, so only zero-match leaves are
/// accepted and the traversal still terminates.
#[tokio::test]
async fn test_cap_of_one_terminates() {
    let mut pages = HashMap::new();
    pages.insert("A".to_string(), results_page(1, &names("A", 1)));
    pages.insert("AA".to_string(), results_page(1, &names("A", 1)));

    let dir = tempfile::tempdir().unwrap();
    let fetcher = ScriptedFetcher::new(pages);
    let queries = fetcher.queries_handle();

    let pipeline = CrawlPipeline::new(
        job("Not-for-Profit Corporation", "out.txt"),
        crawl_config(1, 10),
        &selectors(),
        dir.path(),
        fetcher,
    )
    .unwrap();

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.unique_records, 0);
    // A -> AA -> AAA (empty) .. and the rest of the space, all finite
    assert!(queries.lock().unwrap().len() > 52);
}

#[tokio::test]
async fn test_runner_isolates_job_failures() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        crawl: crawl_config(200, 10),
        registry: RegistryConfig {
            base_url: "https://registry.example.gov/search".to_string(),
            page_size_value: "4".to_string(),
            selectors: selectors(),
        },
        output: OutputConfig {
            directory: dir.path().to_string_lossy().into_owned(),
        },
        jobs: vec![
            job("Good Category", "good.txt"),
            job("Bad Category", "bad.txt"),
        ],
    };

    let runner = JobRunner::new(&config);
    let outcomes = runner
        .run(|entry| {
            let mut pages = HashMap::new();
            pages.insert("G".to_string(), results_page(2, &names("G", 2)));
            let mut fetcher = ScriptedFetcher::new(pages);
            fetcher.fail_navigate = entry.category == "Bad Category";
            Ok(fetcher)
        })
        .await;

    assert_eq!(outcomes.len(), 2);

    let good = outcomes.iter().find(|o| o.category == "Good Category").unwrap();
    assert!(good.error.is_none());
    assert_eq!(good.unique_records, 2);
    assert!(dir.path().join("good.txt").exists());

    let bad = outcomes.iter().find(|o| o.category == "Bad Category").unwrap();
    assert!(bad.error.is_some());
    assert!(!dir.path().join("bad.txt").exists());
}
