use serde::Deserialize;

/// Main configuration structure for Registry-Dredge
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub registry: RegistryConfig,
    pub output: OutputConfig,
    #[serde(rename = "job", default)]
    pub jobs: Vec<JobEntry>,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Result count at or above which a query is considered capped and must
    /// be subdivided
    #[serde(rename = "result-cap")]
    pub result_cap: u64,

    /// Write a checkpoint after this many parsed pages
    #[serde(rename = "checkpoint-every", default = "default_checkpoint_every")]
    pub checkpoint_every: u64,

    /// Delay between starting consecutive jobs (milliseconds)
    #[serde(rename = "stagger-ms", default = "default_stagger_ms")]
    pub stagger_ms: u64,

    /// Interval between captcha re-checks (seconds)
    #[serde(rename = "captcha-poll-secs", default = "default_captcha_poll_secs")]
    pub captcha_poll_secs: u64,

    /// Upper bound on waiting for a results view to come back (seconds)
    #[serde(rename = "result-timeout-secs", default = "default_result_timeout_secs")]
    pub result_timeout_secs: u64,
}

/// Registry site configuration: where the search form lives and how result
/// fields are located on a result page
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the registry search form
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Form option value that selects the largest supported page size
    #[serde(rename = "page-size-value", default = "default_page_size_value")]
    pub page_size_value: String,

    pub selectors: SelectorConfig,
}

/// CSS selectors locating the five record field groups and the pager banner
/// on a result page
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    pub name: String,
    pub address: String,
    pub status: String,
    #[serde(rename = "registration-date")]
    pub registration_date: String,
    #[serde(rename = "entity-type")]
    pub entity_type: String,

    /// Banner whose text carries the total match count; its absence is the
    /// "no matches" signal
    #[serde(rename = "pager-banner")]
    pub pager_banner: String,

    /// Element that confirms the results view finished loading; present even
    /// for zero-match queries
    #[serde(rename = "results-container")]
    pub results_container: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory that receives per-job checkpoint files
    pub directory: String,
}

/// One crawl job: a registry category with its status filter and output file
#[derive(Debug, Clone, Deserialize)]
pub struct JobEntry {
    /// Registry category to enumerate (e.g. "Not-for-Profit Corporation")
    pub category: String,

    /// Status filter applied when configuring the search form
    #[serde(rename = "status-filter")]
    pub status_filter: String,

    /// Checkpoint file name within the output directory
    #[serde(rename = "output-file")]
    pub output_file: String,
}

fn default_checkpoint_every() -> u64 {
    10
}

fn default_stagger_ms() -> u64 {
    2000
}

fn default_captcha_poll_secs() -> u64 {
    15
}

fn default_result_timeout_secs() -> u64 {
    60
}

fn default_page_size_value() -> String {
    "4".to_string()
}
