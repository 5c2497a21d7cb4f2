use crate::crawler::Direction;
use serde::Deserialize;

/// Main configuration structure for wrapscan
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub boundary: BoundaryConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// The listing endpoint and the identifier format it exposes
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServiceConfig {
    /// Listing URL without the page parameter
    pub base_url: String,

    /// Name of the query parameter carrying the page number
    #[serde(default = "default_page_param")]
    pub page_param: String,

    /// Constant prefix of every identifier (e.g. "EFTA")
    #[serde(default = "default_item_tag")]
    pub item_tag: String,

    /// File extension following the identifier in link targets
    #[serde(default = "default_item_extension")]
    pub item_extension: String,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Sequential crawl behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// First page of a fresh crawl
    #[serde(default)]
    pub start_page: i64,

    /// Last page to visit (inclusive)
    pub end_page: i64,

    /// Pages between checkpoint writes
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: u32,

    /// Minimum time between two requests (milliseconds)
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts per page before a transient failure becomes final
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay; doubled on every further attempt (milliseconds)
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Rounds of re-fetching failed pages after the main pass
    #[serde(default = "default_max_retry_rounds")]
    pub max_retry_rounds: u32,

    /// Stop early after this many consecutive pages without new items
    #[serde(default)]
    pub stop_after_without_new: Option<u32>,
}

/// Boundary search defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BoundaryConfig {
    /// A page known to answer
    #[serde(default)]
    pub anchor: i64,

    #[serde(default)]
    pub direction: Direction,

    /// Largest page magnitude the exponential phase may probe, as a decimal
    /// string so it can exceed the TOML integer range
    #[serde(default)]
    pub probe_ceiling: Option<String>,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            anchor: 0,
            direction: Direction::Up,
            probe_ceiling: None,
        }
    }
}

/// Output file names, relative to the output directory
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: String,

    #[serde(default = "default_checkpoint_file")]
    pub checkpoint_file: String,

    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,

    #[serde(default = "default_index_file")]
    pub index_file: String,

    #[serde(default = "default_boundary_file")]
    pub boundary_file: String,

    #[serde(default = "default_probe_file")]
    pub probe_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            checkpoint_file: default_checkpoint_file(),
            manifest_file: default_manifest_file(),
            index_file: default_index_file(),
            boundary_file: default_boundary_file(),
            probe_file: default_probe_file(),
        }
    }
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_item_tag() -> String {
    "EFTA".to_string()
}

fn default_item_extension() -> String {
    ".pdf".to_string()
}

fn default_checkpoint_interval() -> u32 {
    50
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_max_retry_rounds() -> u32 {
    3
}

fn default_output_directory() -> String {
    "manifests".to_string()
}

fn default_checkpoint_file() -> String {
    "scraper_checkpoint.json".to_string()
}

fn default_manifest_file() -> String {
    "manifest.txt".to_string()
}

fn default_index_file() -> String {
    "pagination_index.json".to_string()
}

fn default_boundary_file() -> String {
    "pagination_boundary.json".to_string()
}

fn default_probe_file() -> String {
    "probe_results.json".to_string()
}
