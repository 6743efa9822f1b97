use std::path::PathBuf;
use std::time::Duration;

/// How review pages are fetched within one retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// One request at a time, politeness delay between requests. Lets the
    /// pipeline stop paginating as soon as a page comes back with no reviews.
    Sequential,
    /// All requests in flight at once, the same delay applied after each.
    Concurrent,
}

/// Explicit configuration for one pipeline instance. Every knob lives here;
/// nothing is read from ambient process state except the API key the binary
/// passes in.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub user_agent: String,
    /// Total timeout per HTTP request.
    pub request_timeout: Duration,
    /// Politeness delay applied after every page request. Never skipped.
    pub request_delay: Duration,
    pub fetch_mode: FetchMode,
    /// Yelp Fusion bearer credential. Without it the record is built from
    /// page data only.
    pub fusion_api_key: Option<String>,
    /// When set, raw HTML, extracted JSON, the final record and both corpora
    /// are written here for inspection. Not part of the contract.
    pub dump_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("quickyelp/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(30),
            request_delay: Duration::from_secs(1),
            fetch_mode: FetchMode::Sequential,
            fusion_api_key: None,
            dump_dir: None,
        }
    }
}
