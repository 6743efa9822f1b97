use thiserror::Error;

/// Pipeline error taxonomy. Everything except `NothingRetrieved` is absorbed
/// at the stage that produced it; callers only ever see validation failures
/// (before any network call) or the terminal empty-retrieval case.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("not a supported Yelp business URL: {0}")]
    InvalidUrl(String),
    #[error("location must be 1-250 characters, got {0}")]
    InvalidLocation(usize),
    #[error("query too long: {0} characters (max 200)")]
    QueryTooLong(usize),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("embedded JSON extraction failed: {0}")]
    Extraction(String),
    #[error("directory API call failed: {0}")]
    DirectoryApi(String),
    #[error("no usable data retrieved from any source")]
    NothingRetrieved,
}
