use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;

/// Reviews paginate in steps of ten.
const PAGE_OFFSET_STEP: usize = 10;
const CONCURRENCY: usize = 5;

/// Result of fetching one page: the raw body, or an explicit failure carrying
/// the URL. Never silently coerced to empty content.
#[derive(Debug, Clone)]
pub enum PageFetch {
    Body(String),
    Failed { url: String, reason: String },
}

impl PageFetch {
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Body(b) => Some(b),
            Self::Failed { .. } => None,
        }
    }
}

/// Build the review-page targets for a base URL: the base itself, then one
/// URL per further page with a `start` offset, joined with `&` when the base
/// already carries a query string. A page count of zero still yields the base
/// page — the business details live there.
pub fn page_urls(base: &str, pages: usize) -> Vec<String> {
    let mut urls = vec![base.to_string()];
    let joiner = if base.contains('?') { '&' } else { '?' };
    for page in 1..pages {
        urls.push(format!("{base}{joiner}start={}", page * PAGE_OFFSET_STEP));
    }
    urls
}

/// HTTP page fetcher with a bounded per-request timeout and a politeness
/// delay applied after every request, in both execution modes.
pub struct Fetcher {
    client: reqwest::Client,
    delay: Duration,
}

impl Fetcher {
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            delay: config.request_delay,
        })
    }

    /// Fetch a single URL. A non-2xx status or a transport error becomes a
    /// `PageFetch::Failed` for this URL only. The politeness delay runs after
    /// the request either way.
    pub async fn fetch_one(&self, url: &str) -> PageFetch {
        get_page(&self.client, self.delay, url).await
    }

    /// Fetch every URL concurrently, each request followed by the uniform
    /// politeness delay. Results come back in input order; per-URL failures
    /// do not affect the other fetches.
    pub async fn fetch_concurrent(&self, urls: &[String]) -> Vec<PageFetch> {
        let semaphore = std::sync::Arc::new(tokio::sync::Semaphore::new(CONCURRENCY));
        let pb = page_progress(urls.len());
        let mut tasks = tokio::task::JoinSet::new();

        for (idx, url) in urls.iter().enumerate() {
            let client = self.client.clone();
            let delay = self.delay;
            let url = url.clone();
            let sem = std::sync::Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = sem.acquire().await.expect("semaphore closed");
                (idx, get_page(&client, delay, &url).await)
            });
        }

        let mut results: Vec<Option<PageFetch>> = vec![None; urls.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, fetch)) => {
                    results[idx] = Some(fetch);
                    pb.inc(1);
                }
                Err(e) => warn!("fetch task panicked: {e}"),
            }
        }
        pb.finish_and_clear();

        results
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| {
                slot.unwrap_or_else(|| PageFetch::Failed {
                    url: urls[idx].clone(),
                    reason: "fetch task aborted".to_string(),
                })
            })
            .collect()
    }
}

async fn get_page(client: &reqwest::Client, delay: Duration, url: &str) -> PageFetch {
    debug!(url, "requesting page");
    let result = match try_get(client, url).await {
        Ok(body) => PageFetch::Body(body),
        Err(e) => {
            warn!("{e}");
            PageFetch::Failed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    tokio::time::sleep(delay).await;
    result
}

async fn try_get(client: &reqwest::Client, url: &str) -> Result<String, PipelineError> {
    let fetch_err = |reason: String| PipelineError::Fetch {
        url: url.to_string(),
        reason,
    };

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| fetch_err(format!("transport error: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fetch_err(format!("status code {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| fetch_err(format!("body read failed: {e}")))
}

fn page_progress(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} pages")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb
}

// ── Tests ──
