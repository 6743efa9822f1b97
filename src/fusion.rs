use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::record::Location;

const FUSION_BASE: &str = "https://api.yelp.com/v3";
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_MS: u64 = 500;

/// A candidate returned by the match or search endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateList {
    #[serde(default)]
    businesses: Vec<Candidate>,
}

/// Yelp Fusion client. Both endpoints return JSON; failures after retries are
/// reported as `DirectoryApi` errors, which the pipeline absorbs — a missing
/// match is never fatal to a retrieval.
pub struct FusionClient {
    client: reqwest::Client,
    api_key: String,
}

impl FusionClient {
    pub fn new(config: &PipelineConfig, api_key: String) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, api_key })
    }

    /// Business Match: best candidate for a derived name plus a structured
    /// address. Requires the full address; with anything less the endpoint
    /// rejects the query, so we skip the call instead.
    pub async fn match_business(
        &self,
        name: &str,
        location: &Location,
    ) -> Result<Option<Candidate>, PipelineError> {
        let (Some(street), Some(city), Some(region), Some(country)) = (
            location.street.as_deref(),
            location.city.as_deref(),
            location.region.as_deref(),
            location.country.as_deref(),
        ) else {
            info!("address incomplete, skipping business match");
            return Ok(None);
        };

        let value = self
            .get_json(
                &format!("{FUSION_BASE}/businesses/matches"),
                &[
                    ("name", name),
                    ("address1", street),
                    ("city", city),
                    ("state", region),
                    ("country", country),
                    ("limit", "1"),
                    ("match_threshold", "default"),
                ],
            )
            .await?;

        Ok(first_candidate(value))
    }

    /// Business Search: single best match for a free-text term and location.
    pub async fn search_business(
        &self,
        term: &str,
        location: &str,
    ) -> Result<Option<Candidate>, PipelineError> {
        let value = self
            .get_json(
                &format!("{FUSION_BASE}/businesses/search"),
                &[("term", term), ("location", location), ("limit", "1")],
            )
            .await?;

        Ok(first_candidate(value))
    }

    /// Business Details for a matched identifier.
    pub async fn details(&self, id: &str) -> Result<Value, PipelineError> {
        self.get_json(&format!("{FUSION_BASE}/businesses/{id}"), &[])
            .await
    }

    /// GET with bearer auth. Up to three attempts on a non-2xx status; a
    /// transport error gives up immediately.
    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, PipelineError> {
        let mut last_status = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let response = self
                .client
                .get(url)
                .query(query)
                .bearer_auth(&self.api_key)
                .send()
                .await
                .map_err(|e| PipelineError::DirectoryApi(format!("transport error: {e}")))?;

            let status = response.status();
            if status.is_success() {
                return response
                    .json::<Value>()
                    .await
                    .map_err(|e| PipelineError::DirectoryApi(format!("invalid JSON body: {e}")));
            }

            last_status = Some(status);
            if attempt < MAX_ATTEMPTS {
                warn!(%url, %status, attempt, "fusion call failed, retrying");
                tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64)).await;
            }
        }

        Err(PipelineError::DirectoryApi(format!(
            "{url} returned {} after {MAX_ATTEMPTS} attempts",
            last_status.map(|s| s.to_string()).unwrap_or_default()
        )))
    }
}

fn first_candidate(value: Value) -> Option<Candidate> {
    serde_json::from_value::<CandidateList>(value)
        .ok()
        .and_then(|list| list.businesses.into_iter().next())
}

// ── Tests ──
