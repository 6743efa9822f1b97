use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{FetchMode, PipelineConfig};
use crate::error::PipelineError;
use crate::extract;
use crate::fetch::{page_urls, Fetcher, PageFetch};
use crate::format::{render, CorpusPair};
use crate::fusion::FusionClient;
use crate::record::{name_from_url, BusinessRecord};
use crate::reviews::{PageScan, ReviewBuckets};

/// Review-page window for a caller-supplied URL.
pub const MAX_PAGES: usize = 5;
/// Sub-pages re-fetched for a business found through Fusion search.
const SEARCH_SUBPAGES: usize = 3;
pub const MAX_LOCATION_LEN: usize = 250;

static DESKTOP_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?yelp\.com/biz/[\w-]+(?:-\w+)?(?:\?[\w=&-]*)?$").unwrap()
});
static MOBILE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https://m\.yelp\.com/biz/[\w-]+(?:-\w+)?(?:\?.*)?$").unwrap());
static SHORT_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https://yelp\.to/[a-zA-Z0-9]+$").unwrap());

/// Accept desktop, mobile and yelp.to short-link business URLs; reject
/// everything else before any network call.
pub fn validate_url(url: &str) -> Result<(), PipelineError> {
    if DESKTOP_URL_RE.is_match(url) || MOBILE_URL_RE.is_match(url) || SHORT_URL_RE.is_match(url) {
        Ok(())
    } else {
        Err(PipelineError::InvalidUrl(url.to_string()))
    }
}

pub fn validate_location(location: &str) -> Result<(), PipelineError> {
    let len = location.chars().count();
    if (1..=MAX_LOCATION_LEN).contains(&len) {
        Ok(())
    } else {
        Err(PipelineError::InvalidLocation(len))
    }
}

/// Everything one retrieval produced. The record and buckets are final by the
/// time they land here; the corpus pair is rendered exactly once.
pub struct Retrieval {
    pub record: BusinessRecord,
    pub reviews: ReviewBuckets,
    pub corpus: CorpusPair,
    pub summary: String,
    pub pages_ok: usize,
    pub pages_failed: usize,
}

#[derive(Debug, Default)]
struct HarvestStats {
    ok: usize,
    failed: usize,
}

enum PageOutcome {
    Continue,
    /// Review window came back empty: no more reviews exist, stop paginating.
    Stop,
}

/// One scrape-and-normalize pipeline. Owns its HTTP clients; each retrieval
/// owns its record and buckets, so concurrent retrievals share nothing
/// mutable.
pub struct Pipeline {
    config: PipelineConfig,
    fetcher: Fetcher,
    fusion: Option<FusionClient>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let fetcher = Fetcher::new(&config)?;
        let fusion = match &config.fusion_api_key {
            Some(key) => Some(FusionClient::new(&config, key.clone())?),
            None => {
                warn!("no Fusion API key configured, records will be page-derived only");
                None
            }
        };
        Ok(Self {
            config,
            fetcher,
            fusion,
        })
    }

    /// Retrieval from a caller-supplied business URL: harvest up to `pages`
    /// review pages, then enrich via Fusion match + details when the page
    /// data yielded an identity to match on.
    pub async fn scrape_url(&self, base_url: &str, pages: usize) -> Result<Retrieval, PipelineError> {
        validate_url(base_url)?;
        let pages = pages.min(MAX_PAGES);

        let mut record = BusinessRecord {
            source_url: Some(base_url.to_string()),
            ..Default::default()
        };
        let mut buckets = ReviewBuckets::default();
        let stats = self.harvest(base_url, pages, &mut record, &mut buckets).await;

        // The match endpoint needs a name; fall back to the URL slug.
        if record.name.is_none() {
            record.name = name_from_url(base_url);
        }

        let mut details_applied = false;
        if let (Some(fusion), Some(name), Some(location)) =
            (&self.fusion, record.name.clone(), record.location.clone())
        {
            match fusion.match_business(&name, &location).await {
                Ok(Some(candidate)) => {
                    details_applied = self.apply_details_for(fusion, &candidate.id, &mut record).await;
                }
                Ok(None) => info!("no Fusion match for {name}"),
                Err(e) => warn!("Fusion match absorbed: {e}"),
            }
        }

        self.finalize(record, buckets, stats, details_applied)
    }

    /// Retrieval from a free-text name and location: Fusion search picks the
    /// best match, details fill the record, and the matched business's own
    /// page is re-fetched for the fields the API does not supply (history,
    /// specialties, reviews).
    pub async fn search(&self, name: &str, location: &str) -> Result<Retrieval, PipelineError> {
        validate_location(location)?;

        let Some(fusion) = &self.fusion else {
            warn!("search requires a Fusion API key");
            return Err(PipelineError::NothingRetrieved);
        };

        let candidate = match fusion.search_business(name, location).await {
            Ok(Some(candidate)) => candidate,
            Ok(None) => {
                info!("no search match for {name} in {location}");
                return Err(PipelineError::NothingRetrieved);
            }
            Err(e) => {
                warn!("Fusion search absorbed: {e}");
                return Err(PipelineError::NothingRetrieved);
            }
        };

        let mut record = BusinessRecord::default();
        let mut buckets = ReviewBuckets::default();
        let details_applied = self.apply_details_for(fusion, &candidate.id, &mut record).await;

        let page_url = record
            .source_url
            .clone()
            .or(candidate.url)
            .map(|u| canonical_page_url(&u));

        let mut stats = HarvestStats::default();
        if let Some(url) = page_url {
            if record.source_url.is_none() {
                record.source_url = Some(url.clone());
            }
            stats = self
                .harvest(&url, SEARCH_SUBPAGES, &mut record, &mut buckets)
                .await;
        }

        self.finalize(record, buckets, stats, details_applied)
    }

    async fn apply_details_for(
        &self,
        fusion: &FusionClient,
        id: &str,
        record: &mut BusinessRecord,
    ) -> bool {
        match fusion.details(id).await {
            Ok(details) => {
                self.dump("fusion_details.json", &details.to_string());
                record.apply_details(&details);
                true
            }
            Err(e) => {
                warn!("Fusion details absorbed: {e}");
                false
            }
        }
    }

    /// Fetch the review-page window and fold every usable page into the
    /// record and buckets. Transport and extraction failures skip their page;
    /// an exhausted review window ends pagination.
    async fn harvest(
        &self,
        base_url: &str,
        pages: usize,
        record: &mut BusinessRecord,
        buckets: &mut ReviewBuckets,
    ) -> HarvestStats {
        let urls = page_urls(base_url, pages);
        let mut stats = HarvestStats::default();

        match self.config.fetch_mode {
            FetchMode::Sequential => {
                for (idx, url) in urls.iter().enumerate() {
                    let fetch = self.fetcher.fetch_one(url).await;
                    if let PageOutcome::Stop =
                        self.absorb_page(idx, url, &fetch, record, buckets, &mut stats)
                    {
                        break;
                    }
                }
            }
            FetchMode::Concurrent => {
                let fetches = self.fetcher.fetch_concurrent(&urls).await;
                for (idx, (url, fetch)) in urls.iter().zip(&fetches).enumerate() {
                    if let PageOutcome::Stop =
                        self.absorb_page(idx, url, fetch, record, buckets, &mut stats)
                    {
                        break;
                    }
                }
            }
        }

        stats
    }

    fn absorb_page(
        &self,
        idx: usize,
        url: &str,
        fetch: &PageFetch,
        record: &mut BusinessRecord,
        buckets: &mut ReviewBuckets,
        stats: &mut HarvestStats,
    ) -> PageOutcome {
        let Some(body) = fetch.body() else {
            // Transport failures never end pagination; later pages may work.
            stats.failed += 1;
            return PageOutcome::Continue;
        };
        self.dump(&format!("page_{idx}.html"), body);

        let payload = match extract::embedded_json(body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(url, "page contributes no embedded data: {e}");
                stats.failed += 1;
                return PageOutcome::Continue;
            }
        };
        self.dump(&format!("page_{idx}.json"), &payload.to_string());

        record.apply_page(&payload, body);
        stats.ok += 1;

        match buckets.scan_page(&payload) {
            PageScan::Extracted(count) => {
                debug!(url, count, "reviews extracted");
                PageOutcome::Continue
            }
            PageScan::Exhausted => {
                info!(url, "review window empty, ending pagination");
                PageOutcome::Stop
            }
        }
    }

    fn finalize(
        &self,
        mut record: BusinessRecord,
        buckets: ReviewBuckets,
        stats: HarvestStats,
        details_applied: bool,
    ) -> Result<Retrieval, PipelineError> {
        if stats.ok == 0 && !details_applied {
            return Err(PipelineError::NothingRetrieved);
        }

        if record.name.is_none() {
            record.name = record.source_url.as_deref().and_then(name_from_url);
        }

        let corpus = render(&record, &buckets);
        if let Ok(json) = serde_json::to_string_pretty(&record) {
            self.dump("business_record.json", &json);
        }
        self.dump("business_information.txt", &corpus.business_info);
        self.dump("business_reviews.txt", &corpus.reviews);

        let summary = retrieval_summary(&record, &buckets);
        info!(
            pages_ok = stats.ok,
            pages_failed = stats.failed,
            reviews = buckets.total(),
            "retrieval complete"
        );

        Ok(Retrieval {
            record,
            reviews: buckets,
            corpus,
            summary,
            pages_ok: stats.ok,
            pages_failed: stats.failed,
        })
    }

    /// Non-contractual debug artifacts; write failures are logged, never
    /// surfaced.
    fn dump(&self, name: &str, content: &str) {
        let Some(dir) = &self.config.dump_dir else {
            return;
        };
        let write = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(dir.join(name), content));
        if let Err(e) = write {
            warn!("failed to write debug artifact {name}: {e}");
        }
    }
}

/// Strip the tracking query Fusion appends to its business URLs so the
/// pagination parameters start from a clean base.
fn canonical_page_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

/// One-line report of which fields a retrieval captured.
pub fn retrieval_summary(record: &BusinessRecord, reviews: &ReviewBuckets) -> String {
    let captured: Vec<&str> = [
        ("Name", record.name.is_some()),
        ("History/About", record.history.is_some()),
        ("Location", record.location.is_some()),
        ("Phone", record.phone.is_some()),
        ("Hours", record.hours.is_some()),
        ("Reviews", !reviews.is_empty()),
    ]
    .into_iter()
    .filter_map(|(label, present)| present.then_some(label))
    .collect();

    if captured.is_empty() {
        "Notice: data retrieval has failed.".to_string()
    } else {
        format!("Successfully retrieved: {}", captured.join(", "))
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_three_supported_url_shapes() {
        for url in [
            "https://www.yelp.com/biz/example-business",
            "https://www.yelp.com/biz/nick-the-greek-elk-grove-elk-grove",
            "https://www.yelp.com/biz/kikis-chicken-place-sacramento-15?page_src=related_bizes",
            "http://yelp.com/biz/wingstop-opening-soon-sacramento",
            "https://m.yelp.com/biz/world-wrapps-san-ramon?primary_source=biz_details&share_id=4C78CAD6",
            "https://yelp.to/gMUOLofNOg",
        ] {
            assert!(validate_url(url).is_ok(), "should accept {url}");
        }
    }

    #[test]
    fn rejects_everything_else() {
        for url in [
            "https://www.google.com/",
            "https://www.yelp.com/user_details?userid=abc",
            "https://yelp.to/too/many/segments",
            "not a url",
            "",
        ] {
            assert!(matches!(
                validate_url(url),
                Err(PipelineError::InvalidUrl(_))
            ));
        }
    }

    #[test]
    fn location_length_bounds() {
        assert!(validate_location("a").is_ok());
        assert!(validate_location(&"x".repeat(250)).is_ok());
        assert!(matches!(
            validate_location(&"x".repeat(251)),
            Err(PipelineError::InvalidLocation(251))
        ));
        assert!(matches!(
            validate_location(""),
            Err(PipelineError::InvalidLocation(0))
        ));
    }

    #[test]
    fn canonical_page_url_drops_query() {
        assert_eq!(
            canonical_page_url("https://www.yelp.com/biz/example?adjust_creative=xyz&utm_source=api"),
            "https://www.yelp.com/biz/example"
        );
        assert_eq!(canonical_page_url("not a url"), "not a url");
    }

    #[test]
    fn summary_lists_captured_fields() {
        let mut record = BusinessRecord::default();
        let mut buckets = ReviewBuckets::default();
        assert_eq!(
            retrieval_summary(&record, &buckets),
            "Notice: data retrieval has failed."
        );

        record.name = Some("Example".into());
        record.phone = Some("555".into());
        buckets.push("5".into(), "great".into());
        assert_eq!(
            retrieval_summary(&record, &buckets),
            "Successfully retrieved: Name, Phone, Reviews"
        );
    }

    fn test_pipeline() -> Pipeline {
        Pipeline::new(PipelineConfig::default()).unwrap()
    }

    fn page_with_reviews() -> String {
        std::fs::read_to_string("tests/fixtures/example-cafe.html").unwrap()
    }

    #[test]
    fn transport_failure_does_not_stop_pagination() {
        let pipeline = test_pipeline();
        let mut record = BusinessRecord::default();
        let mut buckets = ReviewBuckets::default();
        let mut stats = HarvestStats::default();

        let fetch = PageFetch::Failed {
            url: "https://www.yelp.com/biz/example?start=10".into(),
            reason: "status code 503".into(),
        };
        let outcome = pipeline.absorb_page(
            1,
            "https://www.yelp.com/biz/example?start=10",
            &fetch,
            &mut record,
            &mut buckets,
            &mut stats,
        );
        assert!(matches!(outcome, PageOutcome::Continue));
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.ok, 0);
    }

    #[test]
    fn exhausted_review_window_stops_pagination() {
        let pipeline = test_pipeline();
        let mut record = BusinessRecord::default();
        let mut buckets = ReviewBuckets::default();
        let mut stats = HarvestStats::default();

        // Valid embedded payload, but no reviews in it at all.
        let body = "<!--{\"locale\":\"en_US\",\"legacyProps\":{\"bizDetailsProps\":{\"bizDetailsPageProps\":{\"reviewFeedQueryProps\":{\"reviews\":[]}}}}}-->";
        let fetch = PageFetch::Body(body.to_string());
        let outcome = pipeline.absorb_page(
            0,
            "https://www.yelp.com/biz/example",
            &fetch,
            &mut record,
            &mut buckets,
            &mut stats,
        );
        assert!(matches!(outcome, PageOutcome::Stop));
        // The page itself still counted: its business fields were readable.
        assert_eq!(stats.ok, 1);
    }

    #[test]
    fn page_with_reviews_continues_pagination() {
        let pipeline = test_pipeline();
        let mut record = BusinessRecord::default();
        let mut buckets = ReviewBuckets::default();
        let mut stats = HarvestStats::default();

        let fetch = PageFetch::Body(page_with_reviews());
        let outcome = pipeline.absorb_page(
            0,
            "https://www.yelp.com/biz/example-business",
            &fetch,
            &mut record,
            &mut buckets,
            &mut stats,
        );
        assert!(matches!(outcome, PageOutcome::Continue));
        assert_eq!(stats.ok, 1);
        assert_eq!(buckets.total(), 2);
    }

    #[test]
    fn example_cafe_end_to_end() {
        let body = page_with_reviews();
        let payload = extract::embedded_json(&body).unwrap();

        let mut record = BusinessRecord {
            source_url: Some("https://www.yelp.com/biz/example-business".into()),
            ..Default::default()
        };
        record.apply_page(&payload, &body);
        let mut buckets = ReviewBuckets::default();
        assert_eq!(buckets.scan_page(&payload), PageScan::Extracted(2));

        assert_eq!(record.name.as_deref(), Some("Example Café"));
        assert_eq!(buckets.get("5").unwrap().len(), 1);
        assert_eq!(buckets.get("4").unwrap().len(), 1);
        assert_eq!(record.location.as_ref().unwrap().city.as_deref(), Some("Irvine"));

        let corpus = render(&record, &buckets);
        assert!(corpus
            .business_info
            .contains("The name/title of the business is: \"Example Café\"."));
        let review_lines = corpus
            .reviews
            .lines()
            .filter(|l| l.contains("- Review "))
            .count();
        assert_eq!(review_lines, 2);
    }
}
