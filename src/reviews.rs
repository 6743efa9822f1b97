use std::collections::BTreeMap;

use serde_json::Value;

use crate::extract::json_path;
use crate::text::clean;

/// Fixed scan window: Yelp renders at most ten reviews per page.
pub const REVIEW_SCAN_WINDOW: usize = 10;

const REVIEW_FEED: [&str; 5] = [
    "legacyProps",
    "bizDetailsProps",
    "bizDetailsPageProps",
    "reviewFeedQueryProps",
    "reviews",
];

/// Outcome of scanning one page's review slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageScan {
    /// At least one slot yielded a review.
    Extracted(usize),
    /// All slots failed. There are no more reviews, stop paginating. This is
    /// a termination signal, not an error, and is deliberately distinct from
    /// a transport failure (which must not stop pagination).
    Exhausted,
}

/// Reviews grouped by rating. Keys are canonically the rating's string form
/// ("1".."5"); order within a bucket is discovery order.
#[derive(Debug, Clone, Default)]
pub struct ReviewBuckets {
    buckets: BTreeMap<String, Vec<String>>,
}

impl ReviewBuckets {
    pub fn push(&mut self, rating: String, text: String) {
        self.buckets.entry(rating).or_default().push(text);
    }

    pub fn get(&self, rating: &str) -> Option<&[String]> {
        self.buckets.get(rating).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn total(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Buckets from "5" down to "1", skipping empty ratings.
    pub fn iter_descending(&self) -> impl Iterator<Item = (&str, &[String])> {
        ["5", "4", "3", "2", "1"]
            .into_iter()
            .filter_map(|rating| self.get(rating).map(|reviews| (rating, reviews)))
    }

    /// Scan one page's review slots, appending cleaned comment text to the
    /// bucket for each rating found. Failed slots are skipped silently.
    pub fn scan_page(&mut self, payload: &Value) -> PageScan {
        let mut extracted = 0;

        for slot in 0..REVIEW_SCAN_WINDOW {
            let idx = slot.to_string();
            let Some(review) = json_path(payload, &review_path(&idx)) else {
                continue;
            };
            let Some(rating) = review["rating"].as_i64() else {
                continue;
            };
            let Some(comment) = json_path(review, &["comment", "text"]).and_then(Value::as_str)
            else {
                continue;
            };

            self.push(rating.to_string(), clean(comment));
            extracted += 1;
        }

        if extracted == 0 {
            PageScan::Exhausted
        } else {
            PageScan::Extracted(extracted)
        }
    }
}

fn review_path<'a>(idx: &'a str) -> [&'a str; 6] {
    [
        REVIEW_FEED[0],
        REVIEW_FEED[1],
        REVIEW_FEED[2],
        REVIEW_FEED[3],
        REVIEW_FEED[4],
        idx,
    ]
}

// ── Tests ──
