use serde_json::Value;

use crate::record::BusinessRecord;
use crate::reviews::ReviewBuckets;

/// The two corpora handed to the QA engine: business facts and reviews, kept
/// strictly separate. Produced once per retrieval and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusPair {
    pub business_info: String,
    pub reviews: String,
}

const INFO_PREAMBLE: &str = "You are QuickYelp, a chatbot which is able to answer questions about a given Yelp business. \n\
The content provided is the background context/information of the business/restaurant that can be found on the Yelp page. \n\
Beware: some content is formatted in JSON format.\n\n";

const REVIEWS_PREAMBLE: &str = "You are QuickYelp, a chatbot which is able to answer questions about a given Yelp business. \n\
The content provided is the reviews of the business/restaurant from the experience of Yelp users who have visited the service.\n\
Think of ratings from 4-5 stars as positive, and 1-3 stars as negative.\n\n";

const NO_REVIEWS_SENTINEL: &str =
    "The reviews are not provided at all. This is a MAJOR error!";

/// Render both corpora. Pure function of the finalized record and buckets;
/// re-running it produces byte-identical output.
pub fn render(record: &BusinessRecord, reviews: &ReviewBuckets) -> CorpusPair {
    CorpusPair {
        business_info: render_business_info(record),
        reviews: render_reviews(reviews),
    }
}

fn render_business_info(record: &BusinessRecord) -> String {
    let mut out = String::from(INFO_PREAMBLE);
    out.push_str("You are provided the following information about the business:\n");

    push_field(&mut out, "The name/title of the business is", record.name.as_deref());
    push_field(
        &mut out,
        "The background history/origin of the business is",
        record.history.as_deref(),
    );
    push_field(&mut out, "The specialties are", record.specialties.as_deref());
    push_field(
        &mut out,
        "The business location (address, city, state, country) is listed as",
        record.location.as_ref().map(|l| l.to_string()).as_deref(),
    );
    push_field(&mut out, "The contact/phone number is", record.phone.as_deref());
    push_field(
        &mut out,
        "The categories are",
        record.categories.as_ref().map(|c| c.join(", ")).as_deref(),
    );
    push_field(
        &mut out,
        "The overall rating of the business calculated by Yelp reviews is",
        record.overall_rating.map(|r| r.to_string()).as_deref(),
    );
    push_field(
        &mut out,
        "The price range in dollars/Yelp dollar signs of their items/menu is",
        record.price_range.as_deref(),
    );
    push_hours(&mut out, record.hours.as_ref(), record.is_open_now);
    push_field(
        &mut out,
        "The transaction methods the business offers are",
        record.transactions.as_ref().map(|t| t.join(", ")).as_deref(),
    );

    out.push_str("\n\n");
    out
}

fn push_field(out: &mut String, label: &str, value: Option<&str>) {
    match value {
        Some(v) => out.push_str(&format!("{label}: \"{v}\".\n")),
        None => out.push_str(&format!("{label} not provided by the business.\n")),
    }
}

fn push_hours(out: &mut String, hours: Option<&Value>, is_open_now: Option<bool>) {
    let label = "The hours of operation are";
    match hours {
        Some(h) => {
            let blob = serde_json::to_string(h).unwrap_or_else(|_| h.to_string());
            out.push_str(&format!("{label}: {blob} (formatted in JSON)."));
            if is_open_now == Some(true) {
                out.push_str("The business is open right now.\n");
            } else {
                out.push_str("The business is not open right now.\n");
            }
        }
        None => out.push_str(&format!("{label} not provided by the business.\n")),
    }
}

fn render_reviews(reviews: &ReviewBuckets) -> String {
    let mut out = String::from(REVIEWS_PREAMBLE);

    if reviews.is_empty() {
        out.push_str(NO_REVIEWS_SENTINEL);
        return out;
    }

    // Highest ratings first; the review counter runs across the whole block.
    let mut counter = 1usize;
    for (rating, bucket) in reviews.iter_descending() {
        let sentiment = if rating.parse::<u32>().unwrap_or(0) > 3 {
            "Positive"
        } else {
            "Negative"
        };
        for review in bucket {
            out.push_str(&format!(
                "{rating} Stars ({sentiment}) - Review {counter}: {review}\n"
            ));
            counter += 1;
        }
    }

    out
}

// ── Tests ──
