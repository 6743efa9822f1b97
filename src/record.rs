use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extract::{json_path, location_fragment, path_str};

/// Path to the "from the business" blurb inside the embedded page JSON.
const BIZ_CONTENT: [&str; 5] = [
    "legacyProps",
    "bizDetailsProps",
    "bizDetailsPageProps",
    "fromTheBusinessProps",
    "fromTheBusinessContentProps",
];

/// Structured address parsed from the page's JSON-LD fragment. Field names
/// follow the schema.org keys Yelp emits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "streetAddress")]
    pub street: Option<String>,
    #[serde(rename = "addressLocality")]
    pub city: Option<String>,
    #[serde(rename = "addressRegion")]
    pub region: Option<String>,
    #[serde(rename = "addressCountry")]
    pub country: Option<String>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [&self.street, &self.city, &self.region, &self.country]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Canonical fact sheet about one business. Every field starts unset and is
/// populated at most once per source: page JSON never overwrites an earlier
/// page, while Fusion details overwrite the fields the API provides.
/// History, specialties and location only ever come from page JSON.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BusinessRecord {
    pub name: Option<String>,
    pub history: Option<String>,
    pub specialties: Option<String>,
    pub location: Option<Location>,
    pub phone: Option<String>,
    pub categories: Option<Vec<String>>,
    pub overall_rating: Option<f64>,
    pub price_range: Option<String>,
    pub hours: Option<Value>,
    pub is_open_now: Option<bool>,
    pub transactions: Option<Vec<String>>,
    pub source_url: Option<String>,
    pub image_url: Option<String>,
}

impl BusinessRecord {
    /// Fold one successfully extracted page into the record. Missing nested
    /// paths leave the field unset; a later page may fill it in.
    pub fn apply_page(&mut self, payload: &Value, raw_body: &str) {
        if self.name.is_none() {
            self.name = content_field(payload, "businessName");
        }
        if self.history.is_none() {
            self.history = content_field(payload, "historyText");
        }
        if self.specialties.is_none() {
            self.specialties = content_field(payload, "specialtiesText");
        }
        if self.location.is_none() {
            // Structured parse only; an unparsable fragment leaves the
            // location unset rather than storing a raw slice.
            self.location = location_fragment(raw_body)
                .and_then(|frag| serde_json::from_str(&frag).ok());
        }
    }

    /// Fold a Fusion business-details response into the record. The API is
    /// the higher-priority source for every field it provides, so these
    /// overwrite page values unconditionally; absent API fields change
    /// nothing.
    pub fn apply_details(&mut self, details: &Value) {
        set_if_some(&mut self.name, path_str(details, &["name"]));
        set_if_some(&mut self.phone, path_str(details, &["display_phone"]));

        let categories = details["categories"].as_array().map(|list| {
            list.iter()
                .filter_map(|c| c["title"].as_str().map(str::to_string))
                .collect::<Vec<_>>()
        });
        set_if_some(&mut self.categories, categories.filter(|c| !c.is_empty()));

        set_if_some(
            &mut self.overall_rating,
            details["rating"].as_f64().filter(|r| (0.0..=5.0).contains(r)),
        );
        set_if_some(
            &mut self.price_range,
            details["price"].as_str().map(|p| price_band(p).to_string()),
        );
        set_if_some(&mut self.hours, details.get("hours").filter(|h| !h.is_null()).cloned());
        set_if_some(
            &mut self.is_open_now,
            json_path(details, &["hours", "0", "is_open_now"]).and_then(Value::as_bool),
        );

        let transactions = details["transactions"].as_array().map(|list| {
            list.iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect::<Vec<_>>()
        });
        set_if_some(&mut self.transactions, transactions);

        set_if_some(&mut self.source_url, path_str(details, &["url"]));
        set_if_some(&mut self.image_url, path_str(details, &["image_url"]));
    }
}

fn content_field(payload: &Value, key: &str) -> Option<String> {
    let mut path = BIZ_CONTENT.to_vec();
    path.push(key);
    path_str(payload, &path).filter(|s| !s.is_empty())
}

fn set_if_some<T>(slot: &mut Option<T>, value: Option<T>) {
    if let Some(v) = value {
        *slot = Some(v);
    }
}

/// Derive a provisional name from the `/biz/` path segment of a business
/// URL, used when no page supplied one.
pub fn name_from_url(url: &str) -> Option<String> {
    let start = url.find("/biz/")? + 5;
    let segment: String = url[start..]
        .chars()
        .take_while(|c| *c != '/' && *c != '?')
        .collect();
    (!segment.is_empty()).then_some(segment)
}

/// Yelp's four price tiers, as counted in dollar signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceTier {
    One,
    Two,
    Three,
    Four,
}

impl PriceTier {
    pub fn from_signs(code: &str) -> Option<Self> {
        match code.chars().count() {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            4 => Some(Self::Four),
            _ => None,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::One => {
                "Under 10 dollars. Yelp rates this price range as 1 dollar sign out of 4."
            }
            Self::Two => {
                "Between 11 to 30 dollars. Yelp rates this price range as 2 dollar signs out of 4."
            }
            Self::Three => {
                "Between 31 to 60 dollars. Yelp rates this price range as 3 dollar signs out of 4."
            }
            Self::Four => {
                "Above 61 dollars. Yelp rates this price range as 4 dollar signs, the priciest it can be."
            }
        }
    }
}

/// Translate a dollar-sign code into its human-readable band. Anything that
/// is not 1-4 characters long maps to the "no price range" band.
pub fn price_band(code: &str) -> &'static str {
    match PriceTier::from_signs(code) {
        Some(tier) => tier.describe(),
        None => "No price range provided",
    }
}

// ── Tests ──
