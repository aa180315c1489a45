use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Product,
    Hotel,
    Flight,
}

impl Category {
    /// Strict parse used for caller-supplied values. Anything outside the
    /// three known categories is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "product" => Some(Category::Product),
            "hotel" => Some(Category::Hotel),
            "flight" => Some(Category::Flight),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Product => "product",
            Category::Hotel => "hotel",
            Category::Flight => "flight",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Site source
// ---------------------------------------------------------------------------

/// Known site families a URL can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteSource {
    Amazon,
    Flipkart,
    Hotel,
    Flight,
    Unknown,
}

impl SiteSource {
    pub fn label(&self) -> &'static str {
        match self {
            SiteSource::Amazon => "Amazon",
            SiteSource::Flipkart => "Flipkart",
            SiteSource::Hotel => "Hotel",
            SiteSource::Flight => "Flight",
            SiteSource::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for SiteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Pipeline output
// ---------------------------------------------------------------------------

/// Validated `(category, source, title, price)` tuple produced by the pipeline.
/// `price` is always strictly positive.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub category: Category,
    pub source: String,
    pub title: String,
    pub price: f64,
    pub source_url: Option<String>,
    /// Bounded audit snapshot of the input or error context.
    pub raw_input_excerpt: Option<String>,
}

// ---------------------------------------------------------------------------
// Fairness analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    BuyNow,
    Wait,
    Neutral,
}

impl Recommendation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "buy_now" => Some(Recommendation::BuyNow),
            "wait" => Some(Recommendation::Wait),
            "neutral" => Some(Recommendation::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::BuyNow => "buy_now",
            Recommendation::Wait => "wait",
            Recommendation::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub fair_price_low: f64,
    pub fair_price_high: f64,
    /// 0–100
    pub surge_score: f64,
    pub recommendation: Recommendation,
    /// 0–100
    pub confidence_score: f64,
    pub insight_summary: String,
    #[serde(default)]
    pub best_time_to_buy: String,
    #[serde(default)]
    pub reasons: Vec<String>,
}

// ---------------------------------------------------------------------------
// Persisted checks
// ---------------------------------------------------------------------------

/// A completed price check. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCheck {
    pub id: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub source: String,
    pub source_url: Option<String>,
    pub title: String,
    pub current_price: f64,
    pub currency: String,
    #[serde(skip_serializing)]
    pub raw_input_excerpt: Option<String>,
    #[serde(flatten)]
    pub analysis: AnalysisResult,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// Projection returned by the history listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub source: String,
    pub title: String,
    pub current_price: f64,
    pub surge_score: f64,
    pub recommendation: Recommendation,
    pub confidence_score: f64,
    pub created_at: i64,
}
