//! Row type for the `price_checks` table (see migrations/).

use crate::types::{AnalysisResult, Category, CheckSummary, Recommendation, StoredCheck};

#[derive(Debug, sqlx::FromRow)]
pub struct CheckRow {
    pub id: String,
    pub category: String,
    pub source_url: Option<String>,
    pub source_name: String,
    pub title: String,
    pub current_price: f64,
    pub currency: String,
    pub raw_input: Option<String>,
    pub fair_price_low: f64,
    pub fair_price_high: f64,
    pub surge_score: f64,
    pub recommendation: String,
    pub confidence_score: f64,
    pub insight_summary: String,
    pub best_time_to_buy: String,
    /// JSON array of strings.
    pub reasons: String,
    pub created_at: i64,
}

impl CheckRow {
    fn category(&self) -> Category {
        Category::parse(&self.category).unwrap_or_default()
    }

    fn recommendation(&self) -> Recommendation {
        Recommendation::parse(&self.recommendation).unwrap_or(Recommendation::Neutral)
    }

    pub fn into_summary(self) -> CheckSummary {
        CheckSummary {
            category: self.category(),
            recommendation: self.recommendation(),
            id: self.id,
            source: self.source_name,
            title: self.title,
            current_price: self.current_price,
            surge_score: self.surge_score,
            confidence_score: self.confidence_score,
            created_at: self.created_at,
        }
    }
}

impl From<CheckRow> for StoredCheck {
    fn from(row: CheckRow) -> Self {
        let category = row.category();
        let recommendation = row.recommendation();
        let reasons: Vec<String> = serde_json::from_str(&row.reasons).unwrap_or_default();
        StoredCheck {
            id: row.id,
            category,
            source: row.source_name,
            source_url: row.source_url,
            title: row.title,
            current_price: row.current_price,
            currency: row.currency,
            raw_input_excerpt: row.raw_input,
            analysis: AnalysisResult {
                fair_price_low: row.fair_price_low,
                fair_price_high: row.fair_price_high,
                surge_score: row.surge_score,
                recommendation,
                confidence_score: row.confidence_score,
                insight_summary: row.insight_summary,
                best_time_to_buy: row.best_time_to_buy,
                reasons,
            },
            created_at: row.created_at,
        }
    }
}
