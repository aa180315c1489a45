//! Fairness oracle adapter.
//! Availability is decided once at startup; every failure mode degrades to a
//! fixed neutral placeholder so a check always completes.

pub mod openai;

use tracing::{info, warn};

use crate::config::Config;
use crate::types::{AnalysisResult, Category, NormalizedRecord, Recommendation};

pub use openai::OpenAiClient;

const SYSTEM_PROMPT: &str = "You are an expert price fairness analyst. Given product, hotel, or flight details and current price, you must:

1. Estimate a fair price range (low and high in same currency).
2. Detect surge/dynamic pricing: score 0-100 (0=no surge, 100=heavy surge).
3. Recommend: \"buy_now\" if price is fair or below fair, \"wait\" if likely to drop, \"neutral\" if unsure.
4. Suggest best time to buy if waiting (e.g. \"next week\", \"off-season\", \"Tuesday morning\").
5. Give a confidence score 0-100 for your analysis.
6. Write a short insight summary (2-3 sentences).

Use heuristic reasoning: category, typical margins, seasonality, demand signals. If historical data is not provided, base on general market knowledge. Always respond with valid JSON only.";

/// What the oracle is asked to judge.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    pub category: Category,
    pub title: String,
    pub price: f64,
    pub source: String,
    pub currency: String,
}

impl OracleRequest {
    pub fn from_record(record: &NormalizedRecord, currency: &str) -> Self {
        Self {
            category: record.category,
            title: record.title.clone(),
            price: record.price,
            source: record.source.clone(),
            currency: currency.to_string(),
        }
    }

    fn prompt(&self) -> String {
        format!(
            r#"Type: {}
Source: {}
Title/Name: {}
Current price: {} {}

Respond with exactly this JSON (no markdown, no code block):
{{
  "fairPriceLow": number,
  "fairPriceHigh": number,
  "surgeScore": number,
  "recommendation": "buy_now" | "wait" | "neutral",
  "confidenceScore": number,
  "insightSummary": "string",
  "bestTimeToBuy": "string",
  "reasons": ["short reason 1", "short reason 2"]
}}"#,
            self.category,
            if self.source.is_empty() { "Unknown" } else { self.source.as_str() },
            if self.title.is_empty() { "Not provided" } else { self.title.as_str() },
            self.price,
            self.currency,
        )
    }
}

pub enum FairnessOracle {
    Configured(OpenAiClient),
    Unconfigured,
}

impl FairnessOracle {
    pub fn from_config(cfg: &Config) -> Self {
        let Some(key) = cfg.openai_api_key.as_deref() else {
            warn!("OPENAI_API_KEY not set, price analysis will use placeholder results");
            return FairnessOracle::Unconfigured;
        };
        match OpenAiClient::new(key, &cfg.openai_base_url, &cfg.openai_model) {
            Ok(client) => {
                info!(model = %client.model(), "price analysis oracle configured");
                FairnessOracle::Configured(client)
            }
            Err(e) => {
                warn!("oracle client setup failed, using placeholder results: {e}");
                FairnessOracle::Unconfigured
            }
        }
    }

    pub async fn analyze(&self, req: &OracleRequest) -> AnalysisResult {
        let client = match self {
            FairnessOracle::Configured(client) => client,
            FairnessOracle::Unconfigured => return unconfigured_placeholder(req.price),
        };

        match client.complete(SYSTEM_PROMPT, &req.prompt()).await {
            Ok(raw) => parse_analysis(&raw, req.price),
            Err(e) => {
                warn!(event = "ORACLE_UNAVAILABLE", "price analysis failed: {e}");
                unavailable_placeholder(req.price)
            }
        }
    }
}

/// Parse model output, tolerating markdown code fences. Anything that does
/// not deserialize becomes the parse-failure placeholder.
pub fn parse_analysis(raw: &str, price: f64) -> AnalysisResult {
    let cleaned = raw
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string();

    match serde_json::from_str::<AnalysisResult>(&cleaned) {
        Ok(parsed) => sanitize(parsed),
        Err(e) => {
            warn!(event = "ORACLE_MALFORMED", "could not parse analysis: {e}");
            malformed_placeholder(price)
        }
    }
}

fn sanitize(mut a: AnalysisResult) -> AnalysisResult {
    a.surge_score = clamp_score(a.surge_score);
    a.confidence_score = clamp_score(a.confidence_score);
    if a.fair_price_low > a.fair_price_high {
        std::mem::swap(&mut a.fair_price_low, &mut a.fair_price_high);
    }
    a
}

fn clamp_score(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 100.0)
    }
}

pub fn unconfigured_placeholder(price: f64) -> AnalysisResult {
    AnalysisResult {
        fair_price_low: price * 0.85,
        fair_price_high: price * 1.15,
        surge_score: 45.0,
        recommendation: Recommendation::Neutral,
        confidence_score: 30.0,
        insight_summary: "Set OPENAI_API_KEY for AI-powered analysis. This is a placeholder."
            .to_string(),
        best_time_to_buy: "Unknown".to_string(),
        reasons: vec!["OpenAI key not configured".to_string()],
    }
}

pub fn malformed_placeholder(price: f64) -> AnalysisResult {
    AnalysisResult {
        fair_price_low: price * 0.9,
        fair_price_high: price * 1.1,
        surge_score: 50.0,
        recommendation: Recommendation::Neutral,
        confidence_score: 40.0,
        insight_summary:
            "Analysis could not be parsed. Consider rechecking the price manually.".to_string(),
        best_time_to_buy: "Unknown".to_string(),
        reasons: Vec::new(),
    }
}

pub fn unavailable_placeholder(price: f64) -> AnalysisResult {
    AnalysisResult {
        fair_price_low: price * 0.9,
        fair_price_high: price * 1.1,
        surge_score: 50.0,
        recommendation: Recommendation::Neutral,
        confidence_score: 20.0,
        insight_summary:
            "Price analysis is temporarily unavailable. Consider rechecking the price later."
                .to_string(),
        best_time_to_buy: "Unknown".to_string(),
        reasons: vec!["Analysis service unavailable".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};

    fn request() -> OracleRequest {
        OracleRequest {
            category: Category::Product,
            title: "Widget 3000".to_string(),
            price: 1000.0,
            source: "Amazon".to_string(),
            currency: "INR".to_string(),
        }
    }

    async fn mock_oracle(status: StatusCode, content: &'static str) -> String {
        let app = Router::new().route(
            "/chat/completions",
            post(move || async move {
                (
                    status,
                    Json(serde_json::json!({
                        "choices": [{ "message": { "role": "assistant", "content": content } }]
                    })),
                )
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn unconfigured_returns_placeholder() {
        let a = FairnessOracle::Unconfigured.analyze(&request()).await;
        assert_eq!(a.recommendation, Recommendation::Neutral);
        assert_eq!(a.surge_score, 45.0);
        assert!((a.fair_price_low - 850.0).abs() < 1e-9);
        assert!((a.fair_price_high - 1150.0).abs() < 1e-9);
        assert_eq!(a.reasons, vec!["OpenAI key not configured".to_string()]);
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"fairPriceLow\": 900, \"fairPriceHigh\": 1100, \"surgeScore\": 20, \"recommendation\": \"buy_now\", \"confidenceScore\": 75, \"insightSummary\": \"Fair.\", \"bestTimeToBuy\": \"Now\", \"reasons\": [\"stable\"]}\n```";
        let a = parse_analysis(raw, 1000.0);
        assert_eq!(a.recommendation, Recommendation::BuyNow);
        assert_eq!(a.fair_price_low, 900.0);
        assert_eq!(a.reasons, vec!["stable".to_string()]);
    }

    #[test]
    fn scores_are_clamped_and_range_ordered() {
        let raw = r#"{"fairPriceLow": 1200, "fairPriceHigh": 800, "surgeScore": 140, "recommendation": "wait", "confidenceScore": -5, "insightSummary": "x"}"#;
        let a = parse_analysis(raw, 1000.0);
        assert_eq!(a.surge_score, 100.0);
        assert_eq!(a.confidence_score, 0.0);
        assert_eq!((a.fair_price_low, a.fair_price_high), (800.0, 1200.0));
        assert!(a.reasons.is_empty());
        assert_eq!(a.best_time_to_buy, "");
    }

    #[test]
    fn malformed_output_uses_parse_failure_placeholder() {
        let a = parse_analysis("I think it's a fair price!", 1000.0);
        assert_eq!(a, malformed_placeholder(1000.0));
        assert_ne!(a.insight_summary, unconfigured_placeholder(1000.0).insight_summary);

        let a = parse_analysis(r#"{"recommendation": "maybe"}"#, 1000.0);
        assert_eq!(a, malformed_placeholder(1000.0));
    }

    #[tokio::test]
    async fn configured_oracle_round_trip() {
        let base = mock_oracle(
            StatusCode::OK,
            r#"{"fairPriceLow": 950, "fairPriceHigh": 1050, "surgeScore": 10, "recommendation": "buy_now", "confidenceScore": 80, "insightSummary": "Good deal.", "bestTimeToBuy": "Now", "reasons": ["below average"]}"#,
        )
        .await;
        let oracle = FairnessOracle::Configured(OpenAiClient::new("test-key", base, "gpt-4o-mini").unwrap());
        let a = oracle.analyze(&request()).await;
        assert_eq!(a.recommendation, Recommendation::BuyNow);
        assert_eq!(a.insight_summary, "Good deal.");
    }

    #[tokio::test]
    async fn api_failure_uses_unavailable_placeholder() {
        let base = mock_oracle(StatusCode::INTERNAL_SERVER_ERROR, "").await;
        let oracle = FairnessOracle::Configured(OpenAiClient::new("test-key", base, "gpt-4o-mini").unwrap());
        let a = oracle.analyze(&request()).await;
        assert_eq!(a, unavailable_placeholder(1000.0));
    }

    #[test]
    fn prompt_names_every_field() {
        let p = request().prompt();
        assert!(p.contains("Type: product"));
        assert!(p.contains("Source: Amazon"));
        assert!(p.contains("Current price: 1000 INR"));
    }
}
