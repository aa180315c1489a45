use scraper::Html;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::MAX_RAW_INPUT_CHARS;
use crate::error::CheckError;
use crate::extract::block::is_blocked;
use crate::extract::classifier::classify;
use crate::extract::fields::{extract_fields, SourceProfile};
use crate::extract::pasted::parse_pasted;
use crate::fetcher::{DocumentFetcher, FetchError};
use crate::types::{Category, NormalizedRecord, SiteSource};

/// Caller input for one price check. Empty strings count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub url: Option<String>,
    pub pasted_text: Option<String>,
    /// Forced category; overrides whatever extraction inferred.
    #[serde(rename = "type")]
    pub forced_type: Option<String>,
}

impl CheckRequest {
    fn raw_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    /// The URL to fetch, if one was given and looks like http(s).
    pub fn target_url(&self) -> Option<&str> {
        self.raw_url().filter(|u| u.to_ascii_lowercase().starts_with("http"))
    }

    pub fn pasted(&self) -> Option<&str> {
        self.pasted_text.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn forced_category(&self) -> Option<Category> {
        let raw = self.forced_type.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        let category = Category::parse(raw);
        if category.is_none() {
            warn!(forced_type = %raw, "ignoring unrecognized forced category");
        }
        category
    }
}

/// Working state carried between pipeline stages.
#[derive(Debug)]
struct Draft {
    category: Category,
    source: String,
    title: String,
    price: Option<f64>,
    raw_input: Option<String>,
}

impl Draft {
    fn new(req: &CheckRequest) -> Self {
        Self {
            category: Category::Product,
            source: "Manual".to_string(),
            title: "Unknown".to_string(),
            price: None,
            raw_input: req.raw_url().or(req.pasted()).map(str::to_string),
        }
    }

    fn has_usable_price(&self) -> bool {
        self.price.is_some_and(|p| p > 0.0 && p.is_finite())
    }

    /// Adopt the text parser's record wholesale. The URL's classified
    /// category does not survive a fallback.
    fn apply_pasted(&mut self, text: &str) -> bool {
        match parse_pasted(text) {
            Some(rec) => {
                self.title = rec.title;
                self.price = rec.price;
                self.category = rec.category;
                self.source = rec.source.to_string();
                true
            }
            None => false,
        }
    }
}

/// classify → fetch → block check → extract → pasted fallback → validate.
pub async fn run_pipeline(
    fetcher: &DocumentFetcher,
    req: &CheckRequest,
) -> Result<NormalizedRecord, CheckError> {
    match req.target_url() {
        Some(url) => {
            let source = classify(url);
            info!(event = "CLASSIFIED", url = %url, source = %source, "fetching page");
            let fetched = fetcher.fetch(url).await.map(|page| page.body);
            resolve_fetched(req, url, source, fetched)
        }
        None => resolve_pasted(req),
    }
}

/// Everything after the fetch. Kept synchronous so the parsed document
/// never lives across an await point.
pub fn resolve_fetched(
    req: &CheckRequest,
    url: &str,
    source: SiteSource,
    fetched: Result<String, FetchError>,
) -> Result<NormalizedRecord, CheckError> {
    let profile = SourceProfile::for_source(source);
    let mut draft = Draft::new(req);
    draft.category = profile.category;
    draft.source = source.label().to_string();

    match fetched {
        Ok(markup) => {
            let document = Html::parse_document(&markup);
            if is_blocked(&markup, &document) {
                let site = match source {
                    SiteSource::Amazon | SiteSource::Flipkart => source.label(),
                    _ => "This site",
                };
                warn!(event = "BLOCKED", url = %url, source = %source, "challenge page detected");
                return Err(CheckError::blocked(site));
            }

            let fields = extract_fields(profile, &document);
            if let Some(excerpt) = &fields.markup_excerpt {
                debug!(
                    event = "MARKUP_EXCERPT",
                    url = %url,
                    title_found = fields.title.is_some(),
                    price = ?fields.price,
                    "{excerpt}"
                );
            }
            info!(
                event = "EXTRACTED",
                source = %source,
                title_found = fields.title.is_some(),
                usable_price = fields.has_usable_price(),
                price = ?fields.price,
                "fields extracted"
            );
            draft.title = fields
                .title
                .unwrap_or_else(|| profile.fallback_title.to_string());
            draft.price = fields.price;
        }
        Err(e) => {
            warn!(event = "FETCH_FAILED", url = %url, "fetch failed: {e}");
            draft.raw_input =
                Some(serde_json::json!({ "url": url, "error": e.to_string() }).to_string());
        }
    }

    if !draft.has_usable_price() {
        if let Some(text) = req.pasted() {
            if draft.apply_pasted(text) {
                info!(event = "FALLBACK_TO_PASTED", url = %url, price = ?draft.price, "using pasted text");
            }
        }
    }

    finish(draft, req)
}

/// No fetchable URL: the pasted text is the only input.
pub fn resolve_pasted(req: &CheckRequest) -> Result<NormalizedRecord, CheckError> {
    let mut draft = Draft::new(req);
    if let Some(text) = req.pasted() {
        draft.apply_pasted(text);
    }
    finish(draft, req)
}

fn finish(mut draft: Draft, req: &CheckRequest) -> Result<NormalizedRecord, CheckError> {
    if let Some(forced) = req.forced_category() {
        draft.category = forced;
    }

    if !draft.has_usable_price() {
        info!(event = "INVALID_INPUT", source = %draft.source, price = ?draft.price, "no usable price");
        return Err(CheckError::InvalidInput);
    }
    let price = draft.price.unwrap_or_default();

    Ok(NormalizedRecord {
        category: draft.category,
        source: draft.source,
        title: draft.title,
        price,
        source_url: req.raw_url().map(str::to_string),
        raw_input_excerpt: draft
            .raw_input
            .map(|r| r.chars().take(MAX_RAW_INPUT_CHARS).collect()),
    })
}
