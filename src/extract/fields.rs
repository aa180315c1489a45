use scraper::{Html, Selector};

use crate::config::{GENERIC_EXCERPT_CHARS, MARKUP_EXCERPT_CHARS};
use crate::extract::block::document_title;
use crate::types::{Category, SiteSource};

// ---------------------------------------------------------------------------
// Source profiles
// ---------------------------------------------------------------------------

/// When a diagnostic markup excerpt is kept alongside the extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcerptRule {
    MissingTitle,
    MissingPrice,
    Always,
}

/// Ordered extraction rules for one site family. Selected once from the
/// classified source and threaded through the pipeline.
#[derive(Debug)]
pub struct SourceProfile {
    pub source: SiteSource,
    pub category: Category,
    /// Tried in order; first non-empty text wins.
    pub title_selectors: &'static [&'static str],
    /// Tried in order; first positive normalized value wins.
    pub price_selectors: &'static [&'static str],
    pub fallback_title: &'static str,
    pub excerpt_rule: ExcerptRule,
    pub excerpt_chars: usize,
}

pub static AMAZON: SourceProfile = SourceProfile {
    source: SiteSource::Amazon,
    category: Category::Product,
    title_selectors: &["#productTitle", "h1#title", "[data-feature-name='title']"],
    price_selectors: &[
        ".a-price-whole",
        "#priceblock_ourprice",
        "#priceblock_dealprice",
        "span[data-a-color='price'] span",
    ],
    fallback_title: "Product",
    excerpt_rule: ExcerptRule::MissingTitle,
    excerpt_chars: MARKUP_EXCERPT_CHARS,
};

pub static FLIPKART: SourceProfile = SourceProfile {
    source: SiteSource::Flipkart,
    category: Category::Product,
    title_selectors: &["span.B_NuCI", "h1.yhB1nd"],
    price_selectors: &["div._30jeq3._16Jk6d", "div._25b18c ._16Jk6d", "[class*='_30jeq3']"],
    fallback_title: "Product",
    excerpt_rule: ExcerptRule::MissingTitle,
    excerpt_chars: MARKUP_EXCERPT_CHARS,
};

pub static HOTEL: SourceProfile = SourceProfile {
    source: SiteSource::Hotel,
    category: Category::Hotel,
    title_selectors: &["h1", "[data-testid='property-name']"],
    price_selectors: &["[data-testid='price']", ".prco-valign-middle-helper", ".room-price"],
    fallback_title: "Hotel",
    excerpt_rule: ExcerptRule::MissingPrice,
    excerpt_chars: MARKUP_EXCERPT_CHARS,
};

pub static FLIGHT: SourceProfile = SourceProfile {
    source: SiteSource::Flight,
    category: Category::Flight,
    title_selectors: &["h1"],
    price_selectors: &["[data-testid='price']", ".price"],
    fallback_title: "Flight",
    excerpt_rule: ExcerptRule::MissingPrice,
    excerpt_chars: MARKUP_EXCERPT_CHARS,
};

pub static GENERIC: SourceProfile = SourceProfile {
    source: SiteSource::Unknown,
    category: Category::Product,
    title_selectors: &["h1", "title"],
    price_selectors: &["[class*='price']", ".price"],
    fallback_title: "Item",
    excerpt_rule: ExcerptRule::Always,
    excerpt_chars: GENERIC_EXCERPT_CHARS,
};

impl SourceProfile {
    pub fn for_source(source: SiteSource) -> &'static SourceProfile {
        match source {
            SiteSource::Amazon => &AMAZON,
            SiteSource::Flipkart => &FLIPKART,
            SiteSource::Hotel => &HOTEL,
            SiteSource::Flight => &FLIGHT,
            SiteSource::Unknown => &GENERIC,
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldExtraction {
    pub title: Option<String>,
    /// `None` = nothing parseable; `Some(0.0)` = parsed but not usable.
    pub price: Option<f64>,
    pub markup_excerpt: Option<String>,
}

impl FieldExtraction {
    pub fn has_usable_price(&self) -> bool {
        self.price.is_some_and(|p| p > 0.0)
    }
}

pub fn extract_fields(profile: &SourceProfile, document: &Html) -> FieldExtraction {
    let title = profile
        .title_selectors
        .iter()
        .find_map(|sel| first_text(document, sel).filter(|t| !t.is_empty()));

    let candidates: Vec<f64> = profile
        .price_selectors
        .iter()
        .filter_map(|sel| first_text(document, sel).and_then(|t| normalize_price(&t)))
        .collect();
    let price = candidates
        .iter()
        .copied()
        .find(|p| *p > 0.0)
        .or_else(|| candidates.first().copied());

    let keep_excerpt = match profile.excerpt_rule {
        ExcerptRule::MissingTitle => title.is_none(),
        ExcerptRule::MissingPrice => !price.is_some_and(|p| p > 0.0),
        ExcerptRule::Always => true,
    };
    let markup_excerpt: Option<String> =
        keep_excerpt.then(|| document.html().chars().take(profile.excerpt_chars).collect());

    FieldExtraction { title, price, markup_excerpt }
}

/// Trimmed text of the first element matching `selector`.
fn first_text(document: &Html, selector: &str) -> Option<String> {
    if selector == "title" {
        return Some(document_title(document));
    }
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

/// Strip everything but digits and `.`, then read the leading decimal number.
/// Unparseable input is `None`, never zero.
pub fn normalize_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut end = 0;
    let mut seen_dot = false;
    let mut digits = 0;
    for (i, c) in cleaned.char_indices() {
        if c == '.' {
            if seen_dot {
                break;
            }
            seen_dot = true;
        } else {
            digits += 1;
        }
        end = i + 1;
    }
    if digits == 0 {
        return None;
    }

    let number = cleaned[..end].trim_end_matches('.');
    let number = if number.starts_with('.') {
        format!("0{number}")
    } else {
        number.to_string()
    };
    number.parse::<f64>().ok()
}
