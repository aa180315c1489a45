use crate::config::MAX_TITLE_CHARS;
use crate::extract::fields::normalize_price;
use crate::types::Category;

pub const PASTED_SOURCE: &str = "Pasted";

#[derive(Debug, Clone, PartialEq)]
pub struct PastedRecord {
    pub title: String,
    pub price: Option<f64>,
    pub category: Category,
    pub source: &'static str,
}

/// Best-effort `(title, price)` from free text.
///
/// Every line that normalizes to a positive number replaces the price
/// candidate, so the last one wins (listings usually show the struck-out
/// price before the current one). Other lines of 3..=199 characters are
/// joined into the title.
pub fn parse_pasted(text: &str) -> Option<PastedRecord> {
    if text.trim().is_empty() {
        return None;
    }

    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut title = String::new();
    let mut price = None;
    for line in &lines {
        match normalize_price(line) {
            Some(p) if p > 0.0 => price = Some(p),
            _ => {
                let len = line.chars().count();
                if len > 2 && len < MAX_TITLE_CHARS {
                    if !title.is_empty() {
                        title.push(' ');
                    }
                    title.push_str(line);
                }
            }
        }
    }

    if title.is_empty() {
        title = lines
            .first()
            .map(|l| l.chars().take(MAX_TITLE_CHARS).collect())
            .unwrap_or_else(|| "Unknown".to_string());
    }

    Some(PastedRecord {
        title,
        price,
        category: Category::Product,
        source: PASTED_SOURCE,
    })
}
