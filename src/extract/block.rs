use scraper::{Html, Selector};

/// Detect anti-automation challenge pages.
///
/// Conservative on purpose: a false positive discards a valid extraction,
/// so only strong signals count.
pub fn is_blocked(markup: &str, document: &Html) -> bool {
    if markup.is_empty() {
        return false;
    }

    let title = document_title(document).to_lowercase();
    if title.contains("recaptcha") || title.contains("captcha") {
        return true;
    }

    let body = markup.to_lowercase();
    body.contains("are you a human")
        || body.contains("confirming...")
        || (body.contains("recaptcha") && (body.contains("flipkart") || body.contains("amazon")))
}

pub(crate) fn document_title(document: &Html) -> String {
    Selector::parse("title")
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_default()
}
