use crate::types::SiteSource;

/// Substring rules in priority order. First match wins.
const RULES: &[(&[&str], SiteSource)] = &[
    (&["amzn", "amazon."], SiteSource::Amazon),
    (&["flipkart"], SiteSource::Flipkart),
    (&["booking.com", "goibibo", "makemytrip"], SiteSource::Hotel),
    (&["skyscanner", "google.com/travel", "flight"], SiteSource::Flight),
];

/// Classify a URL into a known site family by case-insensitive substring match.
/// Never fails; anything unmatched (including empty input) is `Unknown`.
pub fn classify(url: &str) -> SiteSource {
    let u = url.to_lowercase();
    RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| u.contains(n)))
        .map(|(_, source)| *source)
        .unwrap_or(SiteSource::Unknown)
}
