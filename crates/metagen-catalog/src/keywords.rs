//! Catalog keywords derived from the service name.

use metagen_wsdl::SERVICE_SUFFIX;

pub const BASE_KEYWORDS: [&str; 3] = ["geospatial", "map service", "ArcGIS"];

// Version segments that carry no meaning as search terms.
const EXCLUDED_TOKENS: [&str; 3] = ["01", "02", "03"];
const MIN_TOKEN_LEN: usize = 3;

/// Base vocabulary followed by tokens from the service name, deduplicated
/// case-insensitively with first occurrence kept.
pub fn keywords(service_name: Option<&str>) -> Vec<String> {
    let name = service_name.unwrap_or_default();
    let stem = name.strip_suffix(SERVICE_SUFFIX).unwrap_or(name);

    let tokens = stem
        .split('_')
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN && !EXCLUDED_TOKENS.contains(&t.as_str()));

    let mut out: Vec<String> = Vec::new();
    for kw in BASE_KEYWORDS.iter().map(|s| s.to_string()).chain(tokens) {
        if !out.iter().any(|k| k.eq_ignore_ascii_case(&kw)) {
            out.push(kw);
        }
    }
    out
}
