//! Human-readable titles derived from ArcGIS service names.

/// Service-type suffix ArcGIS appends to map service names.
pub const SERVICE_SUFFIX: &str = "_MapServer";

/// Turn a service name into a title.
///
/// Three fixed steps, no other heuristics:
/// 1. strip a trailing `_MapServer`,
/// 2. turn a trailing `_<digits>` version segment into ` <n>` (leading zeros dropped),
/// 3. replace the remaining underscores with spaces.
///
/// `"EDW_ActivityFactsCommonAttributes_01_MapServer"` becomes
/// `"EDW ActivityFactsCommonAttributes 1"`.
pub fn derive_title(service_name: &str) -> String {
    let base = service_name
        .strip_suffix(SERVICE_SUFFIX)
        .unwrap_or(service_name);

    let versioned = match base.rsplit_once('_') {
        Some((head, version))
            if !version.is_empty() && version.bytes().all(|b| b.is_ascii_digit()) =>
        {
            let number = version.trim_start_matches('0');
            let number = if number.is_empty() { "0" } else { number };
            format!("{head} {number}")
        }
        _ => base.to_string(),
    };

    versioned.replace('_', " ")
}
