//! Publisher inference from the endpoint's host name.

use serde::Serialize;

/// Marker written wherever a value has to be supplied by a human.
pub const PLACEHOLDER: &str = "[[REQUIRED — provide manually]]";

struct KnownPublisher {
    domain_fragment: &'static str,
    name: &'static str,
    parent: Option<&'static str>,
}

// Ordered most-specific first: the first fragment contained in the host wins.
const KNOWN_PUBLISHERS: &[KnownPublisher] = &[
    KnownPublisher {
        domain_fragment: "fs.usda.gov",
        name: "U.S. Forest Service",
        parent: Some("U.S. Department of Agriculture"),
    },
    KnownPublisher {
        domain_fragment: "usda.gov",
        name: "U.S. Department of Agriculture",
        parent: None,
    },
];

/// Publishing organization, optionally nested under a parent organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Publisher {
    pub name: String,
    pub parent: Option<String>,
}

impl Publisher {
    pub fn unknown() -> Self {
        Self {
            name: PLACEHOLDER.to_string(),
            parent: None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.name != PLACEHOLDER
    }
}

/// Match a host against the known-publisher table.
///
/// Never guesses: a host outside the table (or no host at all) yields
/// [`Publisher::unknown`].
pub fn infer_publisher(domain: Option<&str>) -> Publisher {
    let Some(domain) = domain else {
        return Publisher::unknown();
    };
    let domain = domain.to_ascii_lowercase();

    KNOWN_PUBLISHERS
        .iter()
        .find(|p| domain.contains(p.domain_fragment))
        .map(|p| Publisher {
            name: p.name.to_string(),
            parent: p.parent.map(str::to_string),
        })
        .unwrap_or_else(Publisher::unknown)
}

/// Extract `host[:port]` from an http(s) endpoint address.
pub fn endpoint_domain(endpoint: &str) -> Option<String> {
    let url = url::Url::parse(endpoint).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
