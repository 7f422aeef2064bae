//! ArcGIS REST enrichment for metagen
//!
//! A SOAP endpoint such as
//! `https://host/arcx/services/EDW/Roads/MapServer` has a JSON sibling at
//! `https://host/arcx/rest/services/EDW/Roads/MapServer?f=json`. This crate
//! derives that URL, fetches it with a bounded timeout and normalizes the
//! response into [`EnrichmentFacts`].
//!
//! Enrichment is best-effort. Every failure is logged once as a warning and
//! turned into "no enrichment"; nothing here is fatal to a run.

mod model;

pub use model::{normalize, split_keywords, EnrichmentFacts, Extent, LayerSummary};

use reqwest::blocking::Client;
use serde_json::Value;
use std::io::{self, Read};
use std::time::Duration;

const SOAP_SEGMENT: &str = "/services/";
const REST_SEGMENT: &str = "/rest/services/";
const JSON_QUERY: &str = "?f=json";

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Derive the REST metadata URL for a SOAP endpoint.
///
/// Returns `None` (with a warning) when the endpoint has no `/services/`
/// segment to rewrite.
pub fn derive_query_url(endpoint: &str) -> Option<String> {
    if endpoint.is_empty() {
        return None;
    }
    if !endpoint.contains(SOAP_SEGMENT) {
        tracing::warn!(endpoint, "could not derive REST metadata URL from endpoint");
        return None;
    }
    let rest = endpoint.replacen(SOAP_SEGMENT, REST_SEGMENT, 1);
    Some(format!("{rest}{JSON_QUERY}"))
}

/// Why a metadata fetch produced nothing.
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentUnavailable {
    #[error("failed to build http client: {0}")]
    Client(String),
    #[error("REST endpoint timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("could not fetch REST metadata: {0}")]
    Transport(String),
    #[error("REST endpoint returned http status {0}")]
    Status(u16),
    #[error("REST response of {0} bytes exceeds the {1} byte limit")]
    TooLarge(usize, usize),
    #[error("REST endpoint returned invalid JSON: {0}")]
    InvalidJson(String),
    #[error("REST endpoint returned JSON that is not an object")]
    NotAnObject,
}

/// Where raw REST metadata comes from.
pub trait MetadataSource {
    /// Fetch the metadata document at `url`, or `None` if it is unavailable.
    fn fetch(&self, url: &str) -> Option<Value>;
}

/// Blocking HTTP fetch with a request timeout and a response size cap.
#[derive(Debug, Clone)]
pub struct HttpMetadataSource {
    timeout: Duration,
    max_body_bytes: usize,
}

impl Default for HttpMetadataSource {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl HttpMetadataSource {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn try_fetch(&self, url: &str) -> Result<Value, EnrichmentUnavailable> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| EnrichmentUnavailable::Client(e.to_string()))?;

        let resp = client.get(url).send().map_err(|e| self.transport_error(e))?;
        if !resp.status().is_success() {
            return Err(EnrichmentUnavailable::Status(resp.status().as_u16()));
        }
        if let Some(len) = resp.content_length() {
            if len as usize > self.max_body_bytes {
                return Err(EnrichmentUnavailable::TooLarge(len as usize, self.max_body_bytes));
            }
        }

        // Chunked responses carry no length, so cap the read itself.
        let mut bytes = Vec::new();
        resp.take(self.max_body_bytes as u64 + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| self.read_error(e))?;
        if bytes.len() > self.max_body_bytes {
            return Err(EnrichmentUnavailable::TooLarge(bytes.len(), self.max_body_bytes));
        }

        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| EnrichmentUnavailable::InvalidJson(e.to_string()))?;
        if !value.is_object() {
            return Err(EnrichmentUnavailable::NotAnObject);
        }
        Ok(value)
    }

    fn transport_error(&self, err: reqwest::Error) -> EnrichmentUnavailable {
        if err.is_timeout() {
            EnrichmentUnavailable::Timeout(self.timeout)
        } else {
            EnrichmentUnavailable::Transport(err.to_string())
        }
    }

    fn read_error(&self, err: io::Error) -> EnrichmentUnavailable {
        let timed_out = err.kind() == io::ErrorKind::TimedOut
            || err
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
                .is_some_and(reqwest::Error::is_timeout);
        if timed_out {
            EnrichmentUnavailable::Timeout(self.timeout)
        } else {
            EnrichmentUnavailable::Transport(err.to_string())
        }
    }
}

impl MetadataSource for HttpMetadataSource {
    fn fetch(&self, url: &str) -> Option<Value> {
        match self.try_fetch(url) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(url, error = %err, "REST enrichment unavailable");
                None
            }
        }
    }
}

/// Fetch `url` over HTTP with `timeout`, absorbing every failure.
pub fn fetch(url: &str, timeout: Duration) -> Option<Value> {
    HttpMetadataSource::new(timeout).fetch(url)
}

/// Full enrichment step: derive the query URL, fetch it, normalize it.
pub fn enrich(endpoint: Option<&str>, source: &dyn MetadataSource) -> Option<EnrichmentFacts> {
    let url = derive_query_url(endpoint?)?;
    tracing::debug!(url = %url, "fetching REST metadata");
    let raw = source.fetch(&url)?;
    Some(normalize(&raw))
}
