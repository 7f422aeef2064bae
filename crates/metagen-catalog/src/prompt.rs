//! Evidence-grounded request sent to the assistant.

use crate::fields::{Field, SENTINEL};
use metagen_llm::ChatMessage;
use metagen_rest::EnrichmentFacts;
use metagen_wsdl::ServiceFacts;
use serde::Serialize;

pub const SYSTEM_PROMPT: &str = "\
You are a federal geospatial metadata specialist. Your task is to suggest \
DCAT-US metadata field values for an ArcGIS MapServer service based on \
evidence from the service's WSDL definition and REST endpoint metadata.

RULES:
- Only provide values that are supported by the evidence provided.
- If you cannot determine a value from the available data, set it to \
\"INSUFFICIENT_EVIDENCE\". Do NOT guess or fabricate.
- For spatial extent, use the format \"xmin,ymin,xmax,ymax\" in WGS84 \
(EPSG:4326). NAD83 (EPSG:4269) coordinates are acceptable as-is. If the \
source uses a projected CRS and you cannot convert it, answer \
INSUFFICIENT_EVIDENCE.
- For temporal, use ISO 8601 interval format: \"YYYY-MM-DD/YYYY-MM-DD\" \
or \"R/YYYY-MM-DD/P1Y\" for ongoing datasets.
- For bureauCode, use the official OMB bureau codes (e.g. \"005:96\" for \
USDA Forest Service).
- For programCode, use the official OMB program codes.
- For license, suggest the appropriate federal open data license URL.
- For theme, use ISO 19115 topic categories.
- Return ONLY valid JSON matching the schema described. No markdown fences, \
no commentary. Just the JSON object.";

const ENRICHMENT_UNAVAILABLE: &str = "REST endpoint metadata was unavailable.";

const OUTPUT_SCHEMA: &str = r#"{
  "description": "string: a human-readable description of the dataset",
  "modified": "string: ISO 8601 date (YYYY-MM-DD) when last updated",
  "contactPoint": {
    "fn": "string: contact person or organization name",
    "hasEmail": "string: mailto: URI for the contact email"
  },
  "bureauCode": ["string: OMB bureau code in NNN:NN format"],
  "programCode": ["string: OMB program code in NNN:NNN format"],
  "license": "string: URL for the license",
  "spatial": "string: geographic extent as xmin,ymin,xmax,ymax in WGS84",
  "temporal": "string: temporal coverage in ISO 8601 interval format",
  "theme": ["string: ISO 19115 topic categories"]
}"#;

// Descriptor facts as the assistant sees them.
#[derive(Serialize)]
struct Evidence<'a> {
    service_name: Option<&'a str>,
    title: &'a str,
    endpoint_url: Option<&'a str>,
    target_namespace: Option<&'a str>,
    operations: &'a [String],
    domain: Option<&'a str>,
    publisher_name: &'a str,
    publisher_parent: Option<&'a str>,
}

impl<'a> From<&'a ServiceFacts> for Evidence<'a> {
    fn from(facts: &'a ServiceFacts) -> Self {
        Self {
            service_name: facts.service_name.as_deref(),
            title: &facts.derived_title,
            endpoint_url: facts.endpoint_url.as_deref(),
            target_namespace: facts.namespace.as_deref(),
            operations: &facts.operations,
            domain: facts.domain.as_deref(),
            publisher_name: &facts.publisher_name,
            publisher_parent: facts.publisher_parent.as_deref(),
        }
    }
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// The user turn: evidence, the exact output keys and the confidence request.
pub fn user_message(facts: &ServiceFacts, enrichment: Option<&EnrichmentFacts>) -> String {
    let rest_section = enrichment.map_or_else(|| ENRICHMENT_UNAVAILABLE.to_string(), pretty);
    let keys = Field::GAPS
        .iter()
        .map(|f| f.key())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "## Source Data: ESRI ArcGIS MapServer WSDL

### WSDL Extracted Information
{wsdl}

### ArcGIS REST Endpoint Metadata
{rest_section}

## Required Output

Provide a JSON object with exactly these keys: {keys}.
Each value must conform to the DCAT-US v1.1 schema \
(https://project-open-data.cio.gov/v1.1/schema). Use \"{SENTINEL}\" for any \
value the evidence above does not support.

{OUTPUT_SCHEMA}

For each field, also provide a confidence level and brief justification \
in a separate \"confidence\" key:

{{
  \"confidence\": {{
    \"description\": {{\"level\": \"high|medium|low\", \"reason\": \"...\"}},
    \"modified\": {{\"level\": \"high|medium|low\", \"reason\": \"...\"}},
    ...
  }}
}}

Return a single JSON object containing both the field values and the \
confidence object. No markdown fences or extra text.",
        wsdl = pretty(&Evidence::from(facts)),
    )
}

pub fn build_messages(
    facts: &ServiceFacts,
    enrichment: Option<&EnrichmentFacts>,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(user_message(facts, enrichment)),
    ]
}
