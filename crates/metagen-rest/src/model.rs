//! Normalized enrichment facts from an ArcGIS REST service document.

use chrono::DateTime;
use serde::Serialize;
use serde_json::Value;

/// Bounding box as reported by the service, in its own spatial reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wkid: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSummary {
    pub id: Option<i64>,
    pub name: String,
    #[serde(rename = "type")]
    pub layer_type: String,
    pub description: String,
}

/// Live metadata about a map service. Every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnrichmentFacts {
    pub service_description: Option<String>,
    pub description: Option<String>,
    pub document_title: Option<String>,
    pub document_subject: Option<String>,
    pub document_author: Option<String>,
    pub document_keywords: Vec<String>,
    pub copyright_text: Option<String>,
    pub spatial_reference_wkid: Option<i64>,
    pub full_extent: Option<Extent>,
    pub initial_extent: Option<Extent>,
    pub temporal_hint: Option<String>,
    pub capabilities: Option<String>,
    pub layers: Vec<LayerSummary>,
}

impl EnrichmentFacts {
    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .or(self.service_description.as_deref())
    }

    pub fn keywords(&self) -> &[String] {
        &self.document_keywords
    }

    pub fn spatial_extent(&self) -> Option<&Extent> {
        self.full_extent.as_ref().or(self.initial_extent.as_ref())
    }

    pub fn authorship(&self) -> Option<&str> {
        self.document_author.as_deref()
    }
}

/// Normalize a raw REST response. Never fails: anything missing or of the
/// wrong type becomes `None` / empty.
pub fn normalize(raw: &Value) -> EnrichmentFacts {
    let doc_info = raw.get("documentInfo");
    let doc_text = |key: &str| doc_info.and_then(|d| text(d.get(key)));

    EnrichmentFacts {
        service_description: text(raw.get("serviceDescription")),
        description: text(raw.get("description")),
        document_title: doc_text("Title"),
        document_subject: doc_text("Subject"),
        document_author: doc_text("Author"),
        document_keywords: doc_info
            .and_then(|d| d.get("Keywords"))
            .and_then(Value::as_str)
            .map(split_keywords)
            .unwrap_or_default(),
        copyright_text: text(raw.get("copyrightText")),
        spatial_reference_wkid: raw
            .get("spatialReference")
            .and_then(|sr| sr.get("wkid"))
            .and_then(Value::as_i64),
        full_extent: raw.get("fullExtent").and_then(extent),
        initial_extent: raw.get("initialExtent").and_then(extent),
        temporal_hint: raw
            .get("timeInfo")
            .and_then(|t| t.get("timeExtent"))
            .and_then(time_extent),
        capabilities: text(raw.get("capabilities")),
        layers: raw
            .get("layers")
            .and_then(Value::as_array)
            .map(|layers| layers.iter().map(layer_summary).collect())
            .unwrap_or_default(),
    }
}

/// Split a comma-delimited keyword string, dropping blanks.
pub fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

fn text(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn extent(value: &Value) -> Option<Extent> {
    let coord = |key: &str| value.get(key).and_then(Value::as_f64);
    Some(Extent {
        xmin: coord("xmin")?,
        ymin: coord("ymin")?,
        xmax: coord("xmax")?,
        ymax: coord("ymax")?,
        wkid: value
            .get("spatialReference")
            .and_then(|sr| sr.get("wkid"))
            .and_then(Value::as_i64),
    })
}

// `timeExtent` is a `[start, end]` pair of epoch milliseconds.
fn time_extent(value: &Value) -> Option<String> {
    let pair = value.as_array()?;
    let date = |v: Option<&Value>| {
        let ms = v?.as_i64()?;
        let dt = DateTime::from_timestamp_millis(ms)?;
        Some(dt.date_naive().format("%Y-%m-%d").to_string())
    };
    let start = date(pair.first())?;
    let end = date(pair.get(1))?;
    Some(format!("{start}/{end}"))
}

fn layer_summary(layer: &Value) -> LayerSummary {
    let field = |key: &str| {
        layer
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    LayerSummary {
        id: layer.get("id").and_then(Value::as_i64),
        name: field("name"),
        layer_type: field("type"),
        description: field("description"),
    }
}
