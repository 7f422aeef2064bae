//! The tracked field universe and per-field resolution records.

use metagen_wsdl::PLACEHOLDER;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Marker an assistant returns when the evidence supports no value.
pub const SENTINEL: &str = "INSUFFICIENT_EVIDENCE";

/// Every catalog field whose origin is tracked and reported.
///
/// Declaration order is report order: the eight mapped fields, then the
/// nine gap fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Title,
    Identifier,
    AccessUrl,
    Format,
    MediaType,
    PublisherName,
    Keyword,
    AccessLevel,
    Description,
    Modified,
    ContactPoint,
    BureauCode,
    ProgramCode,
    License,
    Spatial,
    Temporal,
    Theme,
}

/// JSON shape a field's value takes in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Text,
    List,
    Contact,
}

impl Field {
    pub const COUNT: usize = 17;

    pub const ALL: [Field; Field::COUNT] = [
        Field::Title,
        Field::Identifier,
        Field::AccessUrl,
        Field::Format,
        Field::MediaType,
        Field::PublisherName,
        Field::Keyword,
        Field::AccessLevel,
        Field::Description,
        Field::Modified,
        Field::ContactPoint,
        Field::BureauCode,
        Field::ProgramCode,
        Field::License,
        Field::Spatial,
        Field::Temporal,
        Field::Theme,
    ];

    /// Fields populated from the descriptor itself.
    pub const MAPPED: [Field; 8] = [
        Field::Title,
        Field::Identifier,
        Field::AccessUrl,
        Field::Format,
        Field::MediaType,
        Field::PublisherName,
        Field::Keyword,
        Field::AccessLevel,
    ];

    /// Fields the descriptor cannot populate; the only ones an assistant may fill.
    pub const GAPS: [Field; 9] = [
        Field::Description,
        Field::Modified,
        Field::ContactPoint,
        Field::BureauCode,
        Field::ProgramCode,
        Field::License,
        Field::Spatial,
        Field::Temporal,
        Field::Theme,
    ];

    /// DCAT-US key, dotted for nested mapped fields.
    pub fn key(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Identifier => "identifier",
            Field::AccessUrl => "distribution.accessURL",
            Field::Format => "distribution.format",
            Field::MediaType => "distribution.mediaType",
            Field::PublisherName => "publisher.name",
            Field::Keyword => "keyword",
            Field::AccessLevel => "accessLevel",
            Field::Description => "description",
            Field::Modified => "modified",
            Field::ContactPoint => "contactPoint",
            Field::BureauCode => "bureauCode",
            Field::ProgramCode => "programCode",
            Field::License => "license",
            Field::Spatial => "spatial",
            Field::Temporal => "temporal",
            Field::Theme => "theme",
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn is_assistant_eligible(self) -> bool {
        Field::GAPS.contains(&self)
    }

    pub fn shape(self) -> Shape {
        match self {
            Field::Keyword | Field::BureauCode | Field::ProgramCode | Field::Theme => Shape::List,
            Field::ContactPoint => Shape::Contact,
            _ => Shape::Text,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    #[serde(rename = "fn")]
    pub name: String,
    #[serde(rename = "hasEmail")]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Contact(Contact),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// The "requires manual input" value in the given shape.
    pub fn placeholder(shape: Shape) -> Self {
        match shape {
            Shape::Text => FieldValue::Text(PLACEHOLDER.to_string()),
            Shape::List => FieldValue::List(vec![PLACEHOLDER.to_string()]),
            Shape::Contact => FieldValue::Contact(Contact {
                name: PLACEHOLDER.to_string(),
                email: PLACEHOLDER.to_string(),
            }),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_contact(&self) -> Option<&Contact> {
        match self {
            FieldValue::Contact(c) => Some(c),
            _ => None,
        }
    }

    /// One-line rendering for reports.
    pub fn summary(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => items.join(", "),
            FieldValue::Contact(c) => format!("{} <{}>", c.name, c.email),
        }
    }
}

/// Trust tier of a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Read directly from the descriptor (or a fixed default).
    Parsed,
    /// Deduced from descriptor facts, e.g. publisher from the endpoint host.
    Inferred,
    /// Suggested by an assistant and validated.
    Ai,
    /// No trusted value; a human must supply one.
    Placeholder,
}

impl Provenance {
    pub fn is_trusted(self) -> bool {
        matches!(self, Provenance::Parsed | Provenance::Inferred)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    Unspecified,
}

impl ConfidenceLevel {
    /// Case-insensitive; anything unrecognized is `Unspecified`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => ConfidenceLevel::High,
            "medium" => ConfidenceLevel::Medium,
            "low" => ConfidenceLevel::Low,
            _ => ConfidenceLevel::Unspecified,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfidenceLevel::High => "HIGH",
            ConfidenceLevel::Medium => "MEDIUM",
            ConfidenceLevel::Low => "LOW",
            ConfidenceLevel::Unspecified => "UNSPECIFIED",
        })
    }
}

/// An assistant's self-reported confidence for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confidence {
    pub level: ConfidenceLevel,
    pub reason: Option<String>,
}

impl Default for Confidence {
    fn default() -> Self {
        Self {
            level: ConfidenceLevel::Unspecified,
            reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldResolution {
    pub value: FieldValue,
    pub provenance: Provenance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ConfidenceLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
}

impl FieldResolution {
    fn trusted(value: FieldValue, provenance: Provenance) -> Self {
        Self {
            value,
            provenance,
            confidence: None,
            justification: None,
        }
    }

    pub fn parsed(value: FieldValue) -> Self {
        Self::trusted(value, Provenance::Parsed)
    }

    pub fn inferred(value: FieldValue) -> Self {
        Self::trusted(value, Provenance::Inferred)
    }

    pub fn placeholder(field: Field) -> Self {
        Self::trusted(FieldValue::placeholder(field.shape()), Provenance::Placeholder)
    }

    pub fn ai(value: FieldValue, confidence: Option<&Confidence>) -> Self {
        let confidence = confidence.cloned().unwrap_or_default();
        Self {
            value,
            provenance: Provenance::Ai,
            confidence: Some(confidence.level),
            justification: confidence.reason,
        }
    }
}

/// Exactly one resolution for every [`Field`].
///
/// The set is total by construction and never edited in place: filling
/// gaps produces a new set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolutions {
    entries: [FieldResolution; Field::COUNT],
}

impl Resolutions {
    pub fn from_fn(mut resolve: impl FnMut(Field) -> FieldResolution) -> Self {
        Self {
            entries: std::array::from_fn(|i| resolve(Field::ALL[i])),
        }
    }

    pub fn get(&self, field: Field) -> &FieldResolution {
        &self.entries[field.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldResolution)> {
        Field::ALL.into_iter().zip(self.entries.iter())
    }

    /// Apply assistant suggestions.
    ///
    /// A suggestion lands only on an assistant-eligible field that is still a
    /// placeholder, and only if it is itself an `ai` resolution. Parsed and
    /// inferred values have no overwrite path.
    pub fn fill_gaps(&self, suggestions: &BTreeMap<Field, FieldResolution>) -> Self {
        Self::from_fn(|field| {
            let current = self.get(field);
            match suggestions.get(&field) {
                Some(suggested)
                    if field.is_assistant_eligible()
                        && current.provenance == Provenance::Placeholder
                        && suggested.provenance == Provenance::Ai =>
                {
                    suggested.clone()
                }
                _ => current.clone(),
            }
        })
    }

    pub fn count(&self, provenance: Provenance) -> usize {
        self.entries
            .iter()
            .filter(|r| r.provenance == provenance)
            .count()
    }
}

impl Serialize for Resolutions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_universe_partitions_into_mapped_and_gaps() {
        assert_eq!(Field::MAPPED.len() + Field::GAPS.len(), Field::ALL.len());
        for field in Field::ALL {
            assert_eq!(
                Field::MAPPED.contains(&field),
                !field.is_assistant_eligible(),
                "{field}"
            );
            assert_eq!(Field::from_key(field.key()), Some(field));
        }
        for (i, field) in Field::ALL.into_iter().enumerate() {
            assert_eq!(field.index(), i);
        }
    }

    #[test]
    fn placeholders_follow_field_shape() {
        assert_eq!(
            FieldResolution::placeholder(Field::Theme).value,
            FieldValue::List(vec![PLACEHOLDER.to_string()])
        );
        let contact = FieldResolution::placeholder(Field::ContactPoint);
        assert_eq!(contact.value.as_contact().map(|c| c.email.as_str()), Some(PLACEHOLDER));
        assert_eq!(contact.provenance, Provenance::Placeholder);
    }

    #[test]
    fn fill_gaps_never_overwrites_trusted_fields() {
        let base = Resolutions::from_fn(|field| match field {
            Field::Title => FieldResolution::parsed(FieldValue::text("Roads")),
            _ => FieldResolution::placeholder(field),
        });
        let suggestions = BTreeMap::from([
            (Field::Title, FieldResolution::ai(FieldValue::text("Other"), None)),
            (Field::PublisherName, FieldResolution::ai(FieldValue::text("Agency"), None)),
            (Field::License, FieldResolution::ai(FieldValue::text("https://cc0"), None)),
            (Field::Spatial, FieldResolution::placeholder(Field::Spatial)),
        ]);

        let filled = base.fill_gaps(&suggestions);
        assert_eq!(filled.get(Field::Title), base.get(Field::Title));
        assert_eq!(filled.get(Field::PublisherName).provenance, Provenance::Placeholder);
        assert_eq!(filled.get(Field::License).provenance, Provenance::Ai);
        assert_eq!(
            filled.get(Field::License).confidence,
            Some(ConfidenceLevel::Unspecified)
        );
        assert_eq!(filled.get(Field::Spatial).provenance, Provenance::Placeholder);
        assert_eq!(base.count(Provenance::Ai), 0);
    }

    #[test]
    fn confidence_levels_parse_loosely_and_print_upper_case() {
        assert_eq!(ConfidenceLevel::parse(" High "), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::parse("certain"), ConfidenceLevel::Unspecified);
        assert_eq!(ConfidenceLevel::Medium.to_string(), "MEDIUM");
    }

    #[test]
    fn resolutions_serialize_keyed_by_field() {
        let resolutions = Resolutions::from_fn(FieldResolution::placeholder);
        let json = serde_json::to_value(&resolutions).unwrap();
        assert_eq!(json.as_object().map(|m| m.len()), Some(Field::COUNT));
        assert_eq!(json["publisher.name"]["provenance"], "placeholder");
        assert_eq!(json["keyword"]["value"][0], PLACEHOLDER);
    }
}
