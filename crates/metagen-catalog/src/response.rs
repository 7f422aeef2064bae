//! Validation of untrusted assistant replies.
//!
//! A reply is accepted only as one JSON object. Each of the nine gap keys is
//! checked against the shape its field takes in the catalog; anything else in
//! the object is dropped with a warning.

use crate::fields::{
    Confidence, ConfidenceLevel, Contact, Field, FieldResolution, FieldValue, Shape, SENTINEL,
};
use metagen_wsdl::PLACEHOLDER;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

const CONFIDENCE_KEY: &str = "confidence";

#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("assistant response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("assistant response is a JSON {0}, expected an object")]
    NotAnObject(&'static str),
    #[error("assistant response contains none of the expected fields")]
    NoExpectedFields,
}

/// Validated suggestions plus the confidence map, keyed by gap field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    pub suggestions: BTreeMap<Field, FieldResolution>,
    pub confidence: BTreeMap<Field, Confidence>,
}

// The first fence in the reply, after an optional backtick-free preamble.
fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\A[^`]*```(?i:json)?[ \t]*\n?(.*?)\s*```").unwrap())
}

/// Remove a markdown code fence the model may have wrapped its JSON in.
pub fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    fence_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str().trim())
}

// Bare JSON is taken as is; fences are only looked for when that fails.
fn parse_json(text: &str) -> Result<Value, serde_json::Error> {
    let text = text.trim();
    serde_json::from_str(text).or_else(|_| serde_json::from_str(strip_fences(text)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn parse_response(text: &str) -> Result<ParsedResponse, ResponseError> {
    let value = parse_json(text)?;
    let kind = json_kind(&value);
    let Value::Object(object) = value else {
        return Err(ResponseError::NotAnObject(kind));
    };

    for key in object.keys() {
        let expected = key == CONFIDENCE_KEY
            || Field::from_key(key).is_some_and(Field::is_assistant_eligible);
        if !expected {
            tracing::warn!(field = %key, "ignoring unexpected field in assistant response");
        }
    }

    let missing: Vec<&str> = Field::GAPS
        .iter()
        .filter(|f| !object.contains_key(f.key()))
        .map(|f| f.key())
        .collect();
    if missing.len() == Field::GAPS.len() {
        return Err(ResponseError::NoExpectedFields);
    }
    if !missing.is_empty() {
        tracing::warn!(
            missing = %missing.join(", "),
            "assistant response is missing expected fields"
        );
    }

    let confidence = confidence_map(object.get(CONFIDENCE_KEY));
    let suggestions = Field::GAPS
        .into_iter()
        .filter_map(|field| {
            let value = validate(field, object.get(field.key())?)?;
            Some((field, FieldResolution::ai(value, confidence.get(&field))))
        })
        .collect();

    Ok(ParsedResponse {
        suggestions,
        confidence,
    })
}

fn confidence_map(raw: Option<&Value>) -> BTreeMap<Field, Confidence> {
    let Some(map) = raw.and_then(Value::as_object) else {
        return BTreeMap::new();
    };
    Field::GAPS
        .into_iter()
        .filter_map(|field| {
            let entry = map.get(field.key())?;
            let level = entry
                .get("level")
                .and_then(Value::as_str)
                .map_or(ConfidenceLevel::Unspecified, ConfidenceLevel::parse);
            let reason = entry
                .get("reason")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string);
            Some((field, Confidence { level, reason }))
        })
        .collect()
}

// A usable string: present, not blank, not the sentinel or the placeholder.
fn usable(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty() && s != SENTINEL && s != PLACEHOLDER).then(|| s.to_string())
}

/// Check one suggested value against its field's shape.
///
/// `None` means the field stays a placeholder, either because the assistant
/// declined (sentinel, null, blank) or because the value had the wrong shape.
fn validate(field: Field, value: &Value) -> Option<FieldValue> {
    if value.is_null() {
        return None;
    }
    let validated = match (field.shape(), value) {
        (Shape::Text, Value::String(s)) => Ok(usable(s).map(FieldValue::Text)),
        (Shape::List, Value::String(s)) => Ok(usable(s).map(|s| FieldValue::List(vec![s]))),
        (Shape::List, Value::Array(items)) => list(items).map(|items| {
            let kept: Vec<String> = items.into_iter().filter_map(usable).collect();
            (!kept.is_empty()).then_some(FieldValue::List(kept))
        }),
        (Shape::Contact, Value::String(s)) if usable(s).is_none() => Ok(None),
        (Shape::Contact, Value::Object(map)) => contact(map).map(|c| c.map(FieldValue::Contact)),
        _ => Err(json_kind(value)),
    };

    validated.unwrap_or_else(|kind| {
        tracing::warn!(
            field = %field,
            found = kind,
            "rejecting assistant value of the wrong shape"
        );
        None
    })
}

fn list(items: &[Value]) -> Result<Vec<&str>, &'static str> {
    items
        .iter()
        .map(|v| v.as_str().ok_or(json_kind(v)))
        .collect()
}

fn contact(map: &Map<String, Value>) -> Result<Option<Contact>, &'static str> {
    let part = |key: &str| -> Result<Option<String>, &'static str> {
        match map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(usable(s)),
            Some(other) => Err(json_kind(other)),
        }
    };
    let name = part("fn")?;
    let email = part("hasEmail")?;
    if name.is_none() && email.is_none() {
        return Ok(None);
    }
    let or_placeholder = |v: Option<String>| v.unwrap_or_else(|| PLACEHOLDER.to_string());
    Ok(Some(Contact {
        name: or_placeholder(name),
        email: or_placeholder(email),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Provenance;
    use proptest::prelude::*;
    use serde_json::json;

    fn full_response() -> Value {
        json!({
            "description": "Forest Service road network.",
            "modified": "2024-05-01",
            "contactPoint": { "fn": "EDW Team", "hasEmail": "mailto:edw@usda.gov" },
            "bureauCode": ["005:96"],
            "programCode": "005:059",
            "license": "https://creativecommons.org/publicdomain/zero/1.0/",
            "spatial": "-170.0,17.5,-65.2,71.4",
            "temporal": "INSUFFICIENT_EVIDENCE",
            "theme": ["transportation", "INSUFFICIENT_EVIDENCE"],
            "confidence": {
                "description": { "level": "high", "reason": "REST description" },
                "bureauCode": { "level": "Medium" },
                "temporal": { "level": "low", "reason": "no time info" }
            }
        })
    }

    #[test]
    fn strips_markdown_fences() {
        assert_eq!(strip_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_fences("Here you go:\n```\n{}\n```\nThanks"), "{}");
        assert_eq!(strip_fences("  {}  "), "{}");
        assert_eq!(strip_fences("```JSON\n{}\n```"), "{}");
    }

    #[test]
    fn backticks_inside_bare_json_are_kept() {
        let parsed = parse_response(
            r#"{"description": "see ```code``` here", "license": "x"}"#,
        )
        .unwrap();
        assert_eq!(
            parsed.suggestions[&Field::Description].value,
            FieldValue::text("see ```code``` here")
        );
        assert_eq!(parsed.suggestions.len(), 2);
    }

    #[test]
    fn upper_case_fence_tag_is_stripped() {
        let parsed = parse_response("```JSON\n{\"license\": \"x\"}\n```").unwrap();
        assert_eq!(parsed.suggestions[&Field::License].value, FieldValue::text("x"));

        let parsed = parse_response("Sure:\n```Json\n{\"license\": \"y\"}\n```").unwrap();
        assert_eq!(parsed.suggestions[&Field::License].value, FieldValue::text("y"));
    }

    #[test]
    fn echoed_placeholder_is_not_a_suggestion() {
        let parsed = parse_response(
            &json!({
                "description": PLACEHOLDER,
                "theme": [PLACEHOLDER, "transportation"],
                "contactPoint": { "fn": PLACEHOLDER, "hasEmail": PLACEHOLDER },
                "license": "x"
            })
            .to_string(),
        )
        .unwrap();
        assert!(!parsed.suggestions.contains_key(&Field::Description));
        assert!(!parsed.suggestions.contains_key(&Field::ContactPoint));
        assert_eq!(
            parsed.suggestions[&Field::Theme].value,
            FieldValue::List(vec!["transportation".to_string()])
        );
    }

    #[test]
    fn accepts_well_formed_response() {
        let text = format!("```json\n{}\n```", full_response());
        let parsed = parse_response(&text).unwrap();

        let description = &parsed.suggestions[&Field::Description];
        assert_eq!(description.provenance, Provenance::Ai);
        assert_eq!(description.confidence, Some(ConfidenceLevel::High));
        assert_eq!(description.justification.as_deref(), Some("REST description"));

        assert_eq!(
            parsed.suggestions[&Field::ProgramCode].value,
            FieldValue::List(vec!["005:059".to_string()])
        );
        assert_eq!(
            parsed.suggestions[&Field::Theme].value,
            FieldValue::List(vec!["transportation".to_string()])
        );
        assert_eq!(
            parsed.suggestions[&Field::BureauCode].confidence,
            Some(ConfidenceLevel::Medium)
        );
        assert_eq!(
            parsed.suggestions[&Field::Modified].confidence,
            Some(ConfidenceLevel::Unspecified)
        );
        assert!(!parsed.suggestions.contains_key(&Field::Temporal));
        assert_eq!(parsed.confidence[&Field::Temporal].level, ConfidenceLevel::Low);
    }

    #[test]
    fn unexpected_keys_are_dropped() {
        let mut value = full_response();
        value["title"] = json!("Hijacked title");
        value["notes"] = json!("extra");
        let parsed = parse_response(&value.to_string()).unwrap();
        assert!(!parsed.suggestions.contains_key(&Field::Title));
        assert!(parsed.suggestions.keys().all(|f| f.is_assistant_eligible()));
    }

    #[test]
    fn rejects_non_objects_and_bad_json() {
        assert!(matches!(
            parse_response("I could not find anything."),
            Err(ResponseError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_response("[1, 2]"),
            Err(ResponseError::NotAnObject("array"))
        ));
        assert!(matches!(
            parse_response(r#"{"error": "rate limited"}"#),
            Err(ResponseError::NoExpectedFields)
        ));
    }

    #[test]
    fn wrong_shapes_are_rejected_per_field() {
        let parsed = parse_response(
            &json!({
                "description": 42,
                "spatial": ["a", "b"],
                "bureauCode": ["005:96", 7],
                "license": "https://example.org/license"
            })
            .to_string(),
        )
        .unwrap();
        assert_eq!(
            parsed.suggestions.keys().copied().collect::<Vec<_>>(),
            [Field::License]
        );
    }

    #[test]
    fn contact_sub_values_collapse_independently() {
        let parsed = parse_response(
            &json!({
                "contactPoint": { "fn": "EDW Team", "hasEmail": "INSUFFICIENT_EVIDENCE" }
            })
            .to_string(),
        )
        .unwrap();
        let contact = parsed.suggestions[&Field::ContactPoint].value.as_contact().cloned();
        assert_eq!(
            contact,
            Some(Contact {
                name: "EDW Team".to_string(),
                email: PLACEHOLDER.to_string(),
            })
        );

        let parsed = parse_response(
            &json!({
                "contactPoint": { "fn": "INSUFFICIENT_EVIDENCE", "hasEmail": " " },
                "license": "x"
            })
            .to_string(),
        )
        .unwrap();
        assert!(!parsed.suggestions.contains_key(&Field::ContactPoint));
    }

    proptest! {
        #[test]
        fn sentinel_collapses_every_field(mask in proptest::collection::vec(any::<bool>(), 9)) {
            let mut object = serde_json::Map::new();
            for (field, sentinel) in Field::GAPS.into_iter().zip(&mask) {
                let value = match (field.shape(), *sentinel) {
                    (_, true) => json!(SENTINEL),
                    (Shape::Text, false) => json!("value"),
                    (Shape::List, false) => json!(["value"]),
                    (Shape::Contact, false) => json!({"fn": "n", "hasEmail": "mailto:e@x"}),
                };
                object.insert(field.key().to_string(), value);
            }
            let parsed = parse_response(&Value::Object(object).to_string()).unwrap();
            for (field, sentinel) in Field::GAPS.into_iter().zip(&mask) {
                prop_assert_eq!(parsed.suggestions.contains_key(&field), !*sentinel);
            }
        }
    }
}
