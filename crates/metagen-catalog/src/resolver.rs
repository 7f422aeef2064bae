//! Gap resolution: one provenance-tagged value per tracked field.

use crate::fields::{Confidence, Field, FieldResolution, FieldValue, Resolutions};
use crate::keywords::keywords;
use crate::prompt::build_messages;
use crate::response::parse_response;
use metagen_llm::Assistant;
use metagen_rest::EnrichmentFacts;
use metagen_wsdl::ServiceFacts;
use serde::Serialize;
use std::collections::BTreeMap;

pub const DISTRIBUTION_FORMAT: &str = "ESRI SOAP MapServer";
pub const DISTRIBUTION_MEDIA_TYPE: &str = "application/xml";
pub const DEFAULT_ACCESS_LEVEL: &str = "public";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AssistantStatus {
    Disabled,
    Succeeded,
    Failed { error: String },
}

/// What happened to the assistant during one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantRun {
    #[serde(flatten)]
    pub status: AssistantStatus,
    pub backend: Option<String>,
    pub model: Option<String>,
    pub confidence: BTreeMap<Field, Confidence>,
}

impl AssistantRun {
    pub fn disabled() -> Self {
        Self {
            status: AssistantStatus::Disabled,
            backend: None,
            model: None,
            confidence: BTreeMap::new(),
        }
    }

    fn started(assistant: &dyn Assistant) -> Self {
        Self {
            status: AssistantStatus::Succeeded,
            backend: Some(assistant.name().to_string()),
            model: assistant.model().map(str::to_string),
            confidence: BTreeMap::new(),
        }
    }

    fn failed(mut self, error: impl ToString) -> Self {
        self.status = AssistantStatus::Failed {
            error: error.to_string(),
        };
        self
    }

    pub fn succeeded(&self) -> bool {
        self.status == AssistantStatus::Succeeded
    }

    /// `Enabled`, `Disabled` or `Failed: <reason>`.
    pub fn status_label(&self) -> String {
        match &self.status {
            AssistantStatus::Disabled => "Disabled".to_string(),
            AssistantStatus::Succeeded => "Enabled".to_string(),
            AssistantStatus::Failed { error } => format!("Failed: {error}"),
        }
    }
}

/// Resolutions from the descriptor alone: mapped fields parsed or inferred,
/// every gap field a placeholder.
pub fn baseline(facts: &ServiceFacts) -> Resolutions {
    let endpoint = || {
        facts
            .endpoint_url
            .as_deref()
            .map(|url| FieldResolution::parsed(FieldValue::text(url)))
    };

    Resolutions::from_fn(|field| {
        let resolved = match field {
            Field::Title => (!facts.derived_title.is_empty())
                .then(|| FieldResolution::parsed(FieldValue::text(&facts.derived_title))),
            Field::Identifier | Field::AccessUrl => endpoint(),
            Field::Format => Some(FieldResolution::parsed(FieldValue::text(DISTRIBUTION_FORMAT))),
            Field::MediaType => Some(FieldResolution::parsed(FieldValue::text(
                DISTRIBUTION_MEDIA_TYPE,
            ))),
            Field::PublisherName => facts
                .publisher()
                .is_known()
                .then(|| FieldResolution::inferred(FieldValue::text(&facts.publisher_name))),
            Field::Keyword => Some(FieldResolution::parsed(FieldValue::List(keywords(
                facts.service_name.as_deref(),
            )))),
            Field::AccessLevel => Some(FieldResolution::parsed(FieldValue::text(
                DEFAULT_ACCESS_LEVEL,
            ))),
            _ => None,
        };
        resolved.unwrap_or_else(|| FieldResolution::placeholder(field))
    })
}

/// Resolve every tracked field, consulting `assistant` for the gap fields.
///
/// Assistant failures of any kind leave the gap fields as placeholders and
/// are reported through the returned [`AssistantRun`], never as an error.
pub fn resolve(
    facts: &ServiceFacts,
    enrichment: Option<&EnrichmentFacts>,
    assistant: Option<&dyn Assistant>,
) -> (Resolutions, AssistantRun) {
    let base = baseline(facts);
    let Some(assistant) = assistant else {
        return (base, AssistantRun::disabled());
    };

    let run = AssistantRun::started(assistant);
    tracing::info!(backend = assistant.name(), "requesting gap suggestions");

    let reply = match assistant.chat(&build_messages(facts, enrichment)) {
        Ok(reply) => reply,
        Err(err) => {
            tracing::warn!(backend = assistant.name(), error = %err, "assistant unavailable");
            return (base, run.failed(err));
        }
    };

    match parse_response(&reply) {
        Ok(parsed) => {
            let resolutions = base.fill_gaps(&parsed.suggestions);
            let run = AssistantRun {
                confidence: parsed.confidence,
                ..run
            };
            (resolutions, run)
        }
        Err(err) => {
            tracing::warn!(backend = assistant.name(), error = %err, "assistant response rejected");
            (base, run.failed(err))
        }
    }
}
