//! End-to-end run: parse, enrich, resolve, build, report.

use crate::builder::{build, CatalogRecord};
use crate::fields::Resolutions;
use crate::report::{render, EnrichmentState, GapReport, ReportContext};
use crate::resolver::{resolve, AssistantRun};
use chrono::{DateTime, Utc};
use metagen_llm::{build_backend, Assistant, AssistantConfig};
use metagen_rest::{enrich, EnrichmentFacts, HttpMetadataSource, MetadataSource};
use metagen_wsdl::{MalformedDescriptor, ServiceFacts};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// When to fetch REST metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnrichmentPolicy {
    /// Only when an assistant will consume it.
    #[default]
    Auto,
    Always,
    Never,
}

impl FromStr for EnrichmentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(EnrichmentPolicy::Auto),
            "always" => Ok(EnrichmentPolicy::Always),
            "never" => Ok(EnrichmentPolicy::Never),
            other => Err(format!(
                "unknown enrichment policy {other:?} (expected auto, always or never)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// `None` disables the assistant.
    pub assistant: Option<AssistantConfig>,
    pub enrichment: EnrichmentPolicy,
    pub enrichment_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            assistant: None,
            enrichment: EnrichmentPolicy::Auto,
            enrichment_timeout: metagen_rest::DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub facts: ServiceFacts,
    pub enrichment: Option<EnrichmentFacts>,
    pub resolutions: Resolutions,
    pub run: AssistantRun,
    pub catalog: CatalogRecord,
    pub report: GapReport,
}

pub struct Pipeline {
    metadata: Box<dyn MetadataSource>,
    assistant: Option<Box<dyn Assistant>>,
    enrichment: EnrichmentPolicy,
}

impl Pipeline {
    /// Wire up the HTTP metadata source and the configured backend.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            metadata: Box::new(HttpMetadataSource::new(config.enrichment_timeout)),
            assistant: config.assistant.map(build_backend),
            enrichment: config.enrichment,
        }
    }

    pub fn new(
        metadata: Box<dyn MetadataSource>,
        assistant: Option<Box<dyn Assistant>>,
        enrichment: EnrichmentPolicy,
    ) -> Self {
        Self {
            metadata,
            assistant,
            enrichment,
        }
    }

    fn should_enrich(&self) -> bool {
        match self.enrichment {
            EnrichmentPolicy::Auto => self.assistant.is_some(),
            EnrichmentPolicy::Always => true,
            EnrichmentPolicy::Never => false,
        }
    }

    /// Run on an in-memory document.
    ///
    /// Only a malformed descriptor is an error; enrichment and assistant
    /// failures are recorded in the output.
    pub fn run(
        &self,
        document: &str,
        source_document: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<PipelineOutput, MalformedDescriptor> {
        let facts = metagen_wsdl::parse(document)?;
        tracing::info!(
            service = facts.service_name.as_deref().unwrap_or_default(),
            operations = facts.operations.len(),
            "parsed descriptor"
        );

        let (enrichment, state) = if self.should_enrich() {
            let enrichment = enrich(facts.endpoint_url.as_deref(), self.metadata.as_ref());
            let state = if enrichment.is_some() {
                EnrichmentState::Available
            } else {
                EnrichmentState::Unavailable
            };
            (enrichment, state)
        } else {
            (None, EnrichmentState::Skipped)
        };

        let (resolutions, run) = resolve(&facts, enrichment.as_ref(), self.assistant.as_deref());
        let catalog = build(&facts, &resolutions);
        let context = ReportContext {
            source_document: source_document.to_string(),
            generated_at,
            enrichment: state,
        };
        let report = render(&facts, &resolutions, &run, &context);

        Ok(PipelineOutput {
            facts,
            enrichment,
            resolutions,
            run,
            catalog,
            report,
        })
    }

    /// Read `path` and run on its contents; the file name labels the report.
    pub fn run_file(
        &self,
        path: &Path,
        generated_at: DateTime<Utc>,
    ) -> Result<PipelineOutput, MalformedDescriptor> {
        let document = std::fs::read_to_string(path).map_err(|source| MalformedDescriptor::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.run(&document, &name, generated_at)
    }
}
