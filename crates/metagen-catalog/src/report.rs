//! Tiered gap report for human review.
//!
//! [`render`] partitions the tracked fields into three tiers (mapped,
//! assistant-filled, remaining gaps) and carries nothing the resolution set
//! and run metadata do not already say. [`GapReport::to_markdown`] lays it
//! out with a front matter block so static-site generators can list it.

use crate::fields::{Field, Provenance, Resolutions};
use crate::resolver::AssistantRun;
use chrono::{DateTime, Utc};
use metagen_wsdl::{ServiceFacts, PLACEHOLDER};
use serde::Serialize;

pub const SOURCE_FILE_TYPE: &str = "ESRI ArcGIS MapServer WSDL";
const SUMMARY_BUDGET: usize = 80;
const NOT_AVAILABLE: &str = "N/A";

/// Whether REST metadata was consulted for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentState {
    Available,
    Unavailable,
    Skipped,
}

impl EnrichmentState {
    fn label(self) -> &'static str {
        match self {
            EnrichmentState::Available => "Available",
            EnrichmentState::Unavailable => "Unavailable",
            EnrichmentState::Skipped => "Not requested",
        }
    }
}

/// Inputs that are not facts about the service.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub source_document: String,
    pub generated_at: DateTime<Utc>,
    pub enrichment: EnrichmentState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MappedStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "PARTIAL")]
    Partial,
}

impl MappedStatus {
    fn as_str(self) -> &'static str {
        match self {
            MappedStatus::Ok => "OK",
            MappedStatus::Partial => "PARTIAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedRow {
    pub field: Field,
    pub status: MappedStatus,
    pub source: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiRow {
    pub field: Field,
    pub confidence: String,
    pub summary: String,
    pub justification: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapRow {
    pub field: Field,
    pub note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub mapped: usize,
    pub ai_filled: usize,
    pub gaps: usize,
}

impl TierCounts {
    pub fn total(&self) -> usize {
        self.mapped + self.ai_filled + self.gaps
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapReport {
    pub title: String,
    pub date: String,
    /// `(property, value)` pairs for the source-information table.
    pub header: Vec<(String, String)>,
    pub mapped: Vec<MappedRow>,
    pub ai_filled: Vec<AiRow>,
    pub gaps: Vec<GapRow>,
}

fn mapped_source(field: Field) -> &'static str {
    match field {
        Field::Title => "Derived from service name",
        Field::Identifier | Field::AccessUrl => "Service endpoint URL",
        Field::Format => "ESRI SOAP MapServer",
        Field::MediaType => "application/xml",
        Field::PublisherName => "Inferred from domain",
        Field::Keyword => "Partial, derived from service name",
        Field::AccessLevel => "Defaulted to 'public'",
        _ => "",
    }
}

fn gap_reason(field: Field) -> &'static str {
    match field {
        Field::Modified => "No timestamp in WSDL",
        Field::BureauCode | Field::ProgramCode => "Federal-specific",
        Field::Spatial => "WSDL defines spatial types but no extent values",
        _ => "Not available in WSDL",
    }
}

/// Cut `text` to the display budget, marking the cut with `...`.
pub fn truncate_summary(text: &str) -> String {
    if text.chars().count() <= SUMMARY_BUDGET {
        return text.to_string();
    }
    let kept: String = text.chars().take(SUMMARY_BUDGET - 3).collect();
    format!("{kept}...")
}

fn code(value: Option<&str>) -> String {
    format!("`{}`", value.unwrap_or(NOT_AVAILABLE))
}

pub fn render(
    facts: &ServiceFacts,
    resolutions: &Resolutions,
    run: &AssistantRun,
    context: &ReportContext,
) -> GapReport {
    let mut header = vec![
        ("Source document".to_string(), format!("`{}`", context.source_document)),
        ("Source file type".to_string(), SOURCE_FILE_TYPE.to_string()),
        ("Service name".to_string(), code(facts.service_name.as_deref())),
        ("Endpoint URL".to_string(), code(facts.endpoint_url.as_deref())),
        ("ESRI namespace".to_string(), code(facts.namespace.as_deref())),
        ("Operations found".to_string(), facts.operations.len().to_string()),
        ("REST enrichment".to_string(), context.enrichment.label().to_string()),
        ("AI enrichment".to_string(), run.status_label()),
    ];
    if run.succeeded() {
        header.push((
            "AI bot".to_string(),
            run.backend.clone().unwrap_or_else(|| "unknown".to_string()),
        ));
        header.push((
            "AI model".to_string(),
            run.model.clone().unwrap_or_else(|| "unknown".to_string()),
        ));
    }

    let mapped = Field::MAPPED
        .into_iter()
        .map(|field| MappedRow {
            field,
            status: if resolutions.get(field).provenance.is_trusted() {
                MappedStatus::Ok
            } else {
                MappedStatus::Partial
            },
            source: mapped_source(field),
        })
        .collect();

    let mut ai_filled = Vec::new();
    let mut gaps = Vec::new();
    for field in Field::GAPS {
        let resolution = resolutions.get(field);
        if resolution.provenance == Provenance::Ai {
            ai_filled.push(AiRow {
                field,
                confidence: resolution
                    .confidence
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                summary: truncate_summary(&resolution.value.summary()),
                justification: resolution.justification.clone().unwrap_or_default(),
            });
        } else {
            gaps.push(GapRow {
                field,
                note: format!("{} — requires manual input", gap_reason(field)),
            });
        }
    }

    GapReport {
        title: format!(
            "Gap Report: {}",
            facts.service_name.as_deref().unwrap_or("Unknown Service")
        ),
        date: context.generated_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        header,
        mapped,
        ai_filled,
        gaps,
    }
}

// Keep table cells on one row.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

impl GapReport {
    pub fn counts(&self) -> TierCounts {
        TierCounts {
            mapped: self.mapped.len(),
            ai_filled: self.ai_filled.len(),
            gaps: self.gaps.len(),
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("---\n");
        out.push_str(&format!("title: \"{}\"\n", self.title.replace('"', "\\\"")));
        out.push_str(&format!("date: {}\n", self.date));
        out.push_str("---\n\n");
        out.push_str("# DCAT-US Gap Report: ESRI WSDL Crosswalk\n\n");

        out.push_str("## Source Information\n\n");
        out.push_str("| Property | Value |\n");
        out.push_str("|---|---|\n");
        for (property, value) in &self.header {
            out.push_str(&format!("| **{property}** | {} |\n", cell(value)));
        }

        out.push_str("\n## Mapped Fields (extracted from WSDL)\n\n");
        out.push_str("| Status | DCAT-US Field | Source |\n");
        out.push_str("|---|---|---|\n");
        for row in &self.mapped {
            out.push_str(&format!(
                "| {} | `{}` | {} |\n",
                row.status.as_str(),
                row.field,
                row.source
            ));
        }

        if !self.ai_filled.is_empty() {
            out.push_str("\n## AI-Filled Fields (suggested by LLM)\n\n");
            out.push_str("| Confidence | DCAT-US Field | Value | Justification |\n");
            out.push_str("|---|---|---|---|\n");
            for row in &self.ai_filled {
                out.push_str(&format!(
                    "| {} | `{}` | {} | {} |\n",
                    row.confidence,
                    row.field,
                    cell(&row.summary),
                    cell(&row.justification)
                ));
            }
            out.push_str("\n*AI-suggested values should be reviewed before publication.*\n");
        }

        if !self.gaps.is_empty() {
            out.push_str("\n## Remaining Gaps (require manual input)\n\n");
            out.push_str("| DCAT-US Field | Notes |\n");
            out.push_str("|---|---|\n");
            for row in &self.gaps {
                out.push_str(&format!("| `{}` | {} |\n", row.field, row.note));
            }
        }

        let counts = self.counts();
        out.push_str("\n## Summary\n\n");
        out.push_str(&format!("- **{}** fields mapped from the WSDL\n", counts.mapped));
        out.push_str(&format!("- **{}** fields filled by AI\n", counts.ai_filled));
        out.push_str(&format!(
            "- **{}** gaps still requiring manual input\n",
            counts.gaps
        ));
        out.push_str(&format!(
            "\nFields marked with `{PLACEHOLDER}` in the output JSON must be filled in manually.\n"
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Confidence, ConfidenceLevel, FieldResolution, FieldValue};
    use crate::resolver::{baseline, AssistantStatus};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn facts(endpoint: &str) -> ServiceFacts {
        metagen_wsdl::parse(&format!(
            r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
                           xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
                           targetNamespace="http://www.esri.com/schemas/ArcGIS/10.8">
                 <portType name="P"><operation name="Find"/></portType>
                 <service name="EDW_RoadBasic_01_MapServer">
                   <port name="p"><soap:address location="{endpoint}"/></port>
                 </service>
               </definitions>"#
        ))
        .unwrap()
    }

    fn context() -> ReportContext {
        ReportContext {
            source_document: "EDW_RoadBasic_01_MapServer.wsdl".to_string(),
            generated_at: Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap(),
            enrichment: EnrichmentState::Skipped,
        }
    }

    fn succeeded_run() -> AssistantRun {
        AssistantRun {
            status: AssistantStatus::Succeeded,
            backend: Some("claude".to_string()),
            model: Some("claude-x".to_string()),
            confidence: BTreeMap::new(),
        }
    }

    #[test]
    fn disabled_run_reports_every_gap() {
        let facts = facts("https://apps.fs.usda.gov/arcx/services/EDW/X/MapServer");
        let report = render(&facts, &baseline(&facts), &AssistantRun::disabled(), &context());

        assert_eq!(report.counts(), TierCounts { mapped: 8, ai_filled: 0, gaps: 9 });
        assert!(report.mapped.iter().all(|r| r.status == MappedStatus::Ok));
        assert!(report
            .header
            .contains(&("AI enrichment".to_string(), "Disabled".to_string())));
        assert!(!report.header.iter().any(|(k, _)| k == "AI bot"));

        let md = report.to_markdown();
        assert!(md.starts_with("---\ntitle: \"Gap Report: EDW_RoadBasic_01_MapServer\"\ndate: 2025-03-14T09:26:53\n---\n"));
        assert!(md.contains("| `spatial` | WSDL defines spatial types but no extent values — requires manual input |"));
        assert!(md.contains("- **0** fields filled by AI"));
        assert!(!md.contains("## AI-Filled Fields"));
    }

    #[test]
    fn markdown_sections_are_separated_by_single_blank_lines() {
        let facts = facts("https://apps.fs.usda.gov/arcx/services/EDW/X/MapServer");
        let report = render(&facts, &baseline(&facts), &AssistantRun::disabled(), &context());
        let md = report.to_markdown();

        assert!(md.contains(
            "\n---\n\n# DCAT-US Gap Report: ESRI WSDL Crosswalk\n\n## Source Information\n\n| Property | Value |\n|---|---|\n| **"
        ));
        assert!(md.contains("|\n\n## Mapped Fields (extracted from WSDL)\n\n| Status |"));
        assert!(md.contains("|\n\n## Remaining Gaps (require manual input)\n\n| DCAT-US Field | Notes |"));
        assert!(md.contains("\n\n## Summary\n\n- **8** fields mapped from the WSDL\n"));
        assert!(!md.contains("\n\n\n"));
        assert!(md.ends_with("must be filled in manually.\n"));
    }

    #[test]
    fn unknown_publisher_is_partial() {
        let facts = facts("https://maps.example.com/arcgis/services/X/MapServer");
        let report = render(&facts, &baseline(&facts), &AssistantRun::disabled(), &context());
        let publisher = report
            .mapped
            .iter()
            .find(|r| r.field == Field::PublisherName)
            .map(|r| r.status);
        assert_eq!(publisher, Some(MappedStatus::Partial));
        assert_eq!(report.counts().mapped, 8);
    }

    #[test]
    fn ai_rows_carry_confidence_and_truncated_summary() {
        let facts = facts("https://apps.fs.usda.gov/arcx/services/EDW/X/MapServer");
        let long = "x".repeat(100);
        let high = Confidence {
            level: ConfidenceLevel::High,
            reason: Some("from REST | description".to_string()),
        };
        let resolutions = baseline(&facts).fill_gaps(&BTreeMap::from([
            (Field::Description, FieldResolution::ai(FieldValue::text(&long), Some(&high))),
            (
                Field::Theme,
                FieldResolution::ai(
                    FieldValue::List(vec!["transportation".into(), "roads".into()]),
                    None,
                ),
            ),
        ]));
        let report = render(&facts, &resolutions, &succeeded_run(), &context());

        assert_eq!(report.counts(), TierCounts { mapped: 8, ai_filled: 2, gaps: 7 });
        let description = &report.ai_filled[0];
        assert_eq!(description.confidence, "HIGH");
        assert_eq!(description.summary.chars().count(), 80);
        assert!(description.summary.ends_with("..."));
        assert_eq!(report.ai_filled[1].summary, "transportation, roads");
        assert_eq!(report.ai_filled[1].confidence, "UNSPECIFIED");

        let md = report.to_markdown();
        assert!(md.contains("| **AI enrichment** | Enabled |"));
        assert!(md.contains("| **AI model** | claude-x |"));
        assert!(md.contains("from REST \\| description"));
        assert!(md.contains("*AI-suggested values should be reviewed before publication.*"));
    }

    #[test]
    fn failed_run_names_the_reason() {
        let facts = facts("https://apps.fs.usda.gov/arcx/services/EDW/X/MapServer");
        let run = AssistantRun {
            status: AssistantStatus::Failed {
                error: "claude backend requires ANTHROPIC_API_KEY".to_string(),
            },
            ..succeeded_run()
        };
        let report = render(&facts, &baseline(&facts), &run, &context());
        assert!(report.header.contains(&(
            "AI enrichment".to_string(),
            "Failed: claude backend requires ANTHROPIC_API_KEY".to_string()
        )));
        assert!(!report.header.iter().any(|(k, _)| k == "AI model"));
    }

    #[test]
    fn truncation_respects_budget() {
        assert_eq!(truncate_summary("short"), "short");
        let exact = "y".repeat(80);
        assert_eq!(truncate_summary(&exact), exact);
        let cut = truncate_summary(&"é".repeat(81));
        assert_eq!(cut.chars().count(), 80);
    }
}
