//! DCAT-US catalog records from ESRI service descriptors
//!
//! Resolution happens in tiers. Fields the descriptor determines are
//! `parsed` (or `inferred`, for the publisher guessed from the endpoint
//! host). An assistant may then suggest values for the nine gap fields, and
//! only for those still marked `placeholder`. Every field ends up with
//! exactly one [`FieldResolution`]; the catalog and the gap report are both
//! pure renderings of that set.
//!
//! ```text
//! descriptor ──parse──▶ ServiceFacts ──enrich──▶ EnrichmentFacts?
//!                              │                       │
//!                              └──────resolve◀─────────┘ (+ assistant?)
//!                                        │
//!                                   Resolutions ──▶ CatalogRecord
//!                                        └────────▶ GapReport
//! ```

pub mod builder;
pub mod fields;
mod keywords;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod resolver;
pub mod response;

pub use builder::{build, CatalogRecord};
pub use fields::{
    Confidence, ConfidenceLevel, Contact, Field, FieldResolution, FieldValue, Provenance,
    Resolutions, SENTINEL,
};
pub use keywords::{keywords, BASE_KEYWORDS};
pub use pipeline::{EnrichmentPolicy, Pipeline, PipelineConfig, PipelineOutput};
pub use report::{render, EnrichmentState, GapReport, ReportContext, TierCounts};
pub use resolver::{baseline, resolve, AssistantRun, AssistantStatus};
pub use response::{parse_response, ResponseError};

pub use metagen_wsdl::{MalformedDescriptor, PLACEHOLDER};
