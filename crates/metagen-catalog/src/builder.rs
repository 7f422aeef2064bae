//! DCAT-US v1.1 catalog assembly.
//!
//! [`build`] is a pure function of the descriptor facts and the resolution
//! set. Field order in the serialized document follows struct declaration
//! order, so the same inputs always produce byte-identical JSON.

use crate::fields::{Field, Resolutions};
use metagen_wsdl::{ServiceFacts, PLACEHOLDER};
use serde::{Deserialize, Serialize};

const CONFORMS_TO: &str = "https://project-open-data.cio.gov/v1.1/schema";
const DESCRIBED_BY: &str = "https://project-open-data.cio.gov/v1.1/schema/catalog.json";
const CONTEXT: &str = "https://project-open-data.cio.gov/v1.1/schema/catalog.jsonld";
const LISTED_OPERATIONS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    #[serde(rename = "conformsTo")]
    pub conforms_to: String,
    #[serde(rename = "describedBy")]
    pub described_by: String,
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub dataset: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(rename = "@type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub keyword: Vec<String>,
    pub modified: String,
    pub publisher: Organization,
    pub contact_point: ContactPoint,
    pub identifier: String,
    pub access_level: String,
    pub bureau_code: Vec<String>,
    pub program_code: Vec<String>,
    pub license: String,
    pub spatial: String,
    pub temporal: String,
    pub theme: Vec<String>,
    pub distribution: Vec<Distribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_organization_of: Option<Box<Organization>>,
}

impl Organization {
    fn new(name: impl Into<String>) -> Self {
        Self {
            kind: "org:Organization".to_string(),
            name: name.into(),
            sub_organization_of: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactPoint {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "fn")]
    pub name: String,
    #[serde(rename = "hasEmail")]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "accessURL")]
    pub access_url: String,
    pub format: String,
    pub title: String,
    pub description: String,
    pub media_type: String,
}

impl CatalogRecord {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// Readers below fall back to the placeholder if a resolution ever carries
// a value of the wrong shape.

fn text(resolutions: &Resolutions, field: Field) -> String {
    resolutions
        .get(field)
        .value
        .as_text()
        .unwrap_or(PLACEHOLDER)
        .to_string()
}

fn list(resolutions: &Resolutions, field: Field) -> Vec<String> {
    resolutions
        .get(field)
        .value
        .as_list()
        .map(<[String]>::to_vec)
        .unwrap_or_else(|| vec![PLACEHOLDER.to_string()])
}

fn contact(resolutions: &Resolutions) -> ContactPoint {
    let (name, email) = match resolutions.get(Field::ContactPoint).value.as_contact() {
        Some(c) => (c.name.clone(), c.email.clone()),
        None => (PLACEHOLDER.to_string(), PLACEHOLDER.to_string()),
    };
    ContactPoint {
        kind: "vcard:Contact".to_string(),
        name,
        email,
    }
}

/// `SOAP web service with N operations including A, B, C, D, and others.`
pub fn distribution_description(operations: &[String]) -> String {
    let count = operations.len();
    let noun = if count == 1 { "operation" } else { "operations" };
    if count == 0 {
        return format!("SOAP web service with 0 {noun}.");
    }
    let listed = operations[..count.min(LISTED_OPERATIONS)].join(", ");
    if count > LISTED_OPERATIONS {
        format!("SOAP web service with {count} {noun} including {listed}, and others.")
    } else {
        format!("SOAP web service with {count} {noun}: {listed}.")
    }
}

/// Assemble the catalog document.
pub fn build(facts: &ServiceFacts, resolutions: &Resolutions) -> CatalogRecord {
    let mut publisher = Organization::new(text(resolutions, Field::PublisherName));
    if let Some(parent) = &facts.publisher_parent {
        publisher.sub_organization_of = Some(Box::new(Organization::new(parent)));
    }

    let service_name = facts.service_name.as_deref().unwrap_or(PLACEHOLDER);
    let distribution = Distribution {
        kind: "dcat:Distribution".to_string(),
        access_url: text(resolutions, Field::AccessUrl),
        format: text(resolutions, Field::Format),
        title: format!("{service_name} (SOAP endpoint)"),
        description: distribution_description(&facts.operations),
        media_type: text(resolutions, Field::MediaType),
    };

    let dataset = Dataset {
        kind: "dcat:Dataset".to_string(),
        title: text(resolutions, Field::Title),
        description: text(resolutions, Field::Description),
        keyword: list(resolutions, Field::Keyword),
        modified: text(resolutions, Field::Modified),
        publisher,
        contact_point: contact(resolutions),
        identifier: text(resolutions, Field::Identifier),
        access_level: text(resolutions, Field::AccessLevel),
        bureau_code: list(resolutions, Field::BureauCode),
        program_code: list(resolutions, Field::ProgramCode),
        license: text(resolutions, Field::License),
        spatial: text(resolutions, Field::Spatial),
        temporal: text(resolutions, Field::Temporal),
        theme: list(resolutions, Field::Theme),
        distribution: vec![distribution],
    };

    CatalogRecord {
        conforms_to: CONFORMS_TO.to_string(),
        described_by: DESCRIBED_BY.to_string(),
        context: CONTEXT.to_string(),
        kind: "dcat:Catalog".to_string(),
        dataset: vec![dataset],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Contact, FieldResolution, FieldValue};
    use crate::resolver::baseline;

    fn facts() -> ServiceFacts {
        metagen_wsdl::parse(
            r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
                           xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/">
                 <portType name="P">
                   <operation name="Identify"/><operation name="Find"/>
                   <operation name="ExportMapImage"/><operation name="GetLegendInfo"/>
                   <operation name="QueryFeatureData"/>
                 </portType>
                 <service name="EDW_RoadBasic_01_MapServer">
                   <port name="p"><soap:address location="https://apps.fs.usda.gov/arcx/services/EDW/EDW_RoadBasic_01/MapServer"/></port>
                 </service>
               </definitions>"#,
        )
        .unwrap()
    }

    #[test]
    fn envelope_and_dataset_keys_are_ordered() {
        let facts = facts();
        let json = build(&facts, &baseline(&facts)).to_json_pretty().unwrap();

        let envelope = ["\"conformsTo\"", "\"describedBy\"", "\"@context\"", "\"dataset\""];
        let positions: Vec<usize> = envelope.iter().filter_map(|k| json.find(k)).collect();
        assert_eq!(positions.len(), envelope.len());
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        let dataset_keys = [
            "\"title\"",
            "\"keyword\"",
            "\"modified\"",
            "\"publisher\"",
            "\"contactPoint\"",
            "\"identifier\"",
            "\"accessLevel\"",
            "\"bureauCode\"",
            "\"theme\"",
            "\"distribution\"",
        ];
        let positions: Vec<usize> = dataset_keys.iter().filter_map(|k| json.find(k)).collect();
        assert_eq!(positions.len(), dataset_keys.len());
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn placeholders_render_in_field_shape() {
        let facts = facts();
        let record = build(&facts, &baseline(&facts));
        let dataset = &record.dataset[0];

        assert_eq!(dataset.title, "EDW RoadBasic 1");
        assert_eq!(dataset.description, PLACEHOLDER);
        assert_eq!(dataset.bureau_code, [PLACEHOLDER]);
        assert_eq!(dataset.contact_point.name, PLACEHOLDER);
        assert_eq!(dataset.contact_point.email, PLACEHOLDER);
        assert_eq!(dataset.access_level, "public");
        assert_eq!(dataset.publisher.name, "U.S. Forest Service");
        assert_eq!(
            dataset.publisher.sub_organization_of.as_ref().map(|o| o.name.as_str()),
            Some("U.S. Department of Agriculture")
        );
    }

    #[test]
    fn distribution_is_synthesized_from_endpoint_and_operations() {
        let facts = facts();
        let record = build(&facts, &baseline(&facts));
        let distribution = &record.dataset[0].distribution[0];

        assert_eq!(distribution.access_url, record.dataset[0].identifier);
        assert_eq!(distribution.title, "EDW_RoadBasic_01_MapServer (SOAP endpoint)");
        assert_eq!(
            distribution.description,
            "SOAP web service with 5 operations including ExportMapImage, Find, \
             GetLegendInfo, Identify, and others."
        );
        assert_eq!(distribution.media_type, "application/xml");
    }

    #[test]
    fn short_operation_lists_are_spelled_out() {
        let ops = ["Find".to_string(), "Identify".to_string()];
        assert_eq!(
            distribution_description(&ops),
            "SOAP web service with 2 operations: Find, Identify."
        );
        assert_eq!(
            distribution_description(&ops[..1]),
            "SOAP web service with 1 operation: Find."
        );
        assert_eq!(distribution_description(&[]), "SOAP web service with 0 operations.");
    }

    #[test]
    fn resolved_values_are_copied_verbatim() {
        let facts = facts();
        let resolutions = baseline(&facts).fill_gaps(
            &[(
                Field::ContactPoint,
                FieldResolution::ai(
                    FieldValue::Contact(Contact {
                        name: "EDW Team".to_string(),
                        email: PLACEHOLDER.to_string(),
                    }),
                    None,
                ),
            )]
            .into(),
        );
        let record = build(&facts, &resolutions);
        assert_eq!(record.dataset[0].contact_point.name, "EDW Team");
        assert_eq!(record.dataset[0].contact_point.email, PLACEHOLDER);
    }
}
