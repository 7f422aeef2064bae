//! WSDL reader for metagen
//!
//! Extracts the descriptive facts a catalog record can be built from:
//! - service name and derived title,
//! - SOAP endpoint address and host,
//! - target namespace (ESRI schema version),
//! - the distinct operation names across every `portType`,
//! - publisher identity inferred from the endpoint host.
//!
//! Only a document that is not well-formed, or whose root is not a WSDL
//! `definitions` element, is an error. Anything else that is missing simply
//! stays `None` in [`ServiceFacts`].

mod publisher;
mod title;

pub use publisher::{endpoint_domain, infer_publisher, Publisher, PLACEHOLDER};
pub use title::{derive_title, SERVICE_SUFFIX};

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

pub const SOAP11_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
pub const SOAP12_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";

const ROOT_ELEMENT: &str = "definitions";

/// Facts extracted from one descriptor document. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceFacts {
    pub service_name: Option<String>,
    pub endpoint_url: Option<String>,
    /// `targetNamespace` of the root element.
    pub namespace: Option<String>,
    /// Distinct operation names, sorted.
    pub operations: Vec<String>,
    pub domain: Option<String>,
    /// Empty when the document names no service.
    pub derived_title: String,
    /// Known publisher, or [`PLACEHOLDER`].
    pub publisher_name: String,
    pub publisher_parent: Option<String>,
}

impl ServiceFacts {
    pub fn publisher(&self) -> Publisher {
        Publisher {
            name: self.publisher_name.clone(),
            parent: self.publisher_parent.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MalformedDescriptor {
    #[error("descriptor is not well-formed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("descriptor has no root element")]
    Empty,
    #[error("root element <{0}> is not a WSDL service definition")]
    UnexpectedRoot(String),
    #[error("descriptor uses undeclared namespace prefix `{0}`")]
    UnboundPrefix(String),
    #[error("descriptor ends inside an open <{0}> element")]
    Unclosed(String),
    #[error("descriptor has content after the root element: <{0}>")]
    TrailingElement(String),
    #[error("failed to read descriptor {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Read and parse a descriptor file.
pub fn parse_file(path: impl AsRef<Path>) -> Result<ServiceFacts, MalformedDescriptor> {
    let path = path.as_ref();
    let document = std::fs::read_to_string(path).map_err(|source| MalformedDescriptor::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&document)
}

// Position of an open element relative to the parts of the document we read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Root,
    Service { first: bool },
    Port { first: bool },
    PortType,
    Other,
}

#[derive(Default)]
struct Collected {
    root_namespace: Option<String>,
    target_namespace: Option<String>,
    service_name: Option<String>,
    seen_service: bool,
    seen_port: bool,
    soap11_address: Option<String>,
    soap12_address: Option<String>,
    operations: BTreeSet<String>,
}

/// Parse a WSDL document into [`ServiceFacts`].
pub fn parse(document: &str) -> Result<ServiceFacts, MalformedDescriptor> {
    let mut reader = NsReader::from_str(document);
    let mut stack: Vec<(Frame, String)> = Vec::new();
    let mut collected = Collected::default();
    let mut root_closed = false;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        let namespace = match resolved {
            ResolveResult::Bound(Namespace(ns)) => Some(String::from_utf8_lossy(ns).into_owned()),
            ResolveResult::Unbound => None,
            ResolveResult::Unknown(prefix) => {
                return Err(MalformedDescriptor::UnboundPrefix(
                    String::from_utf8_lossy(&prefix).into_owned(),
                ))
            }
        };

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if root_closed {
                    return Err(MalformedDescriptor::TrailingElement(local));
                }
                let frame = open_element(&mut collected, &stack, namespace, &local, e)?;
                if matches!(event, Event::Start(_)) {
                    stack.push((frame, local));
                } else if stack.is_empty() {
                    root_closed = true;
                }
            }
            Event::End(_) => {
                stack.pop();
                if stack.is_empty() {
                    root_closed = true;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some((_, open)) = stack.last() {
        return Err(MalformedDescriptor::Unclosed(open.clone()));
    }
    if !root_closed {
        return Err(MalformedDescriptor::Empty);
    }

    Ok(finish(collected))
}

fn open_element(
    collected: &mut Collected,
    stack: &[(Frame, String)],
    namespace: Option<String>,
    local: &str,
    element: &BytesStart<'_>,
) -> Result<Frame, MalformedDescriptor> {
    let Some((parent, _)) = stack.last() else {
        if local != ROOT_ELEMENT {
            return Err(MalformedDescriptor::UnexpectedRoot(local.to_string()));
        }
        collected.root_namespace = namespace;
        collected.target_namespace = attribute(element, "targetNamespace")?;
        return Ok(Frame::Root);
    };

    // WSDL elements live in whatever namespace the root declares.
    let in_root_ns = namespace == collected.root_namespace;

    let frame = match (*parent, local) {
        (Frame::Root, "service") if in_root_ns => {
            let first = !collected.seen_service;
            if first {
                collected.seen_service = true;
                collected.service_name = attribute(element, "name")?;
            }
            Frame::Service { first }
        }
        (Frame::Service { first: true }, "port") if in_root_ns => {
            let first = !collected.seen_port;
            collected.seen_port = true;
            Frame::Port { first }
        }
        (Frame::Port { first: true }, "address") => {
            let slot = match namespace.as_deref() {
                Some(SOAP11_NS) => Some(&mut collected.soap11_address),
                Some(SOAP12_NS) => Some(&mut collected.soap12_address),
                _ => None,
            };
            if let Some(slot) = slot {
                if slot.is_none() {
                    *slot = attribute(element, "location")?;
                }
            }
            Frame::Other
        }
        (_, "portType") if in_root_ns => Frame::PortType,
        (Frame::PortType, "operation") if in_root_ns => {
            if let Some(name) = attribute(element, "name")? {
                collected.operations.insert(name);
            }
            Frame::Other
        }
        _ => Frame::Other,
    };
    Ok(frame)
}

/// Value of an unprefixed attribute; empty values count as absent.
fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, MalformedDescriptor> {
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = attr.unescape_value()?.trim().to_string();
            return Ok(if value.is_empty() { None } else { Some(value) });
        }
    }
    Ok(None)
}

fn finish(collected: Collected) -> ServiceFacts {
    let endpoint_url = collected.soap11_address.or(collected.soap12_address);
    let domain = endpoint_url.as_deref().and_then(endpoint_domain);
    let publisher = infer_publisher(domain.as_deref());
    let derived_title = collected
        .service_name
        .as_deref()
        .map(derive_title)
        .unwrap_or_default();

    ServiceFacts {
        service_name: collected.service_name,
        endpoint_url,
        namespace: collected.target_namespace,
        operations: collected.operations.into_iter().collect(),
        domain,
        derived_title,
        publisher_name: publisher.name,
        publisher_parent: publisher.parent,
    }
}
