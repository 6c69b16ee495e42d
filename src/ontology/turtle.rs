//! Turtle ingestion for [`OntologyStore`](super::store::OntologyStore).
//!
//! Only terms under the configured namespace become classes or properties.
//! Blank nodes (restrictions, unions) are skipped, except that any
//! `owl:equivalentClass` axiom marks its subject as a defined class.

use std::collections::BTreeMap;

use oxrdf::{
    vocab::{rdf, rdfs},
    NamedNode, NamedNodeRef, Term,
};
use oxttl::TurtleParser;

use super::{
    entities::{OntologyClass, OntologyProperty, PropertyKind},
    store::{OntologyStore, OntologyStoreBuilder, SchemaLoadError},
    value_objects::{local_name, Iri},
};

const OWL_CLASS: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#Class");
const OWL_OBJECT_PROPERTY: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#ObjectProperty");
const OWL_DATATYPE_PROPERTY: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#DatatypeProperty");
const OWL_EQUIVALENT_CLASS: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#equivalentClass");
const SKOS_PREF_LABEL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#prefLabel");
const SKOS_DEFINITION: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#definition");

const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema#";

/// Text with a rank; lower ranks win, equal ranks keep the first seen.
#[derive(Default)]
struct Ranked(Option<(u8, String)>);

impl Ranked {
    fn offer(&mut self, rank: u8, text: &str) {
        let text = collapse_whitespace(text);
        if text.is_empty() {
            return;
        }
        match &self.0 {
            Some((current, _)) if *current <= rank => {}
            _ => self.0 = Some((rank, text)),
        }
    }

    fn take(self) -> Option<String> {
        self.0.map(|(_, text)| text)
    }
}

#[derive(Default)]
struct Facts {
    is_class: bool,
    property_kind: Option<PropertyKind>,
    defined: bool,
    label: Ranked,
    comment: Ranked,
    parents: Vec<String>,
    parent_properties: Vec<String>,
    domains: Vec<String>,
    ranges: Vec<String>,
}

/// Parses `text` into a store builder scoped to `namespace`.
///
/// # Errors
///
/// Returns [`SchemaLoadError::Parse`] when the document is not valid Turtle.
pub fn parse(text: &str, namespace: &Iri) -> Result<OntologyStoreBuilder, SchemaLoadError> {
    let mut facts: BTreeMap<String, Facts> = BTreeMap::new();

    for triple in TurtleParser::new().for_reader(text.as_bytes()) {
        let triple = triple.map_err(|err| SchemaLoadError::Parse {
            message: err.to_string(),
        })?;
        let Term::NamedNode(subject) = Term::from(triple.subject) else {
            continue;
        };
        if !namespace.contains(subject.as_str()) {
            continue;
        }
        let entry = facts
            .entry(local_name(subject.as_str()).to_string())
            .or_default();
        record(entry, triple.predicate.as_ref(), &triple.object, namespace);
    }

    let mut builder = OntologyStore::builder(namespace.clone());
    for (name, facts) in facts {
        let label = facts.label.take();
        let comment = facts.comment.take();
        if facts.is_class {
            let mut class = OntologyClass::new(name.clone());
            if let Some(label) = &label {
                class.set_label(label.clone());
            }
            if let Some(comment) = &comment {
                class.set_comment(comment.clone());
            }
            if facts.defined {
                class.set_defined();
            }
            for parent in &facts.parents {
                class.add_parent(parent.clone());
            }
            builder = builder.class(class);
        }
        if let Some(kind) = facts.property_kind {
            let mut property = OntologyProperty::new(name, kind);
            if let Some(label) = label {
                property.set_label(label);
            }
            if let Some(comment) = comment {
                property.set_comment(comment);
            }
            for parent in facts.parent_properties {
                property.add_parent(parent);
            }
            for domain in facts.domains {
                property.add_domain(domain);
            }
            for range in facts.ranges {
                property.add_range(range);
            }
            builder = builder.property(property);
        }
    }

    Ok(builder)
}

fn record(facts: &mut Facts, predicate: NamedNodeRef<'_>, object: &Term, namespace: &Iri) {
    if predicate == rdf::TYPE {
        if let Term::NamedNode(kind) = object {
            let kind = kind.as_ref();
            if kind == OWL_CLASS || kind == rdfs::CLASS {
                facts.is_class = true;
            } else if kind == OWL_OBJECT_PROPERTY {
                facts.property_kind = Some(PropertyKind::Object);
            } else if kind == OWL_DATATYPE_PROPERTY {
                facts.property_kind.get_or_insert(PropertyKind::Datatype);
            }
        }
    } else if predicate == rdfs::SUB_CLASS_OF {
        if let Some(parent) = in_namespace(object, namespace) {
            facts.parents.push(parent);
        }
    } else if predicate == OWL_EQUIVALENT_CLASS {
        facts.defined = true;
    } else if predicate == rdfs::SUB_PROPERTY_OF {
        if let Some(parent) = in_namespace(object, namespace) {
            facts.parent_properties.push(parent);
        }
    } else if predicate == rdfs::DOMAIN {
        if let Some(domain) = in_namespace(object, namespace) {
            facts.domains.push(domain);
        }
    } else if predicate == rdfs::RANGE {
        if let Term::NamedNode(range) = object {
            if let Some(range) = range_tag(range, namespace) {
                facts.ranges.push(range);
            }
        }
    } else if predicate == SKOS_PREF_LABEL {
        if let Term::Literal(text) = object {
            facts.label.offer(0, text.value());
        }
    } else if predicate == rdfs::LABEL {
        if let Term::Literal(text) = object {
            facts.label.offer(1, text.value());
        }
    } else if predicate == SKOS_DEFINITION {
        if let Term::Literal(text) = object {
            facts.comment.offer(0, text.value());
        }
    } else if predicate == rdfs::COMMENT {
        if let Term::Literal(text) = object {
            facts.comment.offer(1, text.value());
        }
    }
}

fn in_namespace(object: &Term, namespace: &Iri) -> Option<String> {
    match object {
        Term::NamedNode(node) if namespace.contains(node.as_str()) => {
            Some(local_name(node.as_str()).to_string())
        }
        _ => None,
    }
}

fn range_tag(range: &NamedNode, namespace: &Iri) -> Option<String> {
    let iri = range.as_str();
    if let Some(local) = iri.strip_prefix(XSD_NAMESPACE) {
        Some(format!("xsd:{local}"))
    } else if range.as_ref() == rdfs::LITERAL {
        Some("rdfs:Literal".to_string())
    } else if range.as_ref() == rdf::LANG_STRING {
        Some("rdf:langString".to_string())
    } else if namespace.contains(iri) {
        Some(local_name(iri).to_string())
    } else {
        None
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
