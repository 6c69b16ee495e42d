use std::path::PathBuf;

use gist_topics::ontology::{Iri, OntologyStore, SchemaLoadError, GIST_NAMESPACE};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn gist() -> Iri {
    Iri::new(GIST_NAMESPACE).expect("gist namespace")
}

#[test]
fn loads_classes_properties_and_annotations() {
    let store = OntologyStore::load(fixture("gist_mini.ttl"), &gist()).expect("fixture loads");

    assert_eq!(store.all_classes().len(), 15);
    assert_eq!(store.all_properties().len(), 11);
    assert!(store.get_class("Thing").is_none(), "owl:Thing is outside the namespace");

    let historical = store.class("HistoricalEvent").expect("historical event");
    assert!(historical.is_defined());
    assert_eq!(historical.label(), Some("Historical Event"));
    assert_eq!(historical.parents().iter().collect::<Vec<_>>(), vec!["Event"]);

    let meeting = store.class("Meeting").expect("meeting");
    assert_eq!(meeting.label(), Some("Meeting"));
    assert_eq!(meeting.comment(), Some("A gathering of people with a common purpose."));
    assert!(!meeting.is_defined());

    let occurs_in = store.property("occursIn").expect("occursIn");
    assert!(occurs_in.is_object_property());
    assert_eq!(store.property_ancestors_of("occursIn").unwrap(), vec!["hasPhysicalLocation"]);

    let latitude = store.property("latitude").expect("latitude");
    assert_eq!(latitude.ranges().iter().collect::<Vec<_>>(), vec!["xsd:decimal"]);
    assert!(store.warnings().is_empty(), "{:?}", store.warnings());
}

#[test]
fn hierarchy_queries_follow_the_loaded_graph() {
    let store = OntologyStore::load(fixture("gist_mini.ttl"), &gist()).expect("fixture loads");

    assert_eq!(store.ancestors_of("Project", None).unwrap(), vec!["Task", "Event"]);
    assert_eq!(store.ancestors_of("Project", Some(1)).unwrap(), vec!["Task"]);
    assert_eq!(
        store.descendants_of("Event", 1).unwrap(),
        vec!["ContemporaryEvent", "HistoricalEvent", "ScheduledEvent", "Task"]
    );
    assert_eq!(
        store.descendants_of("Event", 2).unwrap(),
        vec![
            "ContemporaryEvent",
            "HistoricalEvent",
            "ScheduledEvent",
            "Task",
            "Meeting",
            "Project"
        ]
    );
    assert!(store.descendants_of("Event", 0).unwrap().is_empty());
}

#[test]
fn extension_terms_stay_out_of_the_base_store() {
    let store = OntologyStore::load(fixture("space_extension.ttl"), &gist()).expect("loads");
    assert_eq!(store.all_classes().len(), 0);

    let space = Iri::new("https://example.org/ns/space/").expect("space namespace");
    let extension = OntologyStore::load(fixture("space_extension.ttl"), &space).expect("loads");
    let mission = extension.class("Mission").expect("mission");
    assert!(mission.parents().is_empty(), "gist:Event is outside the extension namespace");
}

#[test]
fn cyclic_hierarchy_names_the_cycle() {
    let err = OntologyStore::load(fixture("cyclic.ttl"), &gist()).expect_err("cycle");
    match &err {
        SchemaLoadError::Cycle { cycle } => {
            assert_eq!(cycle, &["Agreement", "Commitment", "Obligation", "Agreement"]);
        }
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(
        err.to_string(),
        "class hierarchy cycle: Agreement -> Commitment -> Obligation -> Agreement"
    );
}

#[test]
fn unreadable_and_malformed_sources_fail() {
    let err = OntologyStore::load(fixture("missing.ttl"), &gist()).expect_err("missing file");
    assert!(matches!(err, SchemaLoadError::Io { .. }));

    let err = OntologyStore::from_turtle("gist:Event a owl:Class .", &gist()).expect_err("prefix");
    assert!(matches!(err, SchemaLoadError::Parse { .. }));
}
