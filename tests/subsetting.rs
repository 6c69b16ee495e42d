use std::{collections::BTreeSet, path::PathBuf, sync::Arc};

use gist_topics::{
    ontology::{Iri, OntologyStore, GIST_NAMESPACE},
    subset::{SchemaSubset, SchemaSubsetter, SubsetError, SubsetOptions},
    topics::{Topic, TopicSeedTable},
};
use rstest::{fixture, rstest};

fn path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[fixture]
fn store() -> Arc<OntologyStore> {
    let namespace = Iri::new(GIST_NAMESPACE).expect("gist namespace");
    Arc::new(OntologyStore::load(path("gist_mini.ttl"), &namespace).expect("fixture loads"))
}

#[fixture]
fn subsetter(store: Arc<OntologyStore>) -> SchemaSubsetter {
    let table = TopicSeedTable::load(path("topics.yaml")).expect("topic table");
    SchemaSubsetter::new(store, Arc::new(table))
}

fn depth(descendant_depth: usize) -> SubsetOptions {
    SubsetOptions {
        include_descendants: true,
        descendant_depth,
    }
}

/// Names listed at the start of a line, split by rendered section.
fn rendered_names(text: &str) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut classes = BTreeSet::new();
    let mut properties = BTreeSet::new();
    let mut in_classes = false;
    for line in text.lines() {
        if let Some(section) = line.strip_prefix("## ") {
            in_classes = section == "Classes";
            continue;
        }
        let Some(term) = line.strip_prefix("gist:") else {
            continue;
        };
        let name = term.split_whitespace().next().unwrap_or_default().to_string();
        if in_classes {
            classes.insert(name);
        } else {
            properties.insert(name);
        }
    }
    (classes, properties)
}

fn names(subset: &SchemaSubset) -> (BTreeSet<String>, BTreeSet<String>) {
    (
        subset.class_names().into_iter().map(str::to_string).collect(),
        subset.property_names().into_iter().map(str::to_string).collect(),
    )
}

#[rstest]
fn events_subset_only_traverses_loaded_terms(subsetter: SchemaSubsetter) {
    let subset = subsetter
        .subset_by_topics(&["events"], &depth(1))
        .expect("events subset");

    assert_eq!(
        subset.class_names(),
        BTreeSet::from([
            "ContemporaryEvent",
            "Event",
            "GeoLocation",
            "HistoricalEvent",
            "Person",
            "ScheduledEvent",
            "Task",
        ])
    );
    assert!(!subset.contains_class("Mission"));
    assert!(!subset.contains_class("Project"), "depth 2 descendant");
    assert_eq!(
        subset.property_names(),
        BTreeSet::from([
            "actualEndDateTime",
            "atDateTime",
            "hasParticipant",
            "hasPhysicalLocation",
            "isParticipantIn",
            "occursIn",
        ])
    );

    let stats = subset.stats();
    assert_eq!(stats.class_count, 7);
    assert_eq!(stats.object_property_count, 4);
    assert_eq!(stats.datatype_property_count, 2);
}

#[rstest]
fn seed_classes_and_their_ancestors_are_always_present(subsetter: SchemaSubsetter) {
    for topic in subsetter.table().topics().collect::<Vec<_>>() {
        let subset = subsetter.subset_for_topics(&[topic], &SubsetOptions::default());
        let seed = subsetter.table().seed(topic).expect("seed");
        for class in &seed.seed_classes {
            assert!(subset.contains_class(class), "{topic}: {class}");
            for ancestor in subsetter.store().ancestors_of(class, None).unwrap() {
                assert!(subset.contains_class(ancestor), "{topic}: {ancestor}");
            }
        }
        for class in subset.classes() {
            for parent in class.parents() {
                assert!(subset.contains_class(parent), "{} lost parent {parent}", class.name());
            }
        }
    }
}

#[rstest]
fn topic_order_only_changes_provenance(subsetter: SchemaSubsetter) {
    let options = SubsetOptions::default();
    let forward = subsetter
        .subset_by_topics(&["geo", "events", "time"], &options)
        .unwrap();
    let backward = subsetter
        .subset_by_topics(&["time", "events", "geo", "events"], &options)
        .unwrap();

    assert_eq!(names(&forward), names(&backward));
    assert_eq!(forward.source_topics(), &[Topic::Geo, Topic::Events, Topic::Time]);
    assert_eq!(backward.source_topics(), &[Topic::Time, Topic::Events, Topic::Geo]);

    let again = subsetter
        .subset_by_topics(&["geo", "events", "time"], &options)
        .unwrap();
    assert_eq!(forward, again);
    assert_eq!(
        forward.to_prompt_text(120),
        again.to_prompt_text(120),
        "rendering is repeatable"
    );
}

#[rstest]
fn empty_topic_list_gives_an_empty_subset(subsetter: SchemaSubsetter) {
    let subset = subsetter
        .subset_by_topics::<&str>(&[], &SubsetOptions::default())
        .unwrap();
    assert!(subset.is_empty());
    assert_eq!(subset.stats().class_count, 0);
    assert_eq!(subset.stats().object_property_count, 0);
}

#[rstest]
#[case(&["not_a_real_topic"], "not_a_real_topic")]
#[case(&["geo", "Geo"], "Geo")]
fn unknown_topics_are_echoed(
    subsetter: SchemaSubsetter,
    #[case] topics: &[&str],
    #[case] offending: &str,
) {
    let err = subsetter
        .subset_by_topics(topics, &SubsetOptions::default())
        .expect_err("unknown topic");
    assert_eq!(err, SubsetError::UnknownTopic(offending.to_string()));
    assert_eq!(err.to_string(), format!("unknown topic `{offending}`"));
}

#[rstest]
fn class_seeds_resolve_or_fail(subsetter: SchemaSubsetter) {
    let subset = subsetter
        .subset_by_classes(&["GeoPoint"], &depth(0))
        .expect("class subset");
    assert!(subset.contains_class("GeoLocation"));
    assert!(subset.contains_property("latitude"));
    assert!(subset.source_topics().is_empty());

    let err = subsetter
        .subset_by_classes(&["GeoPoint", "Mission"], &depth(0))
        .expect_err("unknown class");
    assert_eq!(err, SubsetError::UnknownClass("Mission".to_string()));
}

#[rstest]
fn rendered_text_lists_exactly_the_subset(subsetter: SchemaSubsetter) {
    let subset = subsetter
        .subset_by_topics(&["events", "geo", "time"], &SubsetOptions::default())
        .unwrap();
    let text = subset.to_prompt_text(40);

    assert_eq!(rendered_names(&text), names(&subset));
    assert!(text.contains("Topics: events, geo, time"));
    assert!(text.contains("gist:HistoricalEvent (subClassOf gist:Event) [defined]"));
    assert!(text.contains("  [Domain: gist:GeoPoint; Range: xsd:decimal]"));
    assert!(text.contains("  A location on or near the surface of a p..."));
}

#[rstest]
fn rendered_depth_groups_follow_the_hierarchy(subsetter: SchemaSubsetter) {
    let subset = subsetter
        .subset_by_classes(&["Event"], &depth(2))
        .unwrap();
    let text = subset.to_prompt_text(120);

    let event = text.find("gist:Event\n").expect("event line");
    let task = text.find("gist:Task (subClassOf gist:Event)").expect("task line");
    let project = text.find("gist:Project (subClassOf gist:Task)").expect("project line");
    assert!(event < task && task < project);
    assert!(text.contains("### Depth 2"));
}

#[cfg(feature = "cache_inmem")]
#[rstest]
fn cache_serves_permutations_from_one_computation(subsetter: SchemaSubsetter) {
    use gist_topics::subset::SubsetCache;

    let cache = SubsetCache::new(subsetter, 16);
    let options = SubsetOptions::default();

    let first = cache.subset_by_topics(&["time", "geo"], &options).unwrap();
    let second = cache.subset_by_topics(&["geo", "time"], &options).unwrap();

    assert_eq!(cache.computations(), 1);
    assert_eq!(names(&first), names(&second));
    assert_eq!(first.source_topics(), &[Topic::Time, Topic::Geo]);
    assert_eq!(second.source_topics(), &[Topic::Geo, Topic::Time]);

    assert!(cache.subset_by_topics(&["nope"], &options).is_err());
    assert_eq!(cache.computations(), 1);
}
