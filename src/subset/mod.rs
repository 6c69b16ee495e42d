//! Topic-driven extraction of a closed ontology fragment.
//!
//! A subset starts from seed classes, adds their ancestors and a bounded
//! slice of their descendants, then pulls in every property anchored on the
//! resulting classes. Classes referenced by those properties are added back
//! together with their ancestors, so a rendered fragment never points at a
//! class it does not describe.

#[cfg(feature = "cache_inmem")]
pub mod cache;
mod render;

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    ontology::{
        Iri, OntologyClass, OntologyProperty, OntologyStore, DEFAULT_DESCENDANT_DEPTH,
        GIST_PREFIX,
    },
    topics::{parse_topics, Topic, TopicSeedTable, UnknownTopic},
};

#[cfg(feature = "cache_inmem")]
pub use cache::SubsetCache;
pub use render::DEFAULT_MAX_DEFINITION_LEN;

/// Errors raised for caller-supplied names that do not resolve.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SubsetError {
    #[error("unknown topic `{0}`")]
    UnknownTopic(String),
    #[error("unknown class `{0}`")]
    UnknownClass(String),
}

impl From<UnknownTopic> for SubsetError {
    fn from(err: UnknownTopic) -> Self {
        Self::UnknownTopic(err.0)
    }
}

/// Expansion knobs for a subset computation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsetOptions {
    pub include_descendants: bool,
    pub descendant_depth: usize,
}

impl Default for SubsetOptions {
    fn default() -> Self {
        Self {
            include_descendants: true,
            descendant_depth: DEFAULT_DESCENDANT_DEPTH,
        }
    }
}

/// Counts reported by [`SchemaSubset::stats`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SubsetStats {
    pub class_count: usize,
    pub object_property_count: usize,
    pub datatype_property_count: usize,
}

/// A reduced, dependency-closed view of the store.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaSubset {
    namespace: Iri,
    prefix: String,
    classes: BTreeMap<String, OntologyClass>,
    properties: BTreeMap<String, OntologyProperty>,
    source_topics: Vec<Topic>,
}

impl SchemaSubset {
    #[must_use]
    pub fn namespace(&self) -> &Iri {
        &self.namespace
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Classes ordered by local name.
    pub fn classes(&self) -> impl ExactSizeIterator<Item = &OntologyClass> {
        self.classes.values()
    }

    /// Properties ordered by local name.
    pub fn properties(&self) -> impl ExactSizeIterator<Item = &OntologyProperty> {
        self.properties.values()
    }

    #[must_use]
    pub fn class_names(&self) -> BTreeSet<&str> {
        self.classes.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn property_names(&self) -> BTreeSet<&str> {
        self.properties.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn contains_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    #[must_use]
    pub fn contains_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    #[must_use]
    pub fn get_class(&self, name: &str) -> Option<&OntologyClass> {
        self.classes.get(name)
    }

    /// Topics that produced the subset, in request order without repeats.
    #[must_use]
    pub fn source_topics(&self) -> &[Topic] {
        &self.source_topics
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.properties.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> SubsetStats {
        let object_property_count = self
            .properties
            .values()
            .filter(|property| property.is_object_property())
            .count();
        SubsetStats {
            class_count: self.classes.len(),
            object_property_count,
            datatype_property_count: self.properties.len() - object_property_count,
        }
    }

    /// Same fragment with different provenance.
    #[must_use]
    pub fn with_source_topics(mut self, topics: Vec<Topic>) -> Self {
        self.source_topics = topics;
        self
    }
}

/// Computes [`SchemaSubset`]s over a shared store and seed table.
#[derive(Clone, Debug)]
pub struct SchemaSubsetter {
    store: Arc<OntologyStore>,
    table: Arc<TopicSeedTable>,
    prefix: String,
}

impl SchemaSubsetter {
    #[must_use]
    pub fn new(store: Arc<OntologyStore>, table: Arc<TopicSeedTable>) -> Self {
        Self {
            store,
            table,
            prefix: GIST_PREFIX.to_string(),
        }
    }

    /// Display prefix written in front of every rendered term.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn store(&self) -> &OntologyStore {
        &self.store
    }

    #[must_use]
    pub fn table(&self) -> &TopicSeedTable {
        &self.table
    }

    /// Validates topic names, then computes their subset.
    ///
    /// # Errors
    ///
    /// Returns [`SubsetError::UnknownTopic`] for the first name outside the
    /// topic enumeration; nothing is computed in that case.
    pub fn subset_by_topics<S: AsRef<str>>(
        &self,
        topics: &[S],
        options: &SubsetOptions,
    ) -> Result<SchemaSubset, SubsetError> {
        let topics = parse_topics(topics)?;
        Ok(self.subset_for_topics(&topics, options))
    }

    /// Computes the subset for already-validated topics.
    #[must_use]
    pub fn subset_for_topics(&self, topics: &[Topic], options: &SubsetOptions) -> SchemaSubset {
        let source_topics = dedup_topics(topics);
        let mut seed_classes = BTreeSet::new();
        let mut seed_properties = BTreeSet::new();

        for topic in &source_topics {
            let Some(seed) = self.table.seed(*topic) else {
                debug!(topic = %topic, "topic has no seed entry");
                continue;
            };
            for class in &seed.seed_classes {
                if self.store.get_class(class).is_some() {
                    seed_classes.insert(class.as_str());
                } else {
                    warn!(topic = %topic, class = %class, "seed class not in ontology");
                }
            }
            for property in &seed.seed_properties {
                if self.store.get_property(property).is_some() {
                    seed_properties.insert(property.as_str());
                } else {
                    warn!(topic = %topic, property = %property, "seed property not in ontology");
                }
            }
        }

        self.expand(&seed_classes, &seed_properties, options, source_topics)
    }

    /// Computes the subset seeded directly by class names.
    ///
    /// # Errors
    ///
    /// Returns [`SubsetError::UnknownClass`] echoing the first unresolved
    /// name.
    pub fn subset_by_classes<S: AsRef<str>>(
        &self,
        class_names: &[S],
        options: &SubsetOptions,
    ) -> Result<SchemaSubset, SubsetError> {
        let mut seeds = BTreeSet::new();
        for name in class_names {
            let name = name.as_ref();
            let class = self
                .store
                .get_class(name)
                .ok_or_else(|| SubsetError::UnknownClass(name.to_string()))?;
            seeds.insert(class.name());
        }
        Ok(self.expand(&seeds, &BTreeSet::new(), options, Vec::new()))
    }

    fn expand(
        &self,
        seed_classes: &BTreeSet<&str>,
        seed_properties: &BTreeSet<&str>,
        options: &SubsetOptions,
        source_topics: Vec<Topic>,
    ) -> SchemaSubset {
        let store = &*self.store;

        let mut classes: BTreeSet<&str> = seed_classes.clone();
        if options.include_descendants {
            for seed in seed_classes {
                classes.extend(
                    store
                        .descendants_of(seed, options.descendant_depth)
                        .unwrap_or_default(),
                );
            }
        }
        let mut classes = self.with_ancestors(classes);

        let mut properties: BTreeSet<&str> = seed_properties.clone();
        for property in store.all_properties() {
            let anchored = property
                .class_references()
                .any(|class| classes.contains(class));
            if anchored {
                properties.insert(property.name());
            }
        }
        let direct: Vec<&str> = properties.iter().copied().collect();
        for property in direct {
            properties.extend(store.property_ancestors_of(property).unwrap_or_default());
        }

        let referenced: BTreeSet<&str> = properties
            .iter()
            .filter_map(|name| store.get_property(name))
            .flat_map(OntologyProperty::class_references)
            .filter(|class| store.get_class(class).is_some() && !classes.contains(class))
            .collect();
        if !referenced.is_empty() {
            debug!(count = referenced.len(), "adding classes referenced by properties");
            classes.extend(self.with_ancestors(referenced));
        }

        let subset = SchemaSubset {
            namespace: store.namespace().clone(),
            prefix: self.prefix.clone(),
            classes: classes
                .iter()
                .filter_map(|name| store.get_class(name))
                .map(|class| (class.name().to_string(), class.clone()))
                .collect(),
            properties: properties
                .iter()
                .filter_map(|name| store.get_property(name))
                .map(|property| (property.name().to_string(), property.clone()))
                .collect(),
            source_topics,
        };
        debug!(
            topics = ?subset.source_topics,
            classes = subset.classes.len(),
            properties = subset.properties.len(),
            "subset computed"
        );
        subset
    }

    fn with_ancestors<'a>(&'a self, classes: BTreeSet<&'a str>) -> BTreeSet<&'a str> {
        let mut closed = classes.clone();
        for class in classes {
            closed.extend(self.store.ancestors_of(class, None).unwrap_or_default());
        }
        closed
    }
}

fn dedup_topics(topics: &[Topic]) -> Vec<Topic> {
    let mut seen = BTreeSet::new();
    topics
        .iter()
        .copied()
        .filter(|topic| seen.insert(*topic))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{SchemaSubsetter, SubsetError, SubsetOptions};
    use crate::{
        ontology::{Iri, OntologyClass, OntologyProperty, OntologyStore},
        topics::{Topic, TopicSeed, TopicSeedTable},
    };

    fn store() -> OntologyStore {
        OntologyStore::builder(Iri::new("https://example.org/gist/").unwrap())
            .class(OntologyClass::new("Thing"))
            .class(OntologyClass::new("Event").with_parent("Thing"))
            .class(OntologyClass::new("HistoricalEvent").with_parent("Event"))
            .class(OntologyClass::new("Battle").with_parent("HistoricalEvent"))
            .class(OntologyClass::new("Skirmish").with_parent("Battle"))
            .class(OntologyClass::new("Agent"))
            .class(OntologyClass::new("Person").with_parent("Agent"))
            .class(OntologyClass::new("Place"))
            .class(OntologyClass::new("TimeInterval"))
            .property(
                OntologyProperty::object("hasParticipant")
                    .with_domain("Event")
                    .with_range("Person"),
            )
            .property(OntologyProperty::object("relatesTo"))
            .property(
                OntologyProperty::object("hasLeader")
                    .with_parent("relatesTo")
                    .with_domain("Agent")
                    .with_range("Person"),
            )
            .property(
                OntologyProperty::datatype("startDateTime")
                    .with_domain("TimeInterval")
                    .with_range("xsd:dateTime"),
            )
            .property(
                OntologyProperty::object("occursIn")
                    .with_domain("Thing")
                    .with_range("Place"),
            )
            .build()
            .unwrap()
    }

    fn table() -> TopicSeedTable {
        TopicSeedTable::new([
            TopicSeed {
                topic: Topic::Events,
                description: String::new(),
                seed_classes: vec!["Event".into(), "Missing".into()],
                seed_properties: vec![],
                keywords: vec![],
            },
            TopicSeed {
                topic: Topic::Time,
                description: String::new(),
                seed_classes: vec!["TimeInterval".into()],
                seed_properties: vec!["hasLeader".into()],
                keywords: vec![],
            },
        ])
        .unwrap()
    }

    fn subsetter() -> SchemaSubsetter {
        SchemaSubsetter::new(Arc::new(store()), Arc::new(table()))
    }

    #[test]
    fn descendants_are_bounded() {
        let subsetter = subsetter();
        let shallow = subsetter
            .subset_by_topics(
                &["events"],
                &SubsetOptions {
                    include_descendants: true,
                    descendant_depth: 1,
                },
            )
            .unwrap();
        assert!(shallow.contains_class("HistoricalEvent"));
        assert!(!shallow.contains_class("Battle"));

        let deep = subsetter
            .subset_by_topics(&["events"], &SubsetOptions::default())
            .unwrap();
        assert!(deep.contains_class("Battle"));
        assert!(!deep.contains_class("Skirmish"));

        let none = subsetter
            .subset_by_topics(
                &["events"],
                &SubsetOptions {
                    include_descendants: false,
                    descendant_depth: 5,
                },
            )
            .unwrap();
        assert!(!none.contains_class("HistoricalEvent"));
    }

    #[test]
    fn property_classes_are_closed_over() {
        let subset = subsetter()
            .subset_by_topics(&["events"], &SubsetOptions::default())
            .unwrap();
        // hasParticipant pulls Person, Person pulls Agent; occursIn on Thing pulls Place.
        for class in ["Thing", "Event", "Person", "Agent", "Place"] {
            assert!(subset.contains_class(class), "missing {class}");
        }
        assert!(subset.contains_property("hasParticipant"));
        assert!(subset.contains_property("occursIn"));
        assert!(!subset.contains_property("startDateTime"));
        assert!(!subset.contains_class("TimeInterval"));
    }

    #[test]
    fn seed_properties_bring_super_properties_and_their_classes() {
        let subset = subsetter()
            .subset_by_topics(&["time"], &SubsetOptions::default())
            .unwrap();
        assert!(subset.contains_property("startDateTime"));
        assert!(subset.contains_property("hasLeader"));
        assert!(subset.contains_property("relatesTo"));
        assert!(subset.contains_class("Agent"));
        assert!(subset.contains_class("Person"));
        assert_eq!(subset.stats().datatype_property_count, 1);
    }

    #[test]
    fn unknown_names_fail_without_partial_results() {
        let subsetter = subsetter();
        assert_eq!(
            subsetter
                .subset_by_topics(&["events", "evnts"], &SubsetOptions::default())
                .unwrap_err(),
            SubsetError::UnknownTopic("evnts".to_string())
        );
        assert_eq!(
            subsetter
                .subset_by_classes(&["Event", "Evnt"], &SubsetOptions::default())
                .unwrap_err(),
            SubsetError::UnknownClass("Evnt".to_string())
        );
    }

    #[test]
    fn topics_without_seed_entries_contribute_nothing() {
        let subset = subsetter()
            .subset_by_topics(&["geo"], &SubsetOptions::default())
            .unwrap();
        assert!(subset.is_empty());
        assert_eq!(subset.source_topics(), &[Topic::Geo]);
    }

    #[test]
    fn class_seeds_skip_topic_indirection() {
        let subset = subsetter()
            .subset_by_classes(
                &["Battle"],
                &SubsetOptions {
                    include_descendants: false,
                    descendant_depth: 0,
                },
            )
            .unwrap();
        assert!(subset.source_topics().is_empty());
        for class in ["Battle", "HistoricalEvent", "Event", "Thing"] {
            assert!(subset.contains_class(class));
        }
        assert!(!subset.contains_class("Skirmish"));
    }
}
