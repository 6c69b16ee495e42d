//! In-memory memoization of subset computations.
//!
//! Keys are order-insensitive (sorted, deduplicated names plus options) and
//! concurrent callers asking for the same key wait on a single computation.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use moka::sync::Cache;

use super::{dedup_topics, SchemaSubset, SchemaSubsetter, SubsetError, SubsetOptions};
use crate::topics::{parse_topics, Topic};

/// Default number of cached subsets.
pub const DEFAULT_MAX_CAPACITY: u64 = 256;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum SubsetKey {
    Topics(Vec<Topic>, SubsetOptions),
    Classes(Vec<String>, SubsetOptions),
}

/// A [`SchemaSubsetter`] front that reuses previously computed subsets.
pub struct SubsetCache {
    subsetter: SchemaSubsetter,
    cache: Cache<SubsetKey, Arc<SchemaSubset>>,
    computations: AtomicU64,
}

impl SubsetCache {
    #[must_use]
    pub fn new(subsetter: SchemaSubsetter, max_capacity: u64) -> Self {
        Self {
            subsetter,
            cache: Cache::new(max_capacity),
            computations: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn subsetter(&self) -> &SchemaSubsetter {
        &self.subsetter
    }

    /// Cached [`SchemaSubsetter::subset_by_topics`]. The returned subset
    /// carries the caller's topic order as provenance.
    ///
    /// # Errors
    ///
    /// Returns [`SubsetError::UnknownTopic`] before touching the cache.
    pub fn subset_by_topics<S: AsRef<str>>(
        &self,
        topics: &[S],
        options: &SubsetOptions,
    ) -> Result<Arc<SchemaSubset>, SubsetError> {
        let requested = dedup_topics(&parse_topics(topics)?);
        let mut key = requested.clone();
        key.sort();

        let subset = self
            .cache
            .get_with(SubsetKey::Topics(key.clone(), *options), || {
                self.computations.fetch_add(1, Ordering::Relaxed);
                Arc::new(self.subsetter.subset_for_topics(&key, options))
            });

        if subset.source_topics() == requested.as_slice() {
            Ok(subset)
        } else {
            Ok(Arc::new(subset.as_ref().clone().with_source_topics(requested)))
        }
    }

    /// Cached [`SchemaSubsetter::subset_by_classes`]. Failures are not
    /// cached.
    ///
    /// # Errors
    ///
    /// Returns [`SubsetError::UnknownClass`] echoing the unresolved name.
    pub fn subset_by_classes<S: AsRef<str>>(
        &self,
        class_names: &[S],
        options: &SubsetOptions,
    ) -> Result<Arc<SchemaSubset>, SubsetError> {
        let mut key: Vec<String> = class_names.iter().map(|n| n.as_ref().to_string()).collect();
        key.sort();
        key.dedup();

        self.cache
            .try_get_with(SubsetKey::Classes(key.clone(), *options), || {
                self.computations.fetch_add(1, Ordering::Relaxed);
                self.subsetter.subset_by_classes(key.as_slice(), options).map(Arc::new)
            })
            .map_err(|err| err.as_ref().clone())
    }

    /// Number of subsets actually computed, as opposed to served from cache.
    #[must_use]
    pub fn computations(&self) -> u64 {
        self.computations.load(Ordering::Relaxed)
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::SubsetCache;
    use crate::{
        ontology::{Iri, OntologyClass, OntologyStore},
        subset::{SchemaSubsetter, SubsetError, SubsetOptions},
        topics::{Topic, TopicSeed, TopicSeedTable},
    };

    fn cache() -> SubsetCache {
        let store = OntologyStore::builder(Iri::new("https://example.org/gist/").unwrap())
            .class(OntologyClass::new("Event"))
            .class(OntologyClass::new("Place"))
            .build()
            .unwrap();
        let seed = |topic, class: &str| TopicSeed {
            topic,
            description: String::new(),
            seed_classes: vec![class.to_string()],
            seed_properties: vec![],
            keywords: vec![],
        };
        let table = TopicSeedTable::new([seed(Topic::Events, "Event"), seed(Topic::Geo, "Place")])
            .unwrap();
        SubsetCache::new(
            SchemaSubsetter::new(Arc::new(store), Arc::new(table)),
            16,
        )
    }

    #[test]
    fn permuted_topics_share_one_computation() {
        let cache = cache();
        let options = SubsetOptions::default();
        let first = cache.subset_by_topics(&["events", "geo"], &options).unwrap();
        let second = cache.subset_by_topics(&["geo", "events"], &options).unwrap();
        let third = cache.subset_by_topics(&["events", "geo"], &options).unwrap();

        assert_eq!(cache.computations(), 1);
        assert_eq!(first.class_names(), second.class_names());
        assert_eq!(first.source_topics(), &[Topic::Events, Topic::Geo]);
        assert_eq!(second.source_topics(), &[Topic::Geo, Topic::Events]);
        assert!(Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn options_are_part_of_the_key() {
        let cache = cache();
        cache
            .subset_by_topics(&["events"], &SubsetOptions::default())
            .unwrap();
        cache
            .subset_by_topics(
                &["events"],
                &SubsetOptions {
                    include_descendants: false,
                    descendant_depth: 0,
                },
            )
            .unwrap();
        assert_eq!(cache.computations(), 2);
    }

    #[test]
    fn class_failures_are_reported_and_not_cached() {
        let cache = cache();
        let options = SubsetOptions::default();
        for _ in 0..2 {
            assert_eq!(
                cache.subset_by_classes(&["Nowhere"], &options).unwrap_err(),
                SubsetError::UnknownClass("Nowhere".to_string())
            );
        }
        assert_eq!(cache.computations(), 2);

        cache.subset_by_classes(&["Place", "Event"], &options).unwrap();
        cache.subset_by_classes(&["Event", "Place"], &options).unwrap();
        assert_eq!(cache.computations(), 3);
    }
}
