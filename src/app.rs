//! Process-wide wiring of the engines from a [`Config`].
//!
//! The ontology store and the topic table are loaded once and shared
//! read-only; everything handed out by [`AppContext`] is cheap to clone.

use std::sync::Arc;

use tracing::info;

use crate::{
    classify::{build_classifier, ClassificationResult, TopicClassifier},
    config::Config,
    ontology::{Iri, OntologyStore},
    record::ClassificationRecord,
    subset::{SchemaSubset, SchemaSubsetter, SubsetOptions},
    topics::TopicSeedTable,
    Error, Result,
};

#[cfg(feature = "cache_inmem")]
use crate::subset::SubsetCache;

enum Subsets {
    Direct(SchemaSubsetter),
    #[cfg(feature = "cache_inmem")]
    Cached(SubsetCache),
}

/// Output of classifying a document and subsetting the ontology for the
/// topics it was assigned.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub record: ClassificationRecord,
    pub subset: Arc<SchemaSubset>,
}

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub table: Arc<TopicSeedTable>,
    pub classifier: Arc<dyn TopicClassifier>,
    store: Option<Arc<OntologyStore>>,
    subsets: Option<Arc<Subsets>>,
}

impl AppContext {
    /// Loads the topic table, the ontology (when `ontology.path` is set) and
    /// builds the configured classifier.
    ///
    /// # Errors
    ///
    /// Fails when the table or ontology cannot be loaded or the classifier
    /// configuration is incomplete.
    pub fn create(config: Config) -> Result<Self> {
        let table = Arc::new(match &config.topics {
            Some(path) => TopicSeedTable::load(path)?,
            None => TopicSeedTable::gist(),
        });

        let store = match &config.ontology.path {
            Some(path) => {
                let namespace = Iri::new(config.ontology.namespace.clone())
                    .map_err(crate::ontology::SchemaLoadError::from)?;
                Some(Arc::new(OntologyStore::load(path, &namespace)?))
            }
            None => None,
        };

        let subsets = store.as_ref().map(|store| {
            let subsetter = SchemaSubsetter::new(store.clone(), table.clone())
                .with_prefix(config.ontology.prefix.clone());
            Arc::new(Self::build_subsets(&config, subsetter))
        });

        let classifier = build_classifier(&config.classifier, &config.ai, table.clone())?;
        info!(
            topics = table.len(),
            method = %classifier.method(),
            ontology = store.is_some(),
            "application context ready"
        );

        Ok(Self {
            config: Arc::new(config),
            table,
            classifier,
            store,
            subsets,
        })
    }

    #[cfg(feature = "cache_inmem")]
    fn build_subsets(config: &Config, subsetter: SchemaSubsetter) -> Subsets {
        if config.subset.cache.enable {
            Subsets::Cached(SubsetCache::new(subsetter, config.subset.cache.max_capacity))
        } else {
            Subsets::Direct(subsetter)
        }
    }

    #[cfg(not(feature = "cache_inmem"))]
    fn build_subsets(_config: &Config, subsetter: SchemaSubsetter) -> Subsets {
        Subsets::Direct(subsetter)
    }

    /// The loaded ontology.
    ///
    /// # Errors
    ///
    /// Fails when no `ontology.path` was configured.
    pub fn store(&self) -> Result<&OntologyStore> {
        self.store
            .as_deref()
            .ok_or_else(|| Error::string("no ontology configured, set `ontology.path`"))
    }

    #[must_use]
    pub fn subset_options(&self) -> SubsetOptions {
        self.config.subset.options()
    }

    /// # Errors
    ///
    /// Fails without an ontology or on an unknown topic name.
    pub fn subset_by_topics<S: AsRef<str>>(&self, topics: &[S]) -> Result<Arc<SchemaSubset>> {
        let options = self.subset_options();
        match self.subsets()? {
            Subsets::Direct(subsetter) => Ok(Arc::new(subsetter.subset_by_topics(topics, &options)?)),
            #[cfg(feature = "cache_inmem")]
            Subsets::Cached(cache) => Ok(cache.subset_by_topics(topics, &options)?),
        }
    }

    /// # Errors
    ///
    /// Fails without an ontology or on an unknown class name.
    pub fn subset_by_classes<S: AsRef<str>>(&self, classes: &[S]) -> Result<Arc<SchemaSubset>> {
        let options = self.subset_options();
        match self.subsets()? {
            Subsets::Direct(subsetter) => {
                Ok(Arc::new(subsetter.subset_by_classes(classes, &options)?))
            }
            #[cfg(feature = "cache_inmem")]
            Subsets::Cached(cache) => Ok(cache.subset_by_classes(classes, &options)?),
        }
    }

    /// Renders a subset with the configured definition length.
    #[must_use]
    pub fn render(&self, subset: &SchemaSubset) -> String {
        subset.to_prompt_text(self.config.subset.max_definition_len)
    }

    /// # Errors
    ///
    /// Propagates the classifier's error.
    pub async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        Ok(self.classifier.classify(text).await?)
    }

    /// Classifies a document, then subsets the ontology for its topics.
    ///
    /// # Errors
    ///
    /// Fails on classification errors or when no ontology is configured.
    pub async fn pipeline(&self, article_id: &str, text: &str) -> Result<PipelineOutput> {
        self.subsets()?;
        let result = self.classify(text).await?;
        let topics: Vec<&str> = result.topics.iter().map(|topic| topic.as_str()).collect();
        let subset = self.subset_by_topics(&topics)?;
        Ok(PipelineOutput {
            record: ClassificationRecord::new(article_id, &result),
            subset,
        })
    }

    fn subsets(&self) -> Result<&Subsets> {
        self.subsets
            .as_deref()
            .ok_or_else(|| Error::string("no ontology configured, set `ontology.path`"))
    }
}
