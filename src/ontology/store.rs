use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fs,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use super::{
    entities::{is_literal_type, OntologyClass, OntologyError, OntologyProperty},
    turtle,
    value_objects::{Iri, IriError},
};

/// Default bound for descendant expansion, sized for prompt-sized fragments.
pub const DEFAULT_DESCENDANT_DEPTH: usize = 2;

/// Errors raised while loading an ontology source.
#[derive(Debug, thiserror::Error)]
pub enum SchemaLoadError {
    /// The ontology document could not be read.
    #[error("failed to read ontology source `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The document is not well-formed Turtle.
    #[error("malformed ontology source: {message}")]
    Parse { message: String },
    /// The `subClassOf` graph is not acyclic.
    #[error("class hierarchy cycle: {}", .cycle.join(" -> "))]
    Cycle { cycle: Vec<String> },
    /// The configured namespace is not an IRI.
    #[error("invalid ontology namespace: {0}")]
    InvalidNamespace(#[from] IriError),
    /// Two class definitions share a local name.
    #[error("class `{0}` already exists")]
    DuplicateClass(String),
    /// Two property definitions share a local name.
    #[error("property `{0}` already exists")]
    DuplicateProperty(String),
}

/// Immutable, indexed view over the classes and properties of one namespace.
///
/// Built once at load time and shared read-only afterwards; every lookup is
/// deterministic because indices are ordered by local name.
#[derive(Clone, Debug)]
pub struct OntologyStore {
    namespace: Iri,
    classes: BTreeMap<String, OntologyClass>,
    properties: BTreeMap<String, OntologyProperty>,
    ancestors: BTreeMap<String, Vec<String>>,
    warnings: Vec<String>,
}

impl OntologyStore {
    /// Starts an in-memory store definition for `namespace`.
    #[must_use]
    pub fn builder(namespace: Iri) -> OntologyStoreBuilder {
        OntologyStoreBuilder {
            namespace,
            classes: BTreeMap::new(),
            properties: BTreeMap::new(),
            duplicate: None,
        }
    }

    /// Loads a Turtle document from disk, keeping the terms under `namespace`.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaLoadError`] when the file is unreadable, malformed
    /// or its class hierarchy contains a cycle.
    pub fn load(path: impl AsRef<Path>, namespace: &Iri) -> Result<Self, SchemaLoadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SchemaLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_turtle(&text, namespace)?;
        info!(
            path = %path.display(),
            classes = store.classes.len(),
            properties = store.properties.len(),
            warnings = store.warnings.len(),
            "ontology loaded"
        );
        Ok(store)
    }

    /// Parses an in-memory Turtle document.
    ///
    /// # Errors
    ///
    /// See [`OntologyStore::load`].
    pub fn from_turtle(text: &str, namespace: &Iri) -> Result<Self, SchemaLoadError> {
        turtle::parse(text, namespace)?.build()
    }

    /// Namespace the store was loaded for.
    #[must_use]
    pub fn namespace(&self) -> &Iri {
        &self.namespace
    }

    /// Looks a class up by local name.
    #[must_use]
    pub fn get_class(&self, name: &str) -> Option<&OntologyClass> {
        self.classes.get(name)
    }

    /// Looks a property up by local name.
    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<&OntologyProperty> {
        self.properties.get(name)
    }

    /// Like [`OntologyStore::get_class`] but reports the missing name.
    ///
    /// # Errors
    ///
    /// Returns [`OntologyError::UnknownClass`] echoing `name`.
    pub fn class(&self, name: &str) -> Result<&OntologyClass, OntologyError> {
        self.get_class(name)
            .ok_or_else(|| OntologyError::UnknownClass(name.to_string()))
    }

    /// Like [`OntologyStore::get_property`] but reports the missing name.
    ///
    /// # Errors
    ///
    /// Returns [`OntologyError::UnknownProperty`] echoing `name`.
    pub fn property(&self, name: &str) -> Result<&OntologyProperty, OntologyError> {
        self.get_property(name)
            .ok_or_else(|| OntologyError::UnknownProperty(name.to_string()))
    }

    /// All classes in lexicographic order of their local names.
    pub fn all_classes(&self) -> impl ExactSizeIterator<Item = &OntologyClass> {
        self.classes.values()
    }

    /// All properties in lexicographic order of their local names.
    pub fn all_properties(&self) -> impl ExactSizeIterator<Item = &OntologyProperty> {
        self.properties.values()
    }

    /// Non-fatal findings collected during load, such as unresolved
    /// domain or range references.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Ancestors of `name`, nearest first, optionally bounded in depth.
    ///
    /// # Errors
    ///
    /// Returns [`OntologyError::UnknownClass`] for names outside the store.
    pub fn ancestors_of(
        &self,
        name: &str,
        max_depth: Option<usize>,
    ) -> Result<Vec<&str>, OntologyError> {
        self.class(name)?;
        match max_depth {
            None => Ok(self
                .ancestors
                .get(name)
                .map(|all| all.iter().map(String::as_str).collect())
                .unwrap_or_default()),
            Some(_) => Ok(breadth_first(name, max_depth, |current| {
                self.classes.get(current).map(OntologyClass::parents)
            })),
        }
    }

    /// Descendants of `name`, nearest first, up to `max_depth` levels.
    ///
    /// # Errors
    ///
    /// Returns [`OntologyError::UnknownClass`] for names outside the store.
    pub fn descendants_of(&self, name: &str, max_depth: usize) -> Result<Vec<&str>, OntologyError> {
        self.class(name)?;
        Ok(breadth_first(name, Some(max_depth), |current| {
            self.classes.get(current).map(OntologyClass::children)
        }))
    }

    /// Transitive super-properties of `name`, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`OntologyError::UnknownProperty`] for names outside the store.
    pub fn property_ancestors_of(&self, name: &str) -> Result<Vec<&str>, OntologyError> {
        self.property(name)?;
        Ok(breadth_first(name, None, |current| {
            self.properties
                .get(current)
                .map(OntologyProperty::parent_properties)
        }))
    }
}

/// Collects definitions before the indices of an [`OntologyStore`] are
/// derived.
#[derive(Debug)]
pub struct OntologyStoreBuilder {
    namespace: Iri,
    classes: BTreeMap<String, OntologyClass>,
    properties: BTreeMap<String, OntologyProperty>,
    duplicate: Option<SchemaLoadError>,
}

impl OntologyStoreBuilder {
    /// Adds a class definition.
    #[must_use]
    pub fn class(mut self, class: OntologyClass) -> Self {
        let name = class.name().to_string();
        if self.classes.contains_key(&name) {
            self.duplicate.get_or_insert(SchemaLoadError::DuplicateClass(name));
        } else {
            self.classes.insert(name, class);
        }
        self
    }

    /// Adds a property definition.
    #[must_use]
    pub fn property(mut self, property: OntologyProperty) -> Self {
        let name = property.name().to_string();
        if self.properties.contains_key(&name) {
            self.duplicate
                .get_or_insert(SchemaLoadError::DuplicateProperty(name));
        } else {
            self.properties.insert(name, property);
        }
        self
    }

    /// Derives inverse relations, validates the hierarchy and precomputes
    /// ancestor closures.
    ///
    /// # Errors
    ///
    /// Fails on duplicate definitions or a cycle in the class hierarchy.
    pub fn build(self) -> Result<OntologyStore, SchemaLoadError> {
        if let Some(err) = self.duplicate {
            return Err(err);
        }
        let Self {
            namespace,
            mut classes,
            mut properties,
            ..
        } = self;
        let mut warnings = Vec::new();

        let known_classes: BTreeSet<String> = classes.keys().cloned().collect();
        for class in classes.values_mut() {
            for dropped in class.retain_parents(|parent| known_classes.contains(parent)) {
                warnings.push(format!(
                    "class `{}` names unknown parent `{dropped}`",
                    class.name()
                ));
            }
        }
        let edges: Vec<(String, String)> = classes
            .values()
            .flat_map(|class| {
                class
                    .parents()
                    .iter()
                    .map(|parent| (parent.clone(), class.name().to_string()))
            })
            .collect();
        for (parent, child) in edges {
            if let Some(parent) = classes.get_mut(&parent) {
                parent.add_child(child);
            }
        }

        let property_edges: Vec<(String, String)> = properties
            .values()
            .flat_map(|property| {
                property
                    .parent_properties()
                    .iter()
                    .map(|parent| (parent.clone(), property.name().to_string()))
            })
            .collect();
        for (parent, child) in property_edges {
            match properties.get_mut(&parent) {
                Some(parent) => parent.add_sub_property(child),
                None => warnings.push(format!(
                    "property `{child}` names unknown super-property `{parent}`"
                )),
            }
        }

        for property in properties.values() {
            for domain in property.domains() {
                if !known_classes.contains(domain) {
                    warnings.push(format!(
                        "property `{}` has unresolved domain `{domain}`",
                        property.name()
                    ));
                }
            }
            for range in property.ranges() {
                if !known_classes.contains(range) && !is_literal_type(range) {
                    warnings.push(format!(
                        "property `{}` has unresolved range `{range}`",
                        property.name()
                    ));
                }
            }
        }
        for warning in &warnings {
            warn!(namespace = %namespace, "{warning}");
        }

        detect_cycle(&classes)?;

        let ancestors: BTreeMap<String, Vec<String>> = classes
            .keys()
            .map(|name| {
                let closure: Vec<String> = breadth_first(name, None, |current| {
                    classes.get(current).map(OntologyClass::parents)
                })
                .into_iter()
                .map(str::to_string)
                .collect();
                (name.clone(), closure)
            })
            .collect();

        Ok(OntologyStore {
            namespace,
            classes,
            properties,
            ancestors,
            warnings,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

fn detect_cycle(classes: &BTreeMap<String, OntologyClass>) -> Result<(), SchemaLoadError> {
    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
    for name in classes.keys() {
        let mut path = Vec::new();
        visit(name, classes, &mut marks, &mut path)?;
    }
    Ok(())
}

fn visit<'a>(
    name: &'a str,
    classes: &'a BTreeMap<String, OntologyClass>,
    marks: &mut BTreeMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
) -> Result<(), SchemaLoadError> {
    match marks.get(name) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            let start = path.iter().position(|entry| *entry == name).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|s| (*s).to_string()).collect();
            cycle.push(name.to_string());
            return Err(SchemaLoadError::Cycle { cycle });
        }
        None => {}
    }

    marks.insert(name, Mark::Visiting);
    path.push(name);
    if let Some(class) = classes.get(name) {
        for parent in class.parents() {
            visit(parent, classes, marks, path)?;
        }
    }
    path.pop();
    marks.insert(name, Mark::Done);
    Ok(())
}

/// Breadth-first walk from `start` following `neighbours`, excluding
/// `start` itself. Siblings are visited in lexical order.
fn breadth_first<'a, F>(start: &str, max_depth: Option<usize>, neighbours: F) -> Vec<&'a str>
where
    F: Fn(&str) -> Option<&'a BTreeSet<String>>,
{
    let mut visited: BTreeSet<&'a str> = BTreeSet::new();
    let mut result = Vec::new();
    let mut queue: VecDeque<(&'a str, usize)> = neighbours(start)
        .into_iter()
        .flatten()
        .map(|next| (next.as_str(), 1))
        .collect();

    while let Some((current, depth)) = queue.pop_front() {
        if max_depth.is_some_and(|max| depth > max) {
            continue;
        }
        if current == start || !visited.insert(current) {
            continue;
        }
        result.push(current);
        if let Some(next) = neighbours(current) {
            queue.extend(next.iter().map(|name| (name.as_str(), depth + 1)));
        }
    }

    result
}
