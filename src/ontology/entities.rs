use std::collections::BTreeSet;

use thiserror::Error;

/// Literal datatypes a datatype property may range over without naming a
/// class of the store.
pub const LITERAL_TYPE_PREFIXES: [&str; 3] = ["xsd:", "rdfs:Literal", "rdf:langString"];

/// Returns `true` when `range` names a recognized literal type tag.
#[must_use]
pub fn is_literal_type(range: &str) -> bool {
    LITERAL_TYPE_PREFIXES
        .iter()
        .any(|prefix| range.starts_with(prefix))
}

/// Ontology class definition capturing parent relationships and metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OntologyClass {
    name: String,
    label: Option<String>,
    comment: Option<String>,
    parents: BTreeSet<String>,
    children: BTreeSet<String>,
    is_defined: bool,
}

impl OntologyClass {
    /// Creates a new primitive [`OntologyClass`] with the supplied local name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            comment: None,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
            is_defined: false,
        }
    }

    /// Sets a human friendly label for the class.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets a textual description for the class.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Adds a parent class relation.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.insert(parent.into());
        self
    }

    /// Marks the class as carrying an equivalence axiom.
    #[must_use]
    pub fn defined(mut self) -> Self {
        self.is_defined = true;
        self
    }

    /// Adds a new parent class relation.
    pub fn add_parent(&mut self, parent: impl Into<String>) -> bool {
        self.parents.insert(parent.into())
    }

    pub(crate) fn set_label(&mut self, label: String) {
        self.label = Some(label);
    }

    pub(crate) fn set_comment(&mut self, comment: String) {
        self.comment = Some(comment);
    }

    pub(crate) fn set_defined(&mut self) {
        self.is_defined = true;
    }

    pub(crate) fn retain_parents(&mut self, keep: impl Fn(&str) -> bool) -> Vec<String> {
        let dropped: Vec<String> = self
            .parents
            .iter()
            .filter(|parent| !keep(parent))
            .cloned()
            .collect();
        for parent in &dropped {
            self.parents.remove(parent);
        }
        dropped
    }

    pub(crate) fn add_child(&mut self, child: impl Into<String>) {
        self.children.insert(child.into());
    }

    /// Returns the unique local name of the class.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the optional label.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the optional comment.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns the parent classes in lexical order.
    #[must_use]
    pub fn parents(&self) -> &BTreeSet<String> {
        &self.parents
    }

    /// Returns the direct subclasses in lexical order.
    ///
    /// Only populated once the class belongs to a loaded store.
    #[must_use]
    pub fn children(&self) -> &BTreeSet<String> {
        &self.children
    }

    /// Whether the class has a necessary-and-sufficient definition.
    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.is_defined
    }
}

/// Classifies the type of values a property can hold.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyKind {
    /// Object properties link individuals.
    Object,
    /// Datatype properties capture literal values.
    Datatype,
}

/// Ontology property definition supporting object and datatype properties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OntologyProperty {
    name: String,
    label: Option<String>,
    comment: Option<String>,
    kind: PropertyKind,
    parent_properties: BTreeSet<String>,
    sub_properties: BTreeSet<String>,
    domains: BTreeSet<String>,
    ranges: BTreeSet<String>,
}

impl OntologyProperty {
    /// Creates a new property with the provided local name and kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            label: None,
            comment: None,
            kind,
            parent_properties: BTreeSet::new(),
            sub_properties: BTreeSet::new(),
            domains: BTreeSet::new(),
            ranges: BTreeSet::new(),
        }
    }

    /// Shorthand for [`PropertyKind::Object`].
    #[must_use]
    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Object)
    }

    /// Shorthand for [`PropertyKind::Datatype`].
    #[must_use]
    pub fn datatype(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Datatype)
    }

    /// Sets a human readable label for the property.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets a textual description for the property.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Declares that the property applies to the supplied domain class.
    #[must_use]
    pub fn with_domain(mut self, class: impl Into<String>) -> Self {
        self.domains.insert(class.into());
        self
    }

    /// Declares the range class or literal type tag.
    #[must_use]
    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.ranges.insert(range.into());
        self
    }

    /// Declares a super-property.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_properties.insert(parent.into());
        self
    }

    /// Declares that the property applies to the supplied domain class.
    pub fn add_domain(&mut self, class: impl Into<String>) -> bool {
        self.domains.insert(class.into())
    }

    /// Declares the range class or literal type tag.
    pub fn add_range(&mut self, range: impl Into<String>) -> bool {
        self.ranges.insert(range.into())
    }

    /// Declares a super-property.
    pub fn add_parent(&mut self, parent: impl Into<String>) -> bool {
        self.parent_properties.insert(parent.into())
    }

    pub(crate) fn set_label(&mut self, label: String) {
        self.label = Some(label);
    }

    pub(crate) fn set_comment(&mut self, comment: String) {
        self.comment = Some(comment);
    }

    pub(crate) fn add_sub_property(&mut self, child: impl Into<String>) {
        self.sub_properties.insert(child.into());
    }

    /// Returns the property local name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the optional label.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the optional comment.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns the property kind.
    #[must_use]
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Whether the property links individuals.
    #[must_use]
    pub fn is_object_property(&self) -> bool {
        self.kind == PropertyKind::Object
    }

    /// Returns the declared super-properties.
    #[must_use]
    pub fn parent_properties(&self) -> &BTreeSet<String> {
        &self.parent_properties
    }

    /// Returns the direct sub-properties, populated once loaded into a store.
    #[must_use]
    pub fn sub_properties(&self) -> &BTreeSet<String> {
        &self.sub_properties
    }

    /// Returns the registered domain classes.
    #[must_use]
    pub fn domains(&self) -> &BTreeSet<String> {
        &self.domains
    }

    /// Returns the registered ranges: class names, or literal type tags such
    /// as `xsd:string` for datatype properties.
    #[must_use]
    pub fn ranges(&self) -> &BTreeSet<String> {
        &self.ranges
    }

    /// Domain classes plus, for object properties, range classes.
    pub fn class_references(&self) -> impl Iterator<Item = &str> {
        let object = self.kind == PropertyKind::Object;
        let ranges = self.ranges.iter().filter(move |_| object);
        self.domains.iter().chain(ranges).map(String::as_str)
    }
}

/// Errors raised when looking terms up in a loaded store.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OntologyError {
    /// Referenced class was not part of the store.
    #[error("unknown class `{0}`")]
    UnknownClass(String),
    /// Referenced property was not part of the store.
    #[error("unknown property `{0}`")]
    UnknownProperty(String),
}
