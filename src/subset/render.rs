use std::collections::BTreeMap;

use super::SchemaSubset;
use crate::ontology::{is_literal_type, OntologyClass, OntologyProperty};

/// Default cut-off for rendered comments.
pub const DEFAULT_MAX_DEFINITION_LEN: usize = 120;

impl SchemaSubset {
    /// Renders the fragment as compact text for an extraction prompt.
    ///
    /// Classes are grouped by depth inside the subset (roots first) and
    /// sorted by name within a group; properties are split into object and
    /// datatype sections. Comments longer than `max_definition_len`
    /// characters are cut and suffixed with `...`. Output is deterministic.
    #[must_use]
    pub fn to_prompt_text(&self, max_definition_len: usize) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {} Schema (subset)\n", self.prefix));
        out.push_str(&format!("Prefix: {}\n", self.prefix));
        out.push_str(&format!("Namespace: {}\n", self.namespace));
        if !self.source_topics.is_empty() {
            let topics: Vec<&str> = self.source_topics.iter().map(|t| t.as_str()).collect();
            out.push_str(&format!("Topics: {}\n", topics.join(", ")));
        }

        out.push_str("\n## Classes\n");
        let mut depths = BTreeMap::new();
        for name in self.classes.keys() {
            self.depth_of(name, &mut depths);
        }
        let mut groups: BTreeMap<usize, Vec<&OntologyClass>> = BTreeMap::new();
        for class in self.classes.values() {
            let depth = depths.get(class.name()).copied().unwrap_or_default();
            groups.entry(depth).or_default().push(class);
        }
        for (depth, classes) in groups {
            out.push_str(&format!("\n### Depth {depth}\n"));
            for class in classes {
                self.write_class(&mut out, class, max_definition_len);
            }
        }

        let (object, datatype): (Vec<&OntologyProperty>, Vec<&OntologyProperty>) = self
            .properties
            .values()
            .partition(|property| property.is_object_property());
        for (title, properties) in [("Object Properties", object), ("Datatype Properties", datatype)] {
            if properties.is_empty() {
                continue;
            }
            out.push_str(&format!("\n## {title}\n\n"));
            for property in properties {
                self.write_property(&mut out, property, max_definition_len);
            }
        }

        out
    }

    fn write_class(&self, out: &mut String, class: &OntologyClass, max_definition_len: usize) {
        out.push_str(&format!("{}:{}", self.prefix, class.name()));
        let parents: Vec<String> = class
            .parents()
            .iter()
            .filter(|parent| self.classes.contains_key(*parent))
            .map(|parent| self.term(parent))
            .collect();
        if !parents.is_empty() {
            out.push_str(&format!(" (subClassOf {})", parents.join(", ")));
        }
        if class.is_defined() {
            out.push_str(" [defined]");
        }
        out.push('\n');
        if let Some(comment) = class.comment() {
            out.push_str(&definition_line(comment, max_definition_len));
        }
    }

    fn write_property(
        &self,
        out: &mut String,
        property: &OntologyProperty,
        max_definition_len: usize,
    ) {
        out.push_str(&format!("{}:{}\n", self.prefix, property.name()));
        if let Some(comment) = property.comment() {
            out.push_str(&definition_line(comment, max_definition_len));
        }
        let mut constraints = Vec::new();
        if !property.domains().is_empty() {
            let domains: Vec<String> = property.domains().iter().map(|d| self.term(d)).collect();
            constraints.push(format!("Domain: {}", domains.join(", ")));
        }
        if !property.ranges().is_empty() {
            let ranges: Vec<String> = property.ranges().iter().map(|r| self.term(r)).collect();
            constraints.push(format!("Range: {}", ranges.join(", ")));
        }
        if !constraints.is_empty() {
            out.push_str(&format!("  [{}]\n", constraints.join("; ")));
        }
    }

    fn term(&self, name: &str) -> String {
        if is_literal_type(name) {
            name.to_string()
        } else {
            format!("{}:{name}", self.prefix)
        }
    }

    /// Longest chain of in-subset parents above `name`.
    fn depth_of<'a>(&'a self, name: &'a str, depths: &mut BTreeMap<&'a str, usize>) -> usize {
        if let Some(depth) = depths.get(name) {
            return *depth;
        }
        let depth = self
            .classes
            .get(name)
            .map(|class| {
                class
                    .parents()
                    .iter()
                    .filter(|parent| self.classes.contains_key(*parent))
                    .map(|parent| self.depth_of(parent, depths) + 1)
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);
        depths.insert(name, depth);
        depth
    }
}

fn definition_line(comment: &str, max_len: usize) -> String {
    format!("  {}\n", truncate(comment, max_len))
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_len).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use insta::assert_snapshot;

    use super::truncate;
    use crate::{
        ontology::{Iri, OntologyClass, OntologyProperty, OntologyStore},
        subset::{SchemaSubsetter, SubsetOptions},
        topics::{Topic, TopicSeed, TopicSeedTable},
    };

    fn subsetter() -> SchemaSubsetter {
        let store = OntologyStore::builder(Iri::new("https://example.org/gist/").unwrap())
            .class(OntologyClass::new("Event").with_comment("Something that occurs."))
            .class(
                OntologyClass::new("HistoricalEvent")
                    .with_parent("Event")
                    .with_comment("An event that happened in the past and is not going to change."),
            )
            .class(OntologyClass::new("ScheduledEvent").with_parent("Event").defined())
            .class(OntologyClass::new("Agent"))
            .property(
                OntologyProperty::object("hasParticipant")
                    .with_domain("Event")
                    .with_range("Agent"),
            )
            .property(
                OntologyProperty::datatype("startDateTime")
                    .with_domain("Event")
                    .with_range("xsd:dateTime")
                    .with_comment("When it starts"),
            )
            .build()
            .unwrap();
        let table = TopicSeedTable::new([TopicSeed {
            topic: Topic::Events,
            description: String::new(),
            seed_classes: vec!["Event".into()],
            seed_properties: vec![],
            keywords: vec![],
        }])
        .unwrap();
        SchemaSubsetter::new(Arc::new(store), Arc::new(table))
    }

    #[test]
    fn renders_classes_by_depth_and_properties_by_kind() {
        let subset = subsetter()
            .subset_by_topics(&["events"], &SubsetOptions::default())
            .unwrap();
        assert_snapshot!(subset.to_prompt_text(40), @r"
        # gist Schema (subset)
        Prefix: gist
        Namespace: https://example.org/gist/
        Topics: events

        ## Classes

        ### Depth 0
        gist:Agent
        gist:Event
          Something that occurs.

        ### Depth 1
        gist:HistoricalEvent (subClassOf gist:Event)
          An event that happened in the past and i...
        gist:ScheduledEvent (subClassOf gist:Event) [defined]

        ## Object Properties

        gist:hasParticipant
          [Domain: gist:Event; Range: gist:Agent]

        ## Datatype Properties

        gist:startDateTime
          When it starts
          [Domain: gist:Event; Range: xsd:dateTime]
        ");
    }

    #[test]
    fn rendering_is_repeatable() {
        let subsetter = subsetter();
        let first = subsetter
            .subset_by_topics(&["events"], &SubsetOptions::default())
            .unwrap();
        let second = subsetter
            .subset_by_topics(&["events"], &SubsetOptions::default())
            .unwrap();
        assert_eq!(first.to_prompt_text(120), second.to_prompt_text(120));
    }

    #[test]
    fn every_rendered_line_is_terminated() {
        let subset = subsetter()
            .subset_by_classes(&["ScheduledEvent"], &SubsetOptions::default())
            .unwrap();
        let text = subset.to_prompt_text(120);
        assert!(!text.contains("Topics:"));
        assert!(text.ends_with("  [Domain: gist:Event; Range: xsd:dateTime]\n"));
        assert!(text.contains("gist:ScheduledEvent (subClassOf gist:Event) [defined]\n\n## Object"));
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly", 7), "exactly");
        assert_eq!(truncate("héllo wörld", 5), "héllo...");
    }
}
