use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::Topic;

fn default_weight() -> f64 {
    1.0
}

/// One lexical signal: a case-insensitive regular expression and its weight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    /// Name reported in matched signals.
    pub name: String,
    pub pattern: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl Keyword {
    /// Whole-word match for a literal word or phrase.
    #[must_use]
    pub fn word(word: &str) -> Self {
        Self {
            name: word.to_string(),
            pattern: format!(r"\b{}\b", regex::escape(word)),
            weight: default_weight(),
        }
    }

    #[must_use]
    pub fn pattern(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            weight: default_weight(),
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Compiles the pattern for case-insensitive matching.
    ///
    /// # Errors
    ///
    /// Returns the regex error when the pattern is invalid.
    pub fn compile(&self) -> Result<Regex, regex::Error> {
        RegexBuilder::new(&self.pattern)
            .case_insensitive(true)
            .build()
    }
}

/// Entry points and lexicon of a single topic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopicSeed {
    pub topic: Topic,
    /// One-line description shown to scoring services.
    pub description: String,
    pub seed_classes: Vec<String>,
    /// Properties included regardless of domain/range matching.
    pub seed_properties: Vec<String>,
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, thiserror::Error)]
pub enum TopicTableError {
    #[error("failed to read topic table `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error("topic `{0}` is defined more than once")]
    DuplicateTopic(Topic),
    #[error("keyword `{keyword}` of topic `{topic}` has an invalid pattern: {source}")]
    InvalidPattern {
        topic: Topic,
        keyword: String,
        source: regex::Error,
    },
}

#[derive(Deserialize)]
struct SeedDocument {
    topics: Vec<SeedEntry>,
}

#[derive(Deserialize)]
struct SeedEntry {
    topic: Topic,
    #[serde(default)]
    description: String,
    #[serde(default)]
    seed_classes: Vec<String>,
    #[serde(default)]
    seed_properties: Vec<String>,
    /// Shorthand for whole-word keywords of weight 1.
    #[serde(default)]
    words: Vec<String>,
    #[serde(default)]
    keywords: Vec<Keyword>,
}

impl From<SeedEntry> for TopicSeed {
    fn from(entry: SeedEntry) -> Self {
        let mut keywords: Vec<Keyword> = entry.words.iter().map(|w| Keyword::word(w)).collect();
        keywords.extend(entry.keywords);
        Self {
            topic: entry.topic,
            description: entry.description,
            seed_classes: entry.seed_classes,
            seed_properties: entry.seed_properties,
            keywords,
        }
    }
}

/// Static, versioned topic configuration shared by the subsetter and the
/// classifiers.
#[derive(Clone, Debug, PartialEq)]
pub struct TopicSeedTable {
    seeds: BTreeMap<Topic, TopicSeed>,
}

impl Default for TopicSeedTable {
    fn default() -> Self {
        Self::gist()
    }
}

impl TopicSeedTable {
    /// Builds a table from explicit seeds, validating every keyword pattern.
    ///
    /// # Errors
    ///
    /// Fails on a repeated topic or a pattern that does not compile.
    pub fn new(seeds: impl IntoIterator<Item = TopicSeed>) -> Result<Self, TopicTableError> {
        let mut table = BTreeMap::new();
        for seed in seeds {
            for keyword in &seed.keywords {
                keyword
                    .compile()
                    .map_err(|source| TopicTableError::InvalidPattern {
                        topic: seed.topic,
                        keyword: keyword.name.clone(),
                        source,
                    })?;
            }
            let topic = seed.topic;
            if table.insert(topic, seed).is_some() {
                return Err(TopicTableError::DuplicateTopic(topic));
            }
        }
        Ok(Self { seeds: table })
    }

    /// Parses a YAML document of the form `topics: [{ topic, description,
    /// seed_classes, seed_properties, words, keywords }]`.
    ///
    /// # Errors
    ///
    /// See [`TopicSeedTable::new`]; also fails on malformed YAML or a topic
    /// name outside the enumeration.
    pub fn from_yaml(text: &str) -> Result<Self, TopicTableError> {
        let document: SeedDocument = serde_yaml::from_str(text)?;
        Self::new(document.topics.into_iter().map(TopicSeed::from))
    }

    /// Reads [`TopicSeedTable::from_yaml`] input from disk.
    ///
    /// # Errors
    ///
    /// See [`TopicSeedTable::from_yaml`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TopicTableError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TopicTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    #[must_use]
    pub fn seed(&self, topic: Topic) -> Option<&TopicSeed> {
        self.seeds.get(&topic)
    }

    /// Topics present in the table, in enumeration order.
    pub fn topics(&self) -> impl Iterator<Item = Topic> + '_ {
        self.seeds.keys().copied()
    }

    pub fn seeds(&self) -> impl Iterator<Item = &TopicSeed> {
        self.seeds.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    /// The built-in table for the gist upper ontology and a space-news
    /// lexicon.
    #[must_use]
    pub fn gist() -> Self {
        let seeds = [
            seed(
                Topic::Organizations,
                "Companies, agencies, teams, governments",
                &[
                    "Organization",
                    "GovernmentOrganization",
                    "CountryGovernment",
                    "SubCountryGovernment",
                    "IntergovernmentalOrganization",
                    "Person",
                ],
                &[
                    "hasMember",
                    "isMemberOf",
                    "isGovernedBy",
                    "hasJurisdictionOver",
                    "isUnderJurisdictionOf",
                    "owns",
                    "isOwnedBy",
                ],
                words(&[
                    "NASA",
                    "ESA",
                    "SpaceX",
                    "Boeing",
                    "Lockheed",
                    "agency",
                    "organization",
                    "company",
                    "corporation",
                    "government",
                    "institution",
                    "team",
                    "mission control",
                    "consortium",
                    "collaboration",
                    "partnership",
                ]),
            ),
            seed(
                Topic::Events,
                "Launches, discoveries, missions, occurrences",
                &[
                    "Event",
                    "HistoricalEvent",
                    "ContemporaryEvent",
                    "PhysicalEvent",
                    "ScheduledEvent",
                    "Determination",
                    "Transaction",
                    "Task",
                    "Project",
                ],
                &[
                    "isParticipantIn",
                    "hasParticipant",
                    "isAffectedBy",
                    "affects",
                    "isTriggeredBy",
                    "produces",
                    "isProducedBy",
                    "occursIn",
                ],
                words(&[
                    "launch",
                    "landed",
                    "mission",
                    "discovery",
                    "collision",
                    "impact",
                    "eclipse",
                    "transit",
                    "event",
                    "occurred",
                    "happened",
                    "detected",
                    "observed",
                    "exploded",
                    "crashed",
                    "docked",
                    "deployed",
                    "experiment",
                    "test",
                ]),
            ),
            seed(
                Topic::Time,
                "Dates, durations, temporal references",
                &["TimeInterval", "TemporalRelation"],
                &[
                    "atDateTime",
                    "startDateTime",
                    "endDateTime",
                    "actualStartDateTime",
                    "actualEndDateTime",
                    "actualStartDate",
                    "actualEndDate",
                    "plannedStartDateTime",
                    "plannedEndDateTime",
                    "plannedStartDate",
                    "plannedEndDate",
                    "birthDate",
                    "deathDate",
                    "hasStart",
                    "hasEnd",
                    "hasGiver",
                    "hasRecipient",
                ],
                {
                    let mut keywords = vec![
                        Keyword::pattern("year", r"\b\d{4}\b"),
                        Keyword::pattern("years ago", r"\byears? ago\b"),
                        Keyword::pattern("in N years", r"\bin \d+ years?\b"),
                    ];
                    keywords.extend(words(&[
                        "january",
                        "february",
                        "march",
                        "april",
                        "may",
                        "june",
                        "july",
                        "august",
                        "september",
                        "october",
                        "november",
                        "december",
                        "monday",
                        "tuesday",
                        "wednesday",
                        "thursday",
                        "friday",
                        "saturday",
                        "sunday",
                        "yesterday",
                        "today",
                        "tomorrow",
                        "century",
                        "decade",
                        "millennium",
                        "billion years",
                        "million years",
                    ]));
                    keywords
                },
            ),
            seed(
                Topic::Geo,
                "Locations, places, regions (planets, moons, etc.)",
                &[
                    "GeoLocation",
                    "GeoPoint",
                    "GeoRegion",
                    "GeoVolume",
                    "GeoRoute",
                    "GovernedGeoRegion",
                    "CountryGeoRegion",
                    "Landmark",
                    "Building",
                    "PhysicalAddress",
                ],
                &[
                    "hasPhysicalLocation",
                    "isGeoContainedIn",
                    "latitude",
                    "longitude",
                    "refersTo",
                    "hasAddress",
                ],
                words(&[
                    "Earth",
                    "Mars",
                    "Venus",
                    "Jupiter",
                    "Saturn",
                    "Uranus",
                    "Neptune",
                    "Mercury",
                    "Pluto",
                    "Moon",
                    "location",
                    "latitude",
                    "longitude",
                    "crater",
                    "mountain",
                    "valley",
                    "plain",
                    "region",
                    "area",
                    "zone",
                    "site",
                    "landing site",
                    "hemisphere",
                    "pole",
                    "equator",
                ]),
            ),
            seed(
                Topic::Agreements,
                "Contracts, partnerships, collaborations",
                &[
                    "Agreement",
                    "Contract",
                    "Commitment",
                    "ContingentObligation",
                    "Offer",
                    "Account",
                    "ContractTerm",
                ],
                &[
                    "hasParty",
                    "hasGiver",
                    "hasRecipient",
                    "offersToProvide",
                    "offersToReceive",
                    "isUnderJurisdictionOf",
                    "conformsTo",
                ],
                words(&[
                    "agreement",
                    "contract",
                    "treaty",
                    "accord",
                    "partnership",
                    "collaboration",
                    "memorandum",
                    "commitment",
                    "obligation",
                ]),
            ),
            seed(
                Topic::Quantities,
                "Measurements, numbers with units",
                &[
                    "Magnitude",
                    "Aspect",
                    "UnitOfMeasure",
                    "ReferenceValue",
                    "SimpleUnitOfMeasure",
                    "CoherentProductUnitOfMeasure",
                    "StandardUnitOfMeasure",
                    "ProductUnitOfMeasure",
                    "RatioUnitOfMeasure",
                    "UnitGroup",
                ],
                &[
                    "hasMagnitude",
                    "hasAspect",
                    "hasUnitOfMeasure",
                    "numericValue",
                    "conversionFactor",
                    "conversionOffset",
                    "hasBaseUnit",
                ],
                vec![
                    Keyword::pattern(
                        "measurement",
                        r"\b\d+(?:[.,]\d+)?\s*(?:km|kilometers?|meters?|miles?|kg|kilograms?|tons?|grams?|light-years?|lightyears?|AU|parsecs?|degrees?|kelvin|celsius|mph|kph|m/s|percent)\b",
                    ),
                    Keyword::pattern("percentage", r"\b\d+(?:[.,]\d+)?\s*%"),
                ],
            ),
            seed(
                Topic::Content,
                "Images, data, papers, communications",
                &[
                    "Content",
                    "ContentExpression",
                    "FormattedContent",
                    "Message",
                    "IntellectualProperty",
                    "KnowledgeConcept",
                    "ID",
                    "Address",
                    "ElectronicAddress",
                ],
                &[
                    "isExpressedIn",
                    "isRenderedOn",
                    "isAbout",
                    "uniqueText",
                    "containedText",
                    "name",
                    "description",
                    "comesFromAgent",
                    "goesToAgent",
                ],
                words(&[
                    "image",
                    "photo",
                    "video",
                    "data",
                    "signal",
                    "message",
                    "communication",
                    "transmission",
                    "paper",
                    "study",
                    "research",
                    "report",
                    "publication",
                    "article",
                    "document",
                    "recording",
                ]),
            ),
            seed(
                Topic::Collections,
                "Catalogs, databases, sets",
                &[
                    "Collection",
                    "OrderedCollection",
                    "OrderedMember",
                    "ControlledVocabulary",
                    "Network",
                    "NetworkNode",
                    "NetworkLink",
                ],
                &[
                    "isMemberOf",
                    "hasMember",
                    "isDirectPartOf",
                    "hasDirectPart",
                    "precedesDirectly",
                    "precedes",
                    "sequence",
                    "providesOrderFor",
                    "isFirstMemberOf",
                    "links",
                ],
                words(&[
                    "catalog",
                    "database",
                    "survey",
                    "collection",
                    "archive",
                    "set of",
                    "series of",
                    "group of",
                    "array",
                    "network",
                    "constellation",
                ]),
            ),
            seed(
                Topic::Categories,
                "Classifications, types (asteroid types, star classes)",
                &[
                    "Category",
                    "Tag",
                    "Behavior",
                    "ProductCategory",
                    "EquipmentType",
                    "MediaType",
                    "GeneralMediaType",
                    "Discipline",
                ],
                &["isCategorizedBy", "isAllocatedBy"],
                words(&[
                    "asteroid",
                    "comet",
                    "planet",
                    "star",
                    "galaxy",
                    "nebula",
                    "exoplanet",
                    "type",
                    "class",
                    "category",
                    "kind",
                    "species",
                    "genus",
                ]),
            ),
            seed(
                Topic::Artifacts,
                "Spacecraft, instruments, equipment",
                &[
                    "PhysicalIdentifiableItem",
                    "Equipment",
                    "Landmark",
                    "Building",
                    "PhysicalSubstance",
                    "LivingThing",
                ],
                &["isMadeUpOf", "hasBiologicalParent"],
                words(&[
                    "spacecraft",
                    "satellite",
                    "rover",
                    "lander",
                    "probe",
                    "telescope",
                    "instrument",
                    "camera",
                    "sensor",
                    "detector",
                    "antenna",
                    "rocket",
                    "vehicle",
                    "equipment",
                    "device",
                    "tool",
                    "module",
                ]),
            ),
            seed(
                Topic::Intentions,
                "Plans, goals, requirements, specifications",
                &[
                    "Intention",
                    "Requirement",
                    "Restriction",
                    "Permission",
                    "Function",
                    "Specification",
                    "CatalogItem",
                    "EventSpecification",
                ],
                &["allows", "prevents", "requires", "conformsTo"],
                words(&[
                    "plan",
                    "intend",
                    "goal",
                    "objective",
                    "purpose",
                    "aim",
                    "target",
                    "requirement",
                    "specification",
                    "design",
                    "intended",
                ]),
            ),
        ];

        Self {
            seeds: seeds.into_iter().map(|seed| (seed.topic, seed)).collect(),
        }
    }
}

fn seed(
    topic: Topic,
    description: &str,
    classes: &[&str],
    properties: &[&str],
    keywords: Vec<Keyword>,
) -> TopicSeed {
    TopicSeed {
        topic,
        description: description.to_string(),
        seed_classes: classes.iter().map(|c| (*c).to_string()).collect(),
        seed_properties: properties.iter().map(|p| (*p).to_string()).collect(),
        keywords,
    }
}

fn words(words: &[&str]) -> Vec<Keyword> {
    words.iter().map(|w| Keyword::word(w)).collect()
}
