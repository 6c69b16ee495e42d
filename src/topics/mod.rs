//! The fixed topic enumeration and the seed table that maps each topic to
//! ontology entry points and a keyword lexicon.

mod seeds;

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

pub use seeds::{Keyword, TopicSeed, TopicSeedTable, TopicTableError};

/// Coarse semantic category used to pick an ontology fragment.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Organizations,
    Events,
    Time,
    Geo,
    Agreements,
    Quantities,
    Content,
    Collections,
    Categories,
    Artifacts,
    Intentions,
}

impl Topic {
    /// Every topic in enumeration order.
    pub const ALL: [Self; 11] = [
        Self::Organizations,
        Self::Events,
        Self::Time,
        Self::Geo,
        Self::Agreements,
        Self::Quantities,
        Self::Content,
        Self::Collections,
        Self::Categories,
        Self::Artifacts,
        Self::Intentions,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organizations => "organizations",
            Self::Events => "events",
            Self::Time => "time",
            Self::Geo => "geo",
            Self::Agreements => "agreements",
            Self::Quantities => "quantities",
            Self::Content => "content",
            Self::Collections => "collections",
            Self::Categories => "categories",
            Self::Artifacts => "artifacts",
            Self::Intentions => "intentions",
        }
    }
}

impl Display for Topic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A name that is not part of the topic enumeration.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown topic `{0}`")]
pub struct UnknownTopic(pub String);

impl FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| UnknownTopic(s.to_string()))
    }
}

/// Parses every name, failing on the first one outside the enumeration.
///
/// # Errors
///
/// Returns [`UnknownTopic`] echoing the offending name.
pub fn parse_topics<S: AsRef<str>>(names: &[S]) -> Result<Vec<Topic>, UnknownTopic> {
    names.iter().map(|name| name.as_ref().parse()).collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{parse_topics, Topic, UnknownTopic};

    #[rstest]
    #[case("organizations", Topic::Organizations)]
    #[case("geo", Topic::Geo)]
    #[case("intentions", Topic::Intentions)]
    fn parses_known_names(#[case] name: &str, #[case] expected: Topic) {
        assert_eq!(name.parse::<Topic>().unwrap(), expected);
        assert_eq!(expected.to_string(), name);
    }

    #[rstest]
    #[case("not_a_real_topic")]
    #[case("Geo")]
    #[case("people")]
    #[case("")]
    fn rejects_unknown_names_verbatim(#[case] name: &str) {
        assert_eq!(name.parse::<Topic>(), Err(UnknownTopic(name.to_string())));
    }

    #[test]
    fn parse_topics_stops_at_first_unknown() {
        let err = parse_topics(&["events", "evnts", "tme"]).unwrap_err();
        assert_eq!(err.to_string(), "unknown topic `evnts`");
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&[Topic::Time, Topic::Artifacts]).unwrap();
        assert_eq!(json, r#"["time","artifacts"]"#);
        let topic: Topic = serde_json::from_str(r#""collections""#).unwrap();
        assert_eq!(topic, Topic::Collections);
    }
}
