use std::collections::BTreeMap;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use super::{
    text, ClassificationError, ClassificationMethod, ClassificationResult, ClassifierInitError,
    SignalHit, TopicClassifier,
};
use crate::{
    config::LexicalSettings,
    topics::{Topic, TopicSeedTable},
};

struct CompiledKeyword {
    name: String,
    regex: Regex,
    weight: f64,
}

/// Keyword-lexicon classifier. Pure and synchronous; the async trait method
/// never suspends.
pub struct LexicalTopicClassifier {
    lexicon: Vec<(Topic, Vec<CompiledKeyword>)>,
    settings: LexicalSettings,
    min_confidence: f64,
}

impl LexicalTopicClassifier {
    /// Compiles the lexicon of every topic in `table`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierInitError::Pattern`] for a keyword that does not
    /// compile, or [`ClassifierInitError::InvalidConfiguration`] for a
    /// non-positive normalizer.
    pub fn new(
        table: &TopicSeedTable,
        settings: LexicalSettings,
        min_confidence: f64,
    ) -> Result<Self, ClassifierInitError> {
        if settings.normalizer <= 0.0 {
            return Err(ClassifierInitError::InvalidConfiguration(
                "lexical normalizer must be positive".to_string(),
            ));
        }
        let mut lexicon = Vec::with_capacity(table.len());
        for seed in table.seeds() {
            let mut keywords = Vec::with_capacity(seed.keywords.len());
            for keyword in &seed.keywords {
                let regex = keyword
                    .compile()
                    .map_err(|source| ClassifierInitError::Pattern {
                        topic: seed.topic,
                        keyword: keyword.name.clone(),
                        source,
                    })?;
                keywords.push(CompiledKeyword {
                    name: keyword.name.clone(),
                    regex,
                    weight: keyword.weight,
                });
            }
            lexicon.push((seed.topic, keywords));
        }
        Ok(Self {
            lexicon,
            settings,
            min_confidence,
        })
    }

    #[must_use]
    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Classifies with the configured threshold.
    #[must_use]
    pub fn classify_text(&self, text: &str) -> ClassificationResult {
        self.classify_with_threshold(text, self.min_confidence)
    }

    /// Classifies with an explicit threshold, leaving scores untouched.
    #[must_use]
    pub fn classify_with_threshold(&self, text: &str, threshold: f64) -> ClassificationResult {
        let text = text::prepare(text);
        let mut scores = BTreeMap::new();
        let mut matched_signals = BTreeMap::new();

        for (topic, keywords) in &self.lexicon {
            let mut raw = 0.0;
            let mut hits = Vec::new();
            if !text.is_empty() {
                for keyword in keywords {
                    let count = keyword.regex.find_iter(&text).count();
                    if count == 0 {
                        continue;
                    }
                    raw += keyword.weight * count.min(self.settings.match_cap) as f64;
                    hits.push(SignalHit {
                        keyword: keyword.name.clone(),
                        count,
                    });
                }
            }
            scores.insert(*topic, (raw / self.settings.normalizer).min(1.0));
            if !hits.is_empty() {
                matched_signals.insert(*topic, hits);
            }
        }

        let result = ClassificationResult::from_scores(
            scores,
            matched_signals,
            threshold,
            ClassificationMethod::Keyword,
        );
        debug!(topics = ?result.topics, "lexical classification");
        result
    }
}

#[async_trait]
impl TopicClassifier for LexicalTopicClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassificationError> {
        Ok(self.classify_text(text))
    }

    fn method(&self) -> ClassificationMethod {
        ClassificationMethod::Keyword
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::LexicalTopicClassifier;
    use crate::{
        classify::{ClassificationMethod, SignalHit},
        config::LexicalSettings,
        topics::{Keyword, Topic, TopicSeed, TopicSeedTable},
    };

    fn classifier() -> LexicalTopicClassifier {
        LexicalTopicClassifier::new(&TopicSeedTable::gist(), LexicalSettings::default(), 0.1)
            .expect("built-in lexicon compiles")
    }

    #[rstest]
    #[case("")]
    #[case("   \n\t ")]
    fn empty_text_scores_zero_everywhere(#[case] text: &str) {
        let result = classifier().classify_text(text);
        assert!(result.topics.is_empty());
        assert_eq!(result.scores.len(), Topic::ALL.len());
        assert!(result.scores.values().all(|score| *score == 0.0));
        assert!(result.matched_signals.is_empty());
        assert_eq!(result.method, ClassificationMethod::Keyword);
    }

    #[test]
    fn recognizes_a_landing_report() {
        let result =
            classifier().classify_text("NASA's Perseverance rover landed on Mars in February 2021");
        for topic in [
            Topic::Organizations,
            Topic::Artifacts,
            Topic::Events,
            Topic::Geo,
            Topic::Time,
        ] {
            assert!(result.contains(topic), "missing {topic}");
        }
        assert_eq!(
            result.matched_signals[&Topic::Time],
            vec![
                SignalHit {
                    keyword: "year".to_string(),
                    count: 1
                },
                SignalHit {
                    keyword: "february".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn no_signal_is_a_valid_outcome() {
        let result = classifier().classify_text("Lorem ipsum dolor sit amet");
        assert!(result.topics.is_empty());
    }

    #[test]
    fn single_topic_text_selects_only_that_topic() {
        let result = classifier().classify_text("The spacecraft carried a telescope and a camera.");
        assert_eq!(result.topics, vec![Topic::Artifacts]);
    }

    #[test]
    fn repeated_words_saturate() {
        let table = TopicSeedTable::new([TopicSeed {
            topic: Topic::Geo,
            description: String::new(),
            seed_classes: vec![],
            seed_properties: vec![],
            keywords: vec![Keyword::word("crater"), Keyword::word("valley").with_weight(0.5)],
        }])
        .unwrap();
        let classifier = LexicalTopicClassifier::new(
            &table,
            LexicalSettings {
                normalizer: 10.0,
                match_cap: 3,
            },
            0.1,
        )
        .unwrap();

        let once = classifier.classify_text("crater");
        let many = classifier.classify_text("crater crater crater crater crater crater valley");
        assert!((once.score(Topic::Geo) - 0.1).abs() < 1e-9);
        assert!((many.score(Topic::Geo) - 0.35).abs() < 1e-9);
        assert_eq!(many.matched_signals[&Topic::Geo][0].count, 6);
    }

    #[test]
    fn overlapping_keywords_count_for_every_topic() {
        let result = classifier().classify_text("A new collaboration was announced.");
        assert!(result.contains(Topic::Organizations));
        assert!(result.contains(Topic::Agreements));
    }

    #[test]
    fn html_markup_is_ignored() {
        let html = "<html><head><style>.rover { color: red }</style></head>\
                    <body><nav>Mars rover news</nav><p>The telescope observed a comet.</p></body></html>";
        let result = classifier().classify_text(html);
        assert!(result.contains(Topic::Artifacts));
        assert!(!result.contains(Topic::Geo));
        let artifacts = &result.matched_signals[&Topic::Artifacts];
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].keyword, "telescope");
    }

    #[test]
    fn classification_is_deterministic() {
        let classifier = classifier();
        let text = "SpaceX launched a satellite constellation in 2024.";
        assert_eq!(classifier.classify_text(text), classifier.classify_text(text));
    }
}
