//! Persistable classification records and corpus coverage summaries.
//!
//! Records are what batch tooling stores per article; the report summarizes
//! a set of records the way a corpus review needs it: how often each topic
//! appears, which topic combinations dominate and which articles carry
//! little or no signal.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    classify::{ClassificationMethod, ClassificationResult},
    topics::Topic,
};

/// Classification of one article, keyed by a stable identifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub article_id: String,
    pub topics: Vec<Topic>,
    /// Non-zero scores only.
    pub confidence: BTreeMap<Topic, f64>,
    pub method: ClassificationMethod,
    pub classified_at: DateTime<Utc>,
}

impl ClassificationRecord {
    /// Record stamped with the current time.
    #[must_use]
    pub fn new(article_id: impl Into<String>, result: &ClassificationResult) -> Self {
        Self::at(article_id, result, Utc::now())
    }

    #[must_use]
    pub fn at(
        article_id: impl Into<String>,
        result: &ClassificationResult,
        classified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            article_id: article_id.into(),
            topics: result.topics.clone(),
            confidence: result
                .scores
                .iter()
                .filter(|(_, score)| **score > 0.0)
                .map(|(topic, score)| (*topic, *score))
                .collect(),
            method: result.method,
            classified_at,
        }
    }
}

/// Aggregate view over a set of records.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CoverageReport {
    pub total: usize,
    /// Number of records listing each topic.
    pub topic_distribution: BTreeMap<Topic, usize>,
    /// Topic sets (in enumeration order) with their frequency, most common
    /// first.
    pub combinations: Vec<(Vec<Topic>, usize)>,
    /// Records without any topic.
    pub uncovered: usize,
}

impl CoverageReport {
    #[must_use]
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ClassificationRecord>) -> Self {
        let mut report = Self::default();
        let mut combinations: BTreeMap<Vec<Topic>, usize> = BTreeMap::new();

        for record in records {
            report.total += 1;
            if record.topics.is_empty() {
                report.uncovered += 1;
            }
            for topic in &record.topics {
                *report.topic_distribution.entry(*topic).or_default() += 1;
            }
            let mut key = record.topics.clone();
            key.sort();
            key.dedup();
            *combinations.entry(key).or_default() += 1;
        }

        report.combinations = combinations.into_iter().collect();
        report
            .combinations
            .sort_by(|(a_topics, a), (b_topics, b)| b.cmp(a).then_with(|| a_topics.cmp(b_topics)));
        report
    }

    /// Share of records listing `topic`, in percent.
    #[must_use]
    pub fn percentage(&self, topic: Topic) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let count = self.topic_distribution.get(&topic).copied().unwrap_or_default();
        count as f64 * 100.0 / self.total as f64
    }

    /// The `n` most common topic combinations.
    #[must_use]
    pub fn top_combinations(&self, n: usize) -> &[(Vec<Topic>, usize)] {
        &self.combinations[..n.min(self.combinations.len())]
    }
}

/// Records listing `topic`, highest confidence first.
#[must_use]
pub fn articles_for_topic(
    records: &[ClassificationRecord],
    topic: Topic,
    limit: usize,
) -> Vec<(&str, f64)> {
    let mut hits: Vec<(&str, f64)> = records
        .iter()
        .filter(|record| record.topics.contains(&topic))
        .map(|record| {
            (
                record.article_id.as_str(),
                record.confidence.get(&topic).copied().unwrap_or_default(),
            )
        })
        .collect();
    hits.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    hits.truncate(limit);
    hits
}

/// Records with at most `max_topics` topics.
#[must_use]
pub fn low_coverage(records: &[ClassificationRecord], max_topics: usize) -> Vec<&ClassificationRecord> {
    records
        .iter()
        .filter(|record| record.topics.len() <= max_topics)
        .collect()
}
