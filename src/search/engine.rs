//! Search Engine Integration
//!
//! Ties together query normalization and scoring: every record of a source
//! is scored against the query and the matches are returned best first.

use super::error::SearchError;
use super::parser::{QueryClause, QueryParser};
use super::ranking::{rank, score_record, ScoringWeights};
use super::vocabulary::Vocabulary;
use crate::store::record::hand_out;
use crate::store::{Record, RecordSource};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;
use tracing::debug;

/// Threshold used when the caller has no preference
pub const DEFAULT_MINIMUM_WEIGHT: u64 = 0;

/// Field the relevance score is written to when a result is serialized
pub const SCORE_FIELD: &str = "score";

/// A matching record together with its relevance score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredResult {
    pub record: Arc<Record>,
    pub score: u64,
}

/// Serializes as the record's fields plus `score`. A stored `score` field
/// is replaced so the key appears exactly once.
impl Serialize for ScoredResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.record.fields();
        let shadowed = usize::from(fields.contains_key(SCORE_FIELD));

        let mut map = serializer.serialize_map(Some(fields.len() - shadowed + 1))?;
        for (name, value) in fields.iter().filter(|(name, _)| name.as_str() != SCORE_FIELD) {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(SCORE_FIELD, &self.score)?;
        map.end()
    }
}

/// Stateless ranked search over a record source
#[derive(Debug, Clone, Default)]
pub struct SearchEngine {
    vocabulary: Vocabulary,
    scoring_weights: ScoringWeights,
}

impl SearchEngine {
    /// Create a search engine with the given synonym and stopword tables
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self {
            vocabulary,
            scoring_weights: ScoringWeights::default(),
        }
    }

    /// Create search engine with custom weights
    pub fn with_weights(vocabulary: Vocabulary, weights: ScoringWeights) -> Self {
        Self {
            vocabulary,
            scoring_weights: weights,
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Rank every record of `source` against `clauses`.
    ///
    /// Only records scoring strictly above `minimum_weight` are returned,
    /// highest score first; equal scores keep the source's order. Records
    /// without an `id` are never returned.
    pub fn search<S>(
        &self,
        source: &S,
        clauses: &[QueryClause],
        minimum_weight: u64,
    ) -> Result<Vec<ScoredResult>, SearchError>
    where
        S: RecordSource + ?Sized,
    {
        self.search_above(source, clauses, minimum_weight as f64)
    }

    /// Like [`search`](Self::search) with a fractional or negative
    /// threshold, as received from JSON clients
    pub fn search_above<S>(
        &self,
        source: &S,
        clauses: &[QueryClause],
        minimum_weight: f64,
    ) -> Result<Vec<ScoredResult>, SearchError>
    where
        S: RecordSource + ?Sized,
    {
        debug!("Searching storage, got {} query objects", clauses.len());

        let query = QueryParser::normalize(clauses, &self.vocabulary)?;
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored = Vec::new();
        for (key, record) in source.snapshot() {
            let Some(id) = record.id() else {
                debug!("Skipping data object {} without id", key);
                continue;
            };
            debug!("Looking at data object {}", id);

            if let Some(score) = score_record(&record, &query, &self.scoring_weights) {
                scored.push((record, score));
            }
        }

        rank(&mut scored);

        let results: Vec<ScoredResult> = scored
            .into_iter()
            .filter(|(_, score)| *score as f64 > minimum_weight)
            .map(|(record, score)| ScoredResult {
                record: hand_out(&record),
                score,
            })
            .collect();

        debug!("Search returned {} results", results.len());
        Ok(results)
    }
}
