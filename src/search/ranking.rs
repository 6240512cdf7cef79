//! Ranking & Scoring
//!
//! Term-counting relevance: every occurrence of a query term inside the
//! clause's property scores, with flat bonuses for clauses whose terms all
//! matched and for records that matched every clause.

use super::parser::NormalizedQuery;
use crate::store::Record;
use std::cmp::Reverse;
use tracing::debug;

/// Scoring weights for the match signals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringWeights {
    /// Added per occurrence of a term
    pub per_occurrence: u64,
    /// Added when every term of a clause matched
    pub all_terms_bonus: u64,
    /// Added when every clause of the query matched
    pub all_clauses_bonus: u64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            per_occurrence: 3,
            all_terms_bonus: 10,
            all_clauses_bonus: 100,
        }
    }
}

/// Count non-overlapping occurrences of `needle` in `haystack`.
///
/// An empty needle matches at every position, giving `chars + 1`.
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return haystack.chars().count() + 1;
    }
    haystack.matches(needle).count()
}

/// Score one record against a normalized query.
///
/// Returns `None` when no term matched; bonuses only ever add to a score a
/// term has already started.
pub fn score_record(record: &Record, query: &NormalizedQuery, weights: &ScoringWeights) -> Option<u64> {
    let mut score: Option<u64> = None;
    let mut clauses_matched = 0;

    for clause in &query.clauses {
        let mut terms_matched = 0;
        let text = record
            .searchable_text(&clause.property)
            .map(|value| value.to_lowercase());

        if let Some(text) = &text {
            for term in &clause.terms {
                let occurrences = count_occurrences(text, term) as u64;
                if occurrences > 0 {
                    terms_matched += 1;
                    let weight = occurrences * weights.per_occurrence;
                    let total = score.get_or_insert(0);
                    *total += weight;
                    debug!(
                        "Found {} in property {}, adding weight {} ({} total)",
                        term, clause.property, weight, total
                    );
                }
            }
        }

        if terms_matched == clause.terms.len() {
            if let Some(total) = score.as_mut() {
                *total += weights.all_terms_bonus;
            }
        }

        if terms_matched > 0 {
            clauses_matched += 1;
        }
    }

    if clauses_matched == query.clauses.len() {
        if let Some(total) = score.as_mut() {
            *total += weights.all_clauses_bonus;
        }
    }

    score
}

/// Sort scored entries by descending score. The sort is stable, so equal
/// scores keep their scan order.
pub fn rank<T>(scored: &mut [(T, u64)]) {
    scored.sort_by_key(|(_, score)| Reverse(*score));
}
