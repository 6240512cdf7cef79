//! Query clauses and their normalization
//!
//! Callers describe a search as an ordered list of clauses, each naming a
//! record property and the terms to look for in it. Before scoring, the
//! clauses are normalized into an immutable `NormalizedQuery`: synonyms are
//! expanded, stopwords and short terms dropped, everything lower-cased.

use super::error::SearchError;
use super::vocabulary::Vocabulary;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Terms shorter than this (in UTF-16 code units, so a character outside the
/// Basic Multilingual Plane counts twice) are never scored
pub const MIN_TERM_LENGTH: usize = 3;

/// One search constraint: look for `terms` inside `property`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryClause {
    #[serde(alias = "searchProperty")]
    pub property: String,
    #[serde(alias = "searchTerms")]
    pub terms: Vec<String>,
    /// Accepted and carried through, but not consulted by scoring
    #[serde(default)]
    pub mandatory: bool,
}

impl QueryClause {
    pub fn new<I, S>(property: &str, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            property: property.to_string(),
            terms: terms.into_iter().map(Into::into).collect(),
            mandatory: false,
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }
}

/// Command-line clause syntax: `property:term,term` with an optional
/// leading `+` marking the clause mandatory
impl FromStr for QueryClause {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mandatory, rest) = match s.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (property, terms) = rest.split_once(':').ok_or_else(|| SearchError::InvalidClause {
            index: 0,
            reason: format!("expected property:terms, got '{}'", s),
        })?;

        let terms = terms
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            property: property.trim().to_string(),
            terms,
            mandatory,
        })
    }
}

/// Decode a JSON array of clauses
pub fn parse_clauses(json: &str) -> Result<Vec<QueryClause>, SearchError> {
    Ok(serde_json::from_str(json)?)
}

/// A clause after synonym expansion and pruning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedClause {
    pub property: String,
    /// Surviving terms, lower-cased, in query order
    pub terms: Vec<String>,
    pub mandatory: bool,
}

/// Immutable query representation the scorer works on
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedQuery {
    pub clauses: Vec<NormalizedClause>,
}

impl NormalizedQuery {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }
}

/// Builds normalized queries from raw clauses
pub struct QueryParser;

impl QueryParser {
    /// Validate and normalize raw clauses. The input is left untouched.
    pub fn normalize(
        clauses: &[QueryClause],
        vocabulary: &Vocabulary,
    ) -> Result<NormalizedQuery, SearchError> {
        let mut normalized = Vec::with_capacity(clauses.len());

        for (index, clause) in clauses.iter().enumerate() {
            if clause.property.trim().is_empty() {
                return Err(SearchError::InvalidClause {
                    index,
                    reason: "property is empty".to_string(),
                });
            }

            debug!(
                "Looking at property {} to find {:?}",
                clause.property, clause.terms
            );

            let terms = Self::expand_synonyms(&clause.terms, vocabulary)
                .into_iter()
                .filter(|term| Self::is_scorable(term, vocabulary))
                .map(|term| term.to_lowercase())
                .collect();

            normalized.push(NormalizedClause {
                property: clause.property.clone(),
                terms,
                mandatory: clause.mandatory,
            });
        }

        Ok(NormalizedQuery {
            clauses: normalized,
        })
    }

    /// Append the canonical term of every alias; appended terms are not
    /// expanded again
    fn expand_synonyms(terms: &[String], vocabulary: &Vocabulary) -> Vec<String> {
        let mut expanded = terms.to_vec();

        for term in terms {
            if let Some(canonical) = vocabulary.synonyms.canonical(term) {
                debug!(
                    "Identified functional equivalent for {}, adding {} to search terms",
                    term, canonical
                );
                expanded.push(canonical.to_string());
            }
        }

        expanded
    }

    fn is_scorable(term: &str, vocabulary: &Vocabulary) -> bool {
        if vocabulary.stopwords.contains(term) {
            debug!("Dropping stop word {}", term);
            return false;
        }
        if term.encode_utf16().count() < MIN_TERM_LENGTH {
            debug!("Dropping short term {}", term);
            return false;
        }
        true
    }
}
