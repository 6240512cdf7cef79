//! Ranked search over stored records
//!
//! Queries are lists of clauses (property + terms). Each record is scored by
//! counting term occurrences, with bonuses for complete clauses and for
//! records matching every clause.

pub mod engine;
pub mod error;
pub mod parser;
pub mod ranking;
pub mod vocabulary;


pub use engine::{ScoredResult, SearchEngine, DEFAULT_MINIMUM_WEIGHT, SCORE_FIELD};
pub use error::SearchError;
pub use parser::{parse_clauses, NormalizedQuery, QueryClause, QueryParser};
pub use ranking::{count_occurrences, ScoringWeights};
pub use vocabulary::{StopwordSet, SynonymTable, Vocabulary};
