pub mod build;
pub mod html;
pub mod index;
pub mod lemma;
pub mod persist;
pub mod query;
pub mod rank;
pub mod search;
pub mod tokenizer;
pub mod vector;

pub use index::{DocId, IndexRecord, InvertedIndex, PostingSet};
pub use lemma::LemmaDictionary;
pub use query::QueryError;
pub use rank::{RankError, RankedDoc};
pub use search::{Hit, SearchEngine};
pub use vector::{TermCounts, TermWeight, VectorModel};

/// Number of ranked results returned when the caller does not ask for a count.
pub const DEFAULT_TOP_K: usize = 10;
/// Upper bound applied to user-supplied result counts.
pub const MAX_TOP_K: usize = 100;
/// Fractional digits written for idf and tf-idf values in weight files.
pub const WEIGHT_PRECISION: usize = 20;
