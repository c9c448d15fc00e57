use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// 1-based position of a document in the collection.
pub type DocId = u32;

/// Documents containing a term. Membership only, no frequencies or positions.
pub type PostingSet = BTreeSet<DocId>;

/// Persisted form of one index entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub count: usize,
    pub inverted_array: Vec<DocId>,
    pub word: String,
}

/// Term -> posting set over a closed collection of `num_docs` documents.
///
/// Immutable once built; `NOT` queries complement against `1..=num_docs`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvertedIndex {
    postings: HashMap<String, PostingSet>,
    num_docs: u32,
}

impl InvertedIndex {
    /// Builds the index from per-document term sets given in document order.
    /// The set at position `i` belongs to document `i + 1`.
    pub fn build<S: AsRef<str>>(term_sets: &[HashSet<S>]) -> Self {
        let mut postings: HashMap<String, PostingSet> = HashMap::new();
        for (pos, terms) in term_sets.iter().enumerate() {
            let doc_id = pos as DocId + 1;
            for term in terms {
                postings.entry(term.as_ref().to_string()).or_default().insert(doc_id);
            }
        }
        let num_docs = term_sets.len() as u32;
        tracing::debug!(num_docs, num_terms = postings.len(), "built inverted index");
        Self { postings, num_docs }
    }

    /// Restores an index from persisted records. Every id must fall in
    /// `1..=num_docs` and `count` must match the posting list length.
    pub fn from_records(records: Vec<IndexRecord>, num_docs: u32) -> Result<Self> {
        let mut postings: HashMap<String, PostingSet> = HashMap::with_capacity(records.len());
        for rec in records {
            if rec.count != rec.inverted_array.len() {
                bail!("word {:?}: count {} but {} ids", rec.word, rec.count, rec.inverted_array.len());
            }
            if let Some(bad) = rec.inverted_array.iter().find(|&&id| id == 0 || id > num_docs) {
                bail!("word {:?}: document id {bad} outside 1..={num_docs}", rec.word);
            }
            if postings.insert(rec.word.clone(), rec.inverted_array.into_iter().collect()).is_some() {
                bail!("word {:?} appears more than once", rec.word);
            }
        }
        Ok(Self { postings, num_docs })
    }

    /// Records sorted by word, ids ascending.
    pub fn to_records(&self) -> Vec<IndexRecord> {
        let mut records: Vec<IndexRecord> = self
            .postings
            .iter()
            .map(|(word, docs)| IndexRecord {
                count: docs.len(),
                inverted_array: docs.iter().copied().collect(),
                word: word.clone(),
            })
            .collect();
        records.sort_by(|a, b| a.word.cmp(&b.word));
        records
    }

    pub fn postings(&self, term: &str) -> Option<&PostingSet> {
        self.postings.get(term)
    }

    /// Owned posting set; empty for unknown terms.
    pub fn posting_set(&self, term: &str) -> PostingSet {
        self.postings.get(term).cloned().unwrap_or_default()
    }

    pub fn universe(&self) -> PostingSet {
        (1..=self.num_docs).collect()
    }

    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> HashSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn postings_follow_document_order() {
        let idx = InvertedIndex::build(&[set(&["cat"]), set(&["cat", "dog"]), set(&["dog"])]);
        assert_eq!(idx.num_docs(), 3);
        assert_eq!(idx.posting_set("cat"), PostingSet::from([1, 2]));
        assert_eq!(idx.posting_set("dog"), PostingSet::from([2, 3]));
        assert!(idx.posting_set("bird").is_empty());
        assert!(idx.postings("bird").is_none());
    }

    #[test]
    fn empty_documents_still_take_an_id() {
        let idx = InvertedIndex::build(&[set(&[]), set(&["owl"]), set(&[])]);
        assert_eq!(idx.num_docs(), 3);
        assert_eq!(idx.universe(), PostingSet::from([1, 2, 3]));
        assert_eq!(idx.posting_set("owl"), PostingSet::from([2]));
    }

    #[test]
    fn records_restore_the_same_index() {
        let idx = InvertedIndex::build(&[set(&["cat", "ant"]), set(&["cat"])]);
        let records = idx.to_records();
        assert_eq!(records[0].word, "ant");
        assert_eq!(records[1], IndexRecord { count: 2, inverted_array: vec![1, 2], word: "cat".into() });
        let restored = InvertedIndex::from_records(records, idx.num_docs()).unwrap();
        assert_eq!(restored, idx);
    }

    fn record(word: &str, count: usize, ids: &[DocId]) -> IndexRecord {
        IndexRecord { count, inverted_array: ids.to_vec(), word: word.into() }
    }

    #[test]
    fn records_with_unknown_documents_are_rejected() {
        let err = InvertedIndex::from_records(vec![record("x", 2, &[1, 7])], 3).unwrap_err();
        assert!(err.to_string().contains("\"x\""));
        assert!(err.to_string().contains("7"));
        assert!(InvertedIndex::from_records(vec![record("x", 1, &[0])], 3).is_err());
        assert!(InvertedIndex::from_records(vec![record("x", 1, &[3])], 3).is_ok());
    }

    #[test]
    fn records_with_wrong_count_or_duplicate_words_are_rejected() {
        let err = InvertedIndex::from_records(vec![record("x", 1, &[1, 2])], 3).unwrap_err();
        assert!(err.to_string().contains("count 1"));
        let dup = vec![record("x", 1, &[1]), record("x", 1, &[2])];
        assert!(InvertedIndex::from_records(dup, 3).is_err());
    }
}
