//! tf-idf vector space model.
//!
//! `tf(d, t) = count(d, t) / total(d)`, `idf(t) = ln(N / df(t))` and each
//! document row of the dense matrix is scaled to unit length. A term present
//! in every document gets an idf of exactly `0.0`.

use crate::index::DocId;
use crate::lemma::LemmaDictionary;
use std::collections::HashMap;

/// Raw occurrence counts of one document plus the denominator used for tf.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TermCounts {
    counts: HashMap<String, u32>,
    total: u32,
}

impl TermCounts {
    /// Counts a token stream; the total is the number of tokens.
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut counts: HashMap<String, u32> = HashMap::new();
        let mut total = 0;
        for term in terms {
            *counts.entry(term.into()).or_insert(0) += 1;
            total += 1;
        }
        Self { counts, total }
    }

    pub fn get(&self, term: &str) -> u32 {
        self.counts.get(term).copied().unwrap_or(0)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.counts.get(term).is_some_and(|&c| c > 0)
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(t, &c)| (t.as_str(), c))
    }

    /// Lemma counts: each lemma sums the counts of its surface forms. The
    /// total stays the raw token total so lemma tf shares the raw denominator.
    pub fn fold_lemmas(&self, lemmas: &LemmaDictionary) -> TermCounts {
        let mut counts = HashMap::new();
        for (lemma, forms) in lemmas.iter() {
            let count: u32 = forms.iter().map(|f| self.get(f)).sum();
            if count != 0 {
                counts.insert(lemma.to_string(), count);
            }
        }
        TermCounts { counts, total: self.total }
    }
}

/// One line of a per-document weight file.
#[derive(Debug, Clone, PartialEq)]
pub struct TermWeight {
    pub term: String,
    pub idf: f64,
    pub tfidf: f64,
}

fn document_frequencies(docs: &[TermCounts]) -> HashMap<&str, u32> {
    let mut df: HashMap<&str, u32> = HashMap::new();
    for doc in docs {
        for (term, count) in doc.iter() {
            if count > 0 {
                *df.entry(term).or_insert(0) += 1;
            }
        }
    }
    df
}

fn inverse_document_frequency(num_docs: usize, df: u32) -> f64 {
    if df == 0 || df as usize >= num_docs {
        0.0
    } else {
        (num_docs as f64 / df as f64).ln()
    }
}

/// Per-document weights for the vocabulary terms each document contains,
/// sorted by term.
pub fn compute_weights<S: AsRef<str>>(docs: &[TermCounts], vocabulary: &[S]) -> Vec<Vec<TermWeight>> {
    let df = document_frequencies(docs);
    let n = docs.len();
    docs.iter()
        .map(|doc| {
            let mut weights: Vec<TermWeight> = vocabulary
                .iter()
                .map(|term| term.as_ref())
                .filter(|term| doc.contains(term))
                .map(|term| {
                    let idf = inverse_document_frequency(n, df.get(term).copied().unwrap_or(0));
                    let tf = if doc.total() == 0 { 0.0 } else { doc.get(term) as f64 / doc.total() as f64 };
                    let tfidf = if idf == 0.0 { 0.0 } else { tf * idf };
                    TermWeight { term: term.to_string(), idf, tfidf }
                })
                .collect();
            weights.sort_by(|a, b| a.term.cmp(&b.term));
            weights.dedup_by(|a, b| a.term == b.term);
            weights
        })
        .collect()
}

/// Dense row-normalized document x term matrix with the corpus idf per column.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorModel {
    vocabulary: Vec<String>,
    slots: HashMap<String, usize>,
    idf: Vec<f64>,
    rows: Vec<Vec<f64>>,
}

impl VectorModel {
    /// Builds the model from per-document counts. Row `i` belongs to document `i + 1`.
    pub fn build(docs: &[TermCounts], vocabulary: Vec<String>) -> Self {
        let weights = compute_weights(docs, &vocabulary);
        Self::from_weights(vocabulary, &weights)
    }

    /// Assembles the matrix from per-document weights, e.g. loaded from weight
    /// files. Terms outside the vocabulary are ignored.
    pub fn from_weights(vocabulary: Vec<String>, weights: &[Vec<TermWeight>]) -> Self {
        let (vocabulary, slots) = slot_map(vocabulary);
        let mut idf = vec![0.0; vocabulary.len()];
        let mut rows = Vec::with_capacity(weights.len());
        for doc in weights {
            let mut row = vec![0.0; vocabulary.len()];
            for w in doc {
                if let Some(&slot) = slots.get(&w.term) {
                    row[slot] = w.tfidf;
                    idf[slot] = w.idf;
                }
            }
            normalize(&mut row);
            rows.push(row);
        }
        tracing::debug!(num_docs = rows.len(), dimensions = vocabulary.len(), "assembled weight matrix");
        Self { vocabulary, slots, idf, rows }
    }

    /// Restores a model from its parts. Rows are taken as already normalized.
    pub fn from_parts(vocabulary: Vec<String>, idf: Vec<f64>, rows: Vec<Vec<f64>>) -> anyhow::Result<Self> {
        let (vocabulary, slots) = slot_map(vocabulary);
        if idf.len() != vocabulary.len() {
            anyhow::bail!("idf has {} entries for {} vocabulary terms", idf.len(), vocabulary.len());
        }
        if let Some(pos) = rows.iter().position(|r| r.len() != vocabulary.len()) {
            anyhow::bail!("matrix row {} has {} columns, expected {}", pos + 1, rows[pos].len(), vocabulary.len());
        }
        Ok(Self { vocabulary, slots, idf, rows })
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn slot(&self, term: &str) -> Option<usize> {
        self.slots.get(term).copied()
    }

    /// Corpus idf of a vocabulary term.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.slot(term).map(|s| self.idf[s])
    }

    pub fn idf_values(&self) -> &[f64] {
        &self.idf
    }

    pub fn row(&self, doc_id: DocId) -> Option<&[f64]> {
        let pos = (doc_id as usize).checked_sub(1)?;
        self.rows.get(pos).map(Vec::as_slice)
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn num_docs(&self) -> usize {
        self.rows.len()
    }

    pub fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }
}

// Later duplicates of a term are dropped so every term owns one column.
fn slot_map(vocabulary: Vec<String>) -> (Vec<String>, HashMap<String, usize>) {
    let mut slots = HashMap::with_capacity(vocabulary.len());
    let mut unique = Vec::with_capacity(vocabulary.len());
    for term in vocabulary {
        if !slots.contains_key(&term) {
            slots.insert(term.clone(), unique.len());
            unique.push(term);
        }
    }
    (unique, slots)
}

pub(crate) fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Scales `v` to unit length. Zero vectors are left untouched.
pub(crate) fn normalize(v: &mut [f64]) -> bool {
    let n = norm(v);
    if n == 0.0 {
        return false;
    }
    for x in v.iter_mut() {
        *x /= n;
    }
    true
}
