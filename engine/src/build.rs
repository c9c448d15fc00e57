//! Batch build of every search artifact from extracted document texts.

use crate::persist::{self, IndexPaths, MetaFile, FORMAT_VERSION};
use crate::tokenizer::Normalizer;
use crate::vector::{compute_weights, TermCounts, TermWeight, VectorModel};
use crate::{DocId, InvertedIndex, LemmaDictionary};
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Extracted plain text of one collection member and its display label.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub label: String,
    pub text: String,
}

pub struct Artifacts {
    pub labels: BTreeMap<DocId, String>,
    pub texts: Vec<String>,
    /// Collection vocabulary without stop words, sorted.
    pub tokens: Vec<String>,
    pub lemmas: LemmaDictionary,
    pub index: InvertedIndex,
    pub termin_weights: Vec<Vec<TermWeight>>,
    pub lemma_weights: Vec<Vec<TermWeight>>,
    pub model: VectorModel,
}

/// Runs the whole pipeline in memory. Document `i` of `docs` becomes id `i + 1`.
///
/// Without a lemma dictionary every token is its own lemma. A supplied
/// dictionary is cut down to the forms that occur in the collection.
pub fn build(docs: Vec<SourceDocument>, normalizer: &Normalizer, lemmas: Option<LemmaDictionary>) -> Artifacts {
    let mut term_sets: Vec<HashSet<String>> = Vec::with_capacity(docs.len());
    let mut counts: Vec<TermCounts> = Vec::with_capacity(docs.len());
    for doc in &docs {
        term_sets.push(normalizer.term_set(&doc.text));
        counts.push(normalizer.term_counts(&doc.text));
    }

    let vocabulary: BTreeSet<String> = term_sets.iter().flatten().cloned().collect();
    let seen: HashSet<String> = vocabulary.iter().cloned().collect();
    let tokens: Vec<String> = vocabulary.into_iter().collect();
    let lemmas = match lemmas {
        Some(dict) => dict.restricted(&seen),
        None => LemmaDictionary::identity(tokens.iter().cloned()),
    };
    tracing::info!(num_docs = docs.len(), tokens = tokens.len(), lemmas = lemmas.len(), "normalized collection");

    let index_sets: Vec<HashSet<String>> = term_sets.iter().map(|set| lemmas.expand(set)).collect();
    let index = InvertedIndex::build(&index_sets);

    let termin_weights = compute_weights(&counts, &tokens);
    let lemma_counts: Vec<TermCounts> = counts.iter().map(|c| c.fold_lemmas(&lemmas)).collect();
    let lemma_vocabulary = lemmas.lemmas();
    let lemma_weights = compute_weights(&lemma_counts, &lemma_vocabulary);
    let model = VectorModel::from_weights(lemma_vocabulary, &lemma_weights);

    let mut labels = BTreeMap::new();
    let mut texts = Vec::with_capacity(docs.len());
    for (pos, doc) in docs.into_iter().enumerate() {
        labels.insert(pos as DocId + 1, doc.label);
        texts.push(doc.text);
    }

    Artifacts { labels, texts, tokens, lemmas, index, termin_weights, lemma_weights, model }
}

impl Artifacts {
    pub fn num_docs(&self) -> u32 {
        self.index.num_docs()
    }

    /// Writes every artifact under `paths.root`, meta last.
    pub fn save(&self, paths: &IndexPaths, created_at: String) -> Result<MetaFile> {
        persist::save_labels(paths, &self.labels)?;
        for (pos, text) in self.texts.iter().enumerate() {
            persist::save_text(paths, pos as DocId + 1, text)?;
        }
        persist::save_tokens(paths, &self.tokens)?;
        persist::save_lemmas(paths, &self.lemmas)?;
        persist::save_inverted_index(paths, &self.index)?;
        persist::save_weights(&paths.termin_weights_dir(), &self.termin_weights)?;
        persist::save_weights(&paths.lemma_weights_dir(), &self.lemma_weights)?;
        persist::save_matrix(paths, &self.model)?;
        let meta = MetaFile { num_docs: self.num_docs(), created_at, version: FORMAT_VERSION };
        persist::save_meta(paths, &meta)?;
        Ok(meta)
    }
}
