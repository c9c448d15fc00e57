use crate::persist::{self, IndexPaths};
use crate::tokenizer::query_terms;
use crate::{query, rank, DocId, InvertedIndex, LemmaDictionary, QueryError, RankError, VectorModel};
use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub doc_id: DocId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Boolean index, vector model and lemma dictionary of one collection.
/// Read-only after construction, so it can be shared across threads as is.
pub struct SearchEngine {
    paths: IndexPaths,
    labels: BTreeMap<DocId, String>,
    index: InvertedIndex,
    lemmas: LemmaDictionary,
    model: VectorModel,
}

impl SearchEngine {
    /// Loads every artifact the indexer writes. Any missing or inconsistent
    /// artifact fails the load.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let paths = IndexPaths::new(dir);
        let meta = persist::load_meta(&paths)?;
        let labels = persist::load_labels(&paths)?;
        let index = persist::load_inverted_index(&paths, meta.num_docs)?;
        let lemmas = persist::load_lemmas(&paths)?;
        let model = persist::load_matrix(&paths)?;
        if model.num_docs() != meta.num_docs as usize {
            bail!(
                "{} holds {} documents but meta.json declares {}",
                paths.matrix().display(),
                model.num_docs(),
                meta.num_docs
            );
        }
        tracing::info!(
            num_docs = meta.num_docs,
            num_terms = index.num_terms(),
            dimensions = model.dimensions(),
            "loaded search engine"
        );
        Ok(Self { paths, labels, index, lemmas, model })
    }

    pub fn num_docs(&self) -> u32 {
        self.index.num_docs()
    }

    pub fn model(&self) -> &VectorModel {
        &self.model
    }

    pub fn label(&self, doc_id: DocId) -> Option<&str> {
        self.labels.get(&doc_id).map(String::as_str)
    }

    pub fn contains(&self, doc_id: DocId) -> bool {
        doc_id >= 1 && doc_id <= self.num_docs()
    }

    /// Extracted text of a document, read from the data directory.
    pub fn text(&self, doc_id: DocId) -> Result<String> {
        persist::load_text(&self.paths, doc_id)
    }

    /// Documents matching a boolean expression, in id order.
    pub fn boolean(&self, expr: &str) -> Result<Vec<Hit>, QueryError> {
        let docs = query::search(&self.index, expr)?;
        Ok(docs.into_iter().map(|doc_id| self.hit(doc_id, None)).collect())
    }

    /// Free-text query: words are mapped to lemmas and ranked by cosine similarity.
    pub fn ranked(&self, text: &str, k: usize) -> Result<Vec<Hit>, RankError> {
        let terms = self.lemmas.normalize_query(&query_terms(text));
        let ranked = rank::rank(&self.model, &terms, k)?;
        Ok(ranked.into_iter().map(|r| self.hit(r.doc_id, Some(r.score))).collect())
    }

    fn hit(&self, doc_id: DocId, score: Option<f64>) -> Hit {
        Hit { doc_id, score, label: self.label(doc_id).map(str::to_string) }
    }
}
