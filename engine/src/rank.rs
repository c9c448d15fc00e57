use crate::index::DocId;
use crate::vector::{normalize, VectorModel};
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedDoc {
    pub doc_id: DocId,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankError {
    /// No query term carries weight in the vocabulary, so cosine similarity is undefined.
    #[error("no query term matches the vocabulary")]
    NoMatchingTerms,
}

/// Unit-length query vector in the model's term space, or `None` when every
/// weight is zero. `tf` divides by the full query length; `idf` is the corpus value.
pub fn query_vector(model: &VectorModel, terms: &[String]) -> Option<Vec<f64>> {
    if terms.is_empty() {
        return None;
    }
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for term in terms {
        *counts.entry(term.as_str()).or_insert(0) += 1;
    }
    let len = terms.len() as f64;
    let mut vector = vec![0.0; model.dimensions()];
    for (term, count) in counts {
        let Some(slot) = model.slot(term) else { continue };
        vector[slot] = (count as f64 / len) * model.idf_values()[slot];
    }
    normalize(&mut vector).then_some(vector)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Top `k` documents by cosine similarity. Equal scores keep document order.
pub fn rank(model: &VectorModel, terms: &[String], k: usize) -> Result<Vec<RankedDoc>, RankError> {
    let query = query_vector(model, terms).ok_or(RankError::NoMatchingTerms)?;
    let mut scored: Vec<RankedDoc> = model
        .rows()
        .iter()
        .enumerate()
        .map(|(pos, row)| RankedDoc { doc_id: pos as DocId + 1, score: dot(&query, row) })
        .collect();
    // `sort_by` is stable, which keeps ties in document order.
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(k);
    tracing::debug!(terms = terms.len(), returned = scored.len(), "ranked query");
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::TermCounts;

    fn strings(terms: &[&str]) -> Vec<String> {
        terms.iter().map(|s| s.to_string()).collect()
    }

    fn model() -> VectorModel {
        let docs = vec![
            TermCounts::from_terms(["cat", "cat", "mat"]),
            TermCounts::from_terms(["dog", "mat"]),
            TermCounts::from_terms(["cat", "dog", "bird"]),
            TermCounts::from_terms(["fish"]),
        ];
        VectorModel::build(&docs, strings(&["cat", "dog", "mat", "bird", "fish"]))
    }

    #[test]
    fn best_match_comes_first() {
        let m = model();
        let hits = rank(&m, &strings(&["bird"]), 10).unwrap();
        assert_eq!(hits[0].doc_id, 3);
        assert!(hits[0].score > 0.0);
        assert_eq!(hits.len(), 4);
    }

    #[test]
    fn ties_keep_document_order() {
        let m = model();
        let hits = rank(&m, &strings(&["fish"]), 4).unwrap();
        assert_eq!(hits[0].doc_id, 4);
        let rest: Vec<DocId> = hits[1..].iter().map(|h| h.doc_id).collect();
        assert_eq!(rest, vec![1, 2, 3]);
    }

    #[test]
    fn k_limits_results() {
        let m = model();
        assert_eq!(rank(&m, &strings(&["cat"]), 2).unwrap().len(), 2);
        assert!(rank(&m, &strings(&["cat"]), 0).unwrap().is_empty());
    }

    #[test]
    fn unknown_terms_are_reported() {
        let m = model();
        assert_eq!(rank(&m, &strings(&["zebra"]), 5), Err(RankError::NoMatchingTerms));
        assert_eq!(rank(&m, &[], 5), Err(RankError::NoMatchingTerms));
    }

    #[test]
    fn saturated_terms_alone_do_not_match() {
        let docs = vec![TermCounts::from_terms(["the", "cat"]), TermCounts::from_terms(["the"])];
        let m = VectorModel::build(&docs, strings(&["the", "cat"]));
        assert_eq!(rank(&m, &strings(&["the"]), 5), Err(RankError::NoMatchingTerms));
    }

    #[test]
    fn document_row_scores_itself_highest() {
        let m = model();
        for (pos, row) in m.rows().iter().enumerate() {
            let own = dot(row, row);
            assert!((own - 1.0).abs() < 1e-9);
            for other in m.rows() {
                assert!(dot(row, other) <= own + 1e-9, "row {} beaten", pos + 1);
            }
        }
    }

    #[test]
    fn query_vector_is_unit_length() {
        let m = model();
        let v = query_vector(&m, &strings(&["cat", "dog", "dog", "zebra"])).unwrap();
        let n: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((n - 1.0).abs() < 1e-12);
    }
}
