//! Lemma dictionary: canonical lemma -> surface forms seen in the collection.
//!
//! The dictionary is produced by an external lemmatizer and stored as
//! `lemma: form form ...` lines. Entry order is significant; it fixes the
//! column order of the vector model and breaks ties when a surface form
//! belongs to several lemmas.

use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LemmaDictionary {
    entries: Vec<(String, Vec<String>)>,
    by_lemma: HashMap<String, usize>,
    by_form: HashMap<String, Vec<usize>>,
}

impl LemmaDictionary {
    /// Builds a dictionary from `(lemma, forms)` pairs. Repeated lemmas merge
    /// their forms into the first entry.
    pub fn new<I, F>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, F)>,
        F: IntoIterator<Item = String>,
    {
        let mut dict = Self::default();
        for (lemma, forms) in entries {
            let slot = match dict.by_lemma.get(&lemma) {
                Some(&slot) => slot,
                None => {
                    dict.entries.push((lemma.clone(), Vec::new()));
                    dict.by_lemma.insert(lemma, dict.entries.len() - 1);
                    dict.entries.len() - 1
                }
            };
            for form in forms {
                if dict.entries[slot].1.contains(&form) {
                    continue;
                }
                let owners = dict.by_form.entry(form.clone()).or_default();
                if !owners.contains(&slot) {
                    owners.push(slot);
                }
                dict.entries[slot].1.push(form);
            }
        }
        dict
    }

    /// Every token is its own lemma. Used when no lemmatizer output is supplied.
    pub fn identity<I: IntoIterator<Item = String>>(tokens: I) -> Self {
        let mut tokens: Vec<String> = tokens.into_iter().collect();
        tokens.sort();
        tokens.dedup();
        Self::new(tokens.into_iter().map(|t| (t.clone(), vec![t])))
    }

    /// Keeps only the forms found in `tokens`; lemmas left without forms are dropped.
    pub fn restricted(&self, tokens: &HashSet<String>) -> Self {
        Self::new(self.entries.iter().filter_map(|(lemma, forms)| {
            let kept: Vec<String> = forms.iter().filter(|f| tokens.contains(*f)).cloned().collect();
            (!kept.is_empty()).then(|| (lemma.clone(), kept))
        }))
    }

    /// Parses `lemma: form form ...` lines. Blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((lemma, forms)) = line.split_once(':') else {
                bail!("line {}: expected `lemma: forms`, got {line:?}", lineno + 1);
            };
            let lemma = lemma.trim();
            if lemma.is_empty() {
                bail!("line {}: empty lemma", lineno + 1);
            }
            let forms: Vec<String> = forms.split_whitespace().map(str::to_string).collect();
            entries.push((lemma.to_string(), forms));
        }
        Ok(Self::new(entries))
    }

    pub fn to_lines(&self) -> String {
        let mut out = String::new();
        for (lemma, forms) in &self.entries {
            out.push_str(lemma);
            out.push_str(": ");
            out.push_str(&forms.join(" "));
            out.push('\n');
        }
        out
    }

    /// Lemmas in dictionary order; the vector model vocabulary.
    pub fn lemmas(&self) -> Vec<String> {
        self.entries.iter().map(|(l, _)| l.clone()).collect()
    }

    pub fn forms(&self, lemma: &str) -> Option<&[String]> {
        self.by_lemma.get(lemma).map(|&slot| self.entries[slot].1.as_slice())
    }

    pub fn contains_lemma(&self, lemma: &str) -> bool {
        self.by_lemma.contains_key(lemma)
    }

    /// First lemma (in dictionary order) that lists `form`.
    pub fn lemma_of(&self, form: &str) -> Option<&str> {
        let owners = self.by_form.get(form)?;
        let first = owners.iter().min()?;
        Some(self.entries[*first].0.as_str())
    }

    /// Adds the lemma of every term to the set, so a document can be found by
    /// either its surface forms or their lemmas.
    pub fn expand(&self, terms: &HashSet<String>) -> HashSet<String> {
        let mut out = terms.clone();
        for term in terms {
            if let Some(owners) = self.by_form.get(term) {
                out.extend(owners.iter().map(|&slot| self.entries[slot].0.clone()));
            }
        }
        out
    }

    /// Maps query tokens onto lemmas. A token that is a lemma is kept as is,
    /// otherwise the first lemma listing it is used; unknown tokens are dropped.
    pub fn normalize_query(&self, tokens: &[String]) -> Vec<String> {
        tokens
            .iter()
            .filter_map(|t| {
                if self.contains_lemma(t) {
                    Some(t.clone())
                } else {
                    self.lemma_of(t).map(str::to_string)
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(l, f)| (l.as_str(), f.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LemmaDictionary {
        LemmaDictionary::parse("run: running runs run\ncat: cats cat\nrunning: running\n").unwrap()
    }

    #[test]
    fn parse_and_lookup() {
        let d = sample();
        assert_eq!(d.lemmas(), vec!["run", "cat", "running"]);
        assert_eq!(d.forms("cat").unwrap(), ["cats".to_string(), "cat".to_string()]);
        assert_eq!(d.lemma_of("runs"), Some("run"));
        assert_eq!(d.lemma_of("running"), Some("run"));
        assert_eq!(d.lemma_of("dog"), None);
    }

    #[test]
    fn lines_roundtrip_keeps_order() {
        let d = sample();
        assert_eq!(LemmaDictionary::parse(&d.to_lines()).unwrap(), d);
    }

    #[test]
    fn rejects_lines_without_separator() {
        assert!(LemmaDictionary::parse("run running").is_err());
        assert!(LemmaDictionary::parse(": running").is_err());
    }

    #[test]
    fn query_prefers_exact_lemma() {
        let d = sample();
        let q: Vec<String> = ["running", "cats", "zebra"].iter().map(|s| s.to_string()).collect();
        assert_eq!(d.normalize_query(&q), vec!["running", "cat"]);
    }

    #[test]
    fn expand_adds_lemmas() {
        let d = sample();
        let terms: HashSet<String> = ["cats".to_string()].into_iter().collect();
        let expanded = d.expand(&terms);
        assert!(expanded.contains("cats"));
        assert!(expanded.contains("cat"));
    }

    #[test]
    fn restricted_drops_unseen_forms() {
        let d = sample();
        let seen: HashSet<String> = ["cats".to_string(), "runs".to_string()].into_iter().collect();
        let r = d.restricted(&seen);
        assert_eq!(r.lemmas(), vec!["run", "cat"]);
        assert_eq!(r.forms("run").unwrap(), ["runs".to_string()]);
        assert_eq!(r.lemma_of("running"), None);
    }

    #[test]
    fn identity_is_sorted_and_deduplicated() {
        let d = LemmaDictionary::identity(vec!["b".to_string(), "a".to_string(), "b".to_string()]);
        assert_eq!(d.lemmas(), vec!["a", "b"]);
        assert_eq!(d.lemma_of("b"), Some("b"));
    }
}
