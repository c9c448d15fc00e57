use crate::vector::TermCounts;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[a-z-]+").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","ain","all","am","an","and","any","are","aren","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","couldn",
            "d","did","didn","do","does","doesn","doing","don","down","during",
            "each","few","for","from","further",
            "had","hadn","has","hasn","have","haven","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","isn","it","its","itself",
            "just","ll","m","ma","me","mightn","more","most","mustn","my","myself",
            "needn","no","nor","not","now","o","of","off","on","once","only","or","other","our","ours","ourselves","out","over","own",
            "re","s","same","shan","she","should","shouldn","so","some","such",
            "t","than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","ve","very",
            "was","wasn","we","were","weren","what","when","where","which","while","who","whom","why","will","with","won","wouldn",
            "y","you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Splits text into lowercase tokens of letters and hyphens, at least two characters long.
/// Digits, punctuation and non-ASCII letters act as separators.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized)
        .map(|m| m.as_str())
        .filter(|t| t.len() > 1)
        .map(str::to_string)
        .collect()
}

/// Ranking query words: lowercased and split on whitespace. Mapping them onto
/// vocabulary terms is up to the lemma dictionary.
pub fn query_terms(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

/// Reference vocabulary that tokens must belong to.
#[derive(Debug, Default, Clone)]
pub struct WordList {
    words: HashSet<String>,
}

impl WordList {
    /// One word per line; surrounding whitespace ignored, entries lowercased.
    pub fn parse(text: &str) -> Self {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for WordList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self { words: iter.into_iter().map(|w| w.as_ref().to_lowercase()).collect() }
    }
}

/// Turns extracted document text into index terms and term counts.
#[derive(Debug, Clone)]
pub struct Normalizer {
    words: WordList,
}

impl Normalizer {
    pub fn new(words: WordList) -> Self {
        Self { words }
    }

    /// Tokens present in the word list, in text order, stop words included.
    pub fn terms(&self, text: &str) -> Vec<String> {
        tokenize(text).into_iter().filter(|t| self.words.contains(t)).collect()
    }

    /// Distinct terms without stop words; the boolean index input.
    pub fn term_set(&self, text: &str) -> HashSet<String> {
        self.terms(text).into_iter().filter(|t| !is_stopword(t)).collect()
    }

    /// Occurrence counts of every word-list token. Stop words count towards the
    /// document total even though they never become weighted terms.
    pub fn term_counts(&self, text: &str) -> TermCounts {
        TermCounts::from_terms(self.terms(text))
    }
}
