use crate::{DocId, IndexRecord, InvertedIndex, LemmaDictionary, TermWeight, VectorModel, WEIGHT_PRECISION};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, create_dir_all, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
}

#[derive(Serialize, Deserialize)]
struct MatrixFile {
    vocabulary: Vec<String>,
    idf: Vec<f64>,
    rows: Vec<Vec<f64>>,
}

/// Layout of a data directory produced by the indexer.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn labels(&self) -> PathBuf { self.root.join("index.txt") }
    pub fn texts_dir(&self) -> PathBuf { self.root.join("texts") }
    pub fn tokens(&self) -> PathBuf { self.root.join("tokens.txt") }
    pub fn lemmas(&self) -> PathBuf { self.root.join("lemmas.txt") }
    pub fn inverted_index(&self) -> PathBuf { self.root.join("inverted_index.json") }
    pub fn termin_weights_dir(&self) -> PathBuf { self.root.join("termins") }
    pub fn lemma_weights_dir(&self) -> PathBuf { self.root.join("lemmas") }
    pub fn matrix(&self) -> PathBuf { self.root.join("vector_matrix.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn text(&self, doc_id: DocId) -> PathBuf { self.texts_dir().join(format!("{doc_id}.txt")) }
}

fn read_artifact(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("missing artifact {}", path.display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf).with_context(|| format!("reading {}", path.display()))?;
    Ok(buf)
}

fn write_artifact(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    f.write_all(contents)?;
    Ok(())
}

/// `<n>.<ext>` files directly inside `dir`, in numeric order. Other files are ignored.
pub fn numbered_files(dir: &Path, ext: &str) -> Result<Vec<(u64, PathBuf)>> {
    if !dir.is_dir() {
        bail!("directory {} does not exist", dir.display());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        let p = entry.path();
        if !p.is_file() || p.extension().and_then(|s| s.to_str()) != Some(ext) {
            continue;
        }
        if let Some(n) = p.file_stem().and_then(|s| s.to_str()).and_then(|s| s.parse::<u64>().ok()) {
            files.push((n, p.to_path_buf()));
        }
    }
    files.sort_by_key(|(n, _)| *n);
    Ok(files)
}

/// Parses `<id>. <label>` lines.
pub fn parse_labels(text: &str) -> Result<BTreeMap<DocId, String>> {
    let mut labels = BTreeMap::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parsed = line
            .split_once(". ")
            .and_then(|(id, label)| id.trim().parse::<DocId>().ok().map(|id| (id, label.trim())));
        let Some((id, label)) = parsed else {
            bail!("line {}: expected `<id>. <label>`, got {line:?}", lineno + 1);
        };
        labels.insert(id, label.to_string());
    }
    Ok(labels)
}

pub fn save_labels(paths: &IndexPaths, labels: &BTreeMap<DocId, String>) -> Result<()> {
    let mut out = String::new();
    for (id, label) in labels {
        out.push_str(&format!("{id}. {label}\n"));
    }
    write_artifact(&paths.labels(), out.as_bytes())
}

pub fn load_labels(paths: &IndexPaths) -> Result<BTreeMap<DocId, String>> {
    let path = paths.labels();
    parse_labels(&read_artifact(&path)?).with_context(|| format!("parsing {}", path.display()))
}

pub fn save_text(paths: &IndexPaths, doc_id: DocId, text: &str) -> Result<()> {
    write_artifact(&paths.text(doc_id), text.as_bytes())
}

pub fn load_text(paths: &IndexPaths, doc_id: DocId) -> Result<String> {
    read_artifact(&paths.text(doc_id))
}

pub fn save_tokens(paths: &IndexPaths, tokens: &[String]) -> Result<()> {
    let mut out = tokens.join("\n");
    out.push('\n');
    write_artifact(&paths.tokens(), out.as_bytes())
}

pub fn load_tokens(paths: &IndexPaths) -> Result<Vec<String>> {
    let text = read_artifact(&paths.tokens())?;
    Ok(text.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
}

pub fn save_lemmas(paths: &IndexPaths, lemmas: &LemmaDictionary) -> Result<()> {
    write_artifact(&paths.lemmas(), lemmas.to_lines().as_bytes())
}

pub fn load_lemmas(paths: &IndexPaths) -> Result<LemmaDictionary> {
    let path = paths.lemmas();
    LemmaDictionary::parse(&read_artifact(&path)?).with_context(|| format!("parsing {}", path.display()))
}

/// JSON array of records, one record per line.
pub fn save_inverted_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    let lines = index
        .to_records()
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let json = format!("[\n{}\n]\n", lines.join(",\n"));
    write_artifact(&paths.inverted_index(), json.as_bytes())
}

pub fn load_inverted_index(paths: &IndexPaths, num_docs: u32) -> Result<InvertedIndex> {
    let path = paths.inverted_index();
    let records: Vec<IndexRecord> =
        serde_json::from_str(&read_artifact(&path)?).with_context(|| format!("parsing {}", path.display()))?;
    InvertedIndex::from_records(records, num_docs).with_context(|| format!("loading {}", path.display()))
}

pub fn format_weight(w: &TermWeight) -> String {
    if w.idf == 0.0 {
        format!("{} 0.0 0.0", w.term)
    } else {
        format!("{} {:.*} {:.*}", w.term, WEIGHT_PRECISION, w.idf, WEIGHT_PRECISION, w.tfidf)
    }
}

pub fn parse_weights(text: &str) -> Result<Vec<TermWeight>> {
    let mut weights = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [] => continue,
            [term, idf, tfidf] => weights.push(TermWeight {
                term: term.to_string(),
                idf: idf.parse().with_context(|| format!("line {}: bad idf {idf:?}", lineno + 1))?,
                tfidf: tfidf.parse().with_context(|| format!("line {}: bad tf-idf {tfidf:?}", lineno + 1))?,
            }),
            _ => bail!("line {}: expected `<term> <idf> <tfidf>`, got {line:?}", lineno + 1),
        }
    }
    Ok(weights)
}

/// Writes `<dir>/<id>.txt` for every document, replacing the previous contents of `dir`.
pub fn save_weights(dir: &Path, weights: &[Vec<TermWeight>]) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("clearing {}", dir.display()))?;
    }
    create_dir_all(dir)?;
    for (pos, doc) in weights.iter().enumerate() {
        let path = dir.join(format!("{}.txt", pos + 1));
        let mut f = BufWriter::new(File::create(&path).with_context(|| format!("creating {}", path.display()))?);
        for w in doc {
            writeln!(f, "{}", format_weight(w))?;
        }
        f.flush()?;
    }
    Ok(())
}

/// Loads `<dir>/1.txt ..= <dir>/<n>.txt`; a gap in the numbering is an error.
pub fn load_weights(dir: &Path) -> Result<Vec<Vec<TermWeight>>> {
    let files = numbered_files(dir, "txt")?;
    let mut weights = Vec::with_capacity(files.len());
    for (pos, (n, path)) in files.iter().enumerate() {
        if *n != pos as u64 + 1 {
            bail!("weight files in {} skip document {}", dir.display(), pos + 1);
        }
        let doc = parse_weights(&read_artifact(path)?).with_context(|| format!("parsing {}", path.display()))?;
        weights.push(doc);
    }
    Ok(weights)
}

pub fn save_matrix(paths: &IndexPaths, model: &VectorModel) -> Result<()> {
    let file = MatrixFile {
        vocabulary: model.vocabulary().to_vec(),
        idf: model.idf_values().to_vec(),
        rows: model.rows().to_vec(),
    };
    let bytes = bincode::serialize(&file)?;
    write_artifact(&paths.matrix(), &bytes)
}

pub fn load_matrix(paths: &IndexPaths) -> Result<VectorModel> {
    let path = paths.matrix();
    let bytes = fs::read(&path).with_context(|| format!("missing artifact {}", path.display()))?;
    let file: MatrixFile = bincode::deserialize(&bytes).with_context(|| format!("decoding {}", path.display()))?;
    VectorModel::from_parts(file.vocabulary, file.idf, file.rows)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    let json = serde_json::to_string_pretty(meta)?;
    write_artifact(&paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let path = paths.meta();
    let meta: MetaFile = serde_json::from_str(&read_artifact(&path)?).with_context(|| format!("parsing {}", path.display()))?;
    if meta.version != FORMAT_VERSION {
        bail!("{} has format version {}, expected {}", path.display(), meta.version, FORMAT_VERSION);
    }
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_lines_use_fixed_precision() {
        let w = TermWeight { term: "apple".into(), idf: 3f64.ln(), tfidf: 0.2 * 3f64.ln() };
        let line = format_weight(&w);
        let fields: Vec<&str> = line.split(' ').collect();
        assert_eq!(fields[0], "apple");
        assert_eq!(fields[1].split('.').nth(1).unwrap().len(), WEIGHT_PRECISION);
        assert!(fields[1].starts_with("1.0986"));
    }

    #[test]
    fn saturated_weight_line() {
        let w = TermWeight { term: "the".into(), idf: 0.0, tfidf: 0.0 };
        assert_eq!(format_weight(&w), "the 0.0 0.0");
        assert_eq!(parse_weights("the 0.0 0.0\n").unwrap(), vec![w]);
    }

    #[test]
    fn malformed_weight_lines_fail() {
        assert!(parse_weights("apple 1.0").is_err());
        assert!(parse_weights("apple x 1.0").is_err());
    }

    #[test]
    fn labels_parse() {
        let labels = parse_labels("1. https://a.example/\n\n2. https://b.example/x. y\n").unwrap();
        assert_eq!(labels[&1], "https://a.example/");
        assert_eq!(labels[&2], "https://b.example/x. y");
        assert!(parse_labels("https://a.example/").is_err());
    }
}
