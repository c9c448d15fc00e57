use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use engine::build::{build, SourceDocument};
use engine::html::extract_text;
use engine::persist::{self, numbered_files, parse_labels, IndexPaths};
use engine::tokenizer::{Normalizer, WordList};
use engine::{DocId, LemmaDictionary, RankError, SearchEngine, VectorModel, DEFAULT_TOP_K, MAX_TOP_K};
use tracing_subscriber::{fmt, EnvFilter};

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query boolean and tf-idf search artifacts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every artifact from a crawl directory (downloads/<n>.txt plus index.txt)
    Build {
        /// Crawl directory written by the crawler
        #[arg(long)]
        input: String,
        /// Reference word list, one word per line
        #[arg(long)]
        words: String,
        /// Lemma dictionary (`lemma: form form ...` lines); tokens are their own lemmas without it
        #[arg(long)]
        lemmas: Option<String>,
        /// Output index directory
        #[arg(long)]
        output: String,
    },
    /// Rebuild the vector matrix from the lemma weight files
    Matrix {
        #[arg(long, default_value = "./index")]
        index: String,
    },
    /// Evaluate a boolean query such as "(hello OR world) AND NOT often"
    Boolean {
        #[arg(long, default_value = "./index")]
        index: String,
        query: String,
    },
    /// Rank documents against a free-text query
    Rank {
        #[arg(long, default_value = "./index")]
        index: String,
        /// Number of results (at most 100)
        #[arg(short, long, default_value_t = DEFAULT_TOP_K)]
        k: usize,
        query: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, words, lemmas, output } => build_index(&input, &words, lemmas.as_deref(), &output),
        Commands::Matrix { index } => rebuild_matrix(&index),
        Commands::Boolean { index, query } => run_boolean(&index, &query),
        Commands::Rank { index, k, query } => run_rank(&index, &query, k),
    }
}

fn build_index(input: &str, words: &str, lemmas: Option<&str>, output: &str) -> Result<()> {
    let words = WordList::parse(&fs::read_to_string(words).with_context(|| format!("reading word list {words}"))?);
    if words.is_empty() {
        bail!("word list is empty");
    }
    let lemmas = match lemmas {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading lemma dictionary {path}"))?;
            Some(LemmaDictionary::parse(&text).with_context(|| format!("parsing {path}"))?)
        }
        None => None,
    };

    let docs = read_crawl(Path::new(input))?;
    tracing::info!(num_docs = docs.len(), input, "extracted documents");

    let artifacts = build(docs, &Normalizer::new(words), lemmas);
    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    let out_paths = IndexPaths::new(output);
    let meta = artifacts.save(&out_paths, created_at)?;

    tracing::info!(output, num_docs = meta.num_docs, num_terms = artifacts.index.num_terms(), "index build complete");
    Ok(())
}

/// Reads `downloads/<n>.txt` in numeric order and strips the markup. Labels come
/// from `index.txt` when present, otherwise from the file names.
fn read_crawl(input: &Path) -> Result<Vec<SourceDocument>> {
    let downloads = input.join("downloads");
    let files = numbered_files(&downloads, "txt")?;
    if files.is_empty() {
        bail!("no downloaded pages in {}", downloads.display());
    }

    let labels_path = input.join("index.txt");
    let labels: BTreeMap<DocId, String> = if labels_path.is_file() {
        let text = fs::read_to_string(&labels_path)?;
        parse_labels(&text).with_context(|| format!("parsing {}", labels_path.display()))?
    } else {
        tracing::warn!(path = %labels_path.display(), "no label index, using file names");
        BTreeMap::new()
    };

    let mut docs = Vec::with_capacity(files.len());
    for (n, path) in files {
        let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let html = String::from_utf8_lossy(&bytes);
        let text = extract_text(&html).unwrap_or_else(|| {
            tracing::warn!(path = %path.display(), "page has no body, indexing it as empty");
            String::new()
        });
        let label = DocId::try_from(n)
            .ok()
            .and_then(|id| labels.get(&id).cloned())
            .unwrap_or_else(|| path.display().to_string());
        docs.push(SourceDocument { label, text });
    }
    Ok(docs)
}

fn rebuild_matrix(index: &str) -> Result<()> {
    let paths = IndexPaths::new(index);
    let meta = persist::load_meta(&paths)?;
    let lemmas = persist::load_lemmas(&paths)?;
    let weights = persist::load_weights(&paths.lemma_weights_dir())?;
    if weights.len() != meta.num_docs as usize {
        bail!(
            "{} holds {} weight files but the collection has {} documents",
            paths.lemma_weights_dir().display(),
            weights.len(),
            meta.num_docs
        );
    }
    let model = VectorModel::from_weights(lemmas.lemmas(), &weights);
    persist::save_matrix(&paths, &model)?;
    tracing::info!(num_docs = model.num_docs(), dimensions = model.dimensions(), "matrix rebuilt");
    Ok(())
}

fn run_boolean(index: &str, query: &str) -> Result<()> {
    let engine = SearchEngine::load(index)?;
    let hits = engine.boolean(query).map_err(|err| anyhow::anyhow!("invalid query ({err})"))?;
    if hits.is_empty() {
        println!("No results found.");
    }
    for hit in hits {
        println!("{}\t{}", hit.doc_id, hit.label.unwrap_or_default());
    }
    Ok(())
}

fn run_rank(index: &str, query: &str, k: usize) -> Result<()> {
    let engine = SearchEngine::load(index)?;
    match engine.ranked(query, k.clamp(1, MAX_TOP_K)) {
        Ok(hits) => {
            for hit in hits {
                println!("{:.6}\t{}\t{}", hit.score.unwrap_or_default(), hit.doc_id, hit.label.unwrap_or_default());
            }
        }
        Err(RankError::NoMatchingTerms) => println!("No matching terms."),
    }
    Ok(())
}
