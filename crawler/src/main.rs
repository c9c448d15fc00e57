use anyhow::{bail, Context, Result};
use clap::Parser;
use reqwest::{header, Client};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

const MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Download a list of pages into a numbered crawl directory")]
struct Cli {
    /// File with one URL per line; blank lines and `#` comments are skipped
    #[arg(long)]
    urls: String,
    /// Crawl directory (receives downloads/<n>.txt and index.txt)
    #[arg(long, default_value = "./crawl")]
    output: String,
    /// Maximum number of requests in flight
    #[arg(long, default_value_t = 16)]
    concurrency: usize,
    /// Request timeout seconds
    #[arg(long, default_value_t = 12)]
    timeout_secs: u64,
    #[arg(long, default_value = "search-engine-rs-bot/0.1 (+https://example.com/bot)")]
    user_agent: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let list = fs::read_to_string(&args.urls).with_context(|| format!("reading {}", args.urls))?;
    let urls = parse_url_list(&list);
    if urls.is_empty() {
        bail!("no valid urls in {}", args.urls);
    }
    tracing::info!(urls = urls.len(), concurrency = args.concurrency, output = %args.output, "crawl starting");

    let client = Client::builder()
        .user_agent(args.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;

    let pages = fetch_all(&client, urls, args.concurrency.max(1)).await;
    let written = write_crawl(Path::new(&args.output), &pages)?;
    tracing::info!(written, output = %args.output, "crawl complete");
    Ok(())
}

fn parse_url_list(text: &str) -> Vec<Url> {
    let mut urls = Vec::new();
    for line in text.lines() {
        let s = line.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        match Url::parse(s).or_else(|_| Url::parse(&format!("https://{s}"))) {
            Ok(u) if u.scheme().starts_with("http") => urls.push(u),
            _ => tracing::warn!(line = s, "skipping invalid url"),
        }
    }
    urls
}

/// Fetches every url with at most `concurrency` requests in flight. The result
/// keeps the input order and drops failed fetches.
async fn fetch_all(client: &Client, urls: Vec<Url>, concurrency: usize) -> Vec<(Url, String)> {
    let permits = Arc::new(Semaphore::new(concurrency));
    let mut handles = Vec::with_capacity(urls.len());
    for url in urls {
        let client = client.clone();
        let permits = permits.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.ok()?;
            match fetch_page(&client, &url).await {
                Ok(body) => Some((url, body)),
                Err(err) => {
                    tracing::warn!(%url, error = %format!("{err:#}"), "fetch failed");
                    None
                }
            }
        }));
    }

    let mut pages = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Some(page)) => pages.push(page),
            Ok(None) => {}
            Err(err) => tracing::error!(error = %err, "fetch task panicked"),
        }
    }
    pages
}

async fn fetch_page(client: &Client, url: &Url) -> Result<String> {
    let resp = client.get(url.clone()).send().await?;
    if !resp.status().is_success() {
        bail!("status {}", resp.status());
    }
    if let Some(ct) = resp.headers().get(header::CONTENT_TYPE) {
        let ct = ct.to_str().unwrap_or_default();
        if !ct.starts_with("text/html") {
            bail!("content type {ct}");
        }
    }
    let bytes = resp.bytes().await?;
    if bytes.len() > MAX_PAGE_BYTES {
        bail!("page too large ({} bytes)", bytes.len());
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Writes pages as `downloads/1.txt..N.txt` plus the `N. url` label index.
fn write_crawl(dir: &Path, pages: &[(Url, String)]) -> Result<usize> {
    let downloads = dir.join("downloads");
    fs::create_dir_all(&downloads).with_context(|| format!("creating {}", downloads.display()))?;
    let mut index = String::new();
    for (pos, (url, body)) in pages.iter().enumerate() {
        let n = pos + 1;
        let path = downloads.join(format!("{n}.txt"));
        fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
        index.push_str(&format!("{n}. {url}\n"));
    }
    fs::write(dir.join("index.txt"), index)?;
    Ok(pages.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn url_list_skips_comments_and_junk() {
        let urls = parse_url_list("# seeds\nhttps://a.example/x\n\n  example.org  \nftp://files.example/\n");
        let urls: Vec<String> = urls.iter().map(Url::to_string).collect();
        assert_eq!(urls, vec!["https://a.example/x", "https://example.org/"]);
    }

    #[test]
    fn crawl_is_numbered_densely() {
        let dir = tempdir().unwrap();
        let pages = vec![
            (Url::parse("https://a.example/").unwrap(), "<body>a</body>".to_string()),
            (Url::parse("https://c.example/").unwrap(), "<body>c</body>".to_string()),
        ];
        assert_eq!(write_crawl(dir.path(), &pages).unwrap(), 2);
        assert_eq!(fs::read_to_string(dir.path().join("downloads/2.txt")).unwrap(), "<body>c</body>");
        assert_eq!(
            fs::read_to_string(dir.path().join("index.txt")).unwrap(),
            "1. https://a.example/\n2. https://c.example/\n"
        );
    }
}
