use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use engine::build::{build, SourceDocument};
use engine::persist::IndexPaths;
use engine::tokenizer::{Normalizer, WordList};
use engine::LemmaDictionary;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_index(dir: &std::path::Path) {
    let docs = vec![
        SourceDocument { label: "https://rust.example/1".into(), text: "Rust is great. Rust systems programming.".into() },
        SourceDocument { label: "https://rust.example/2".into(), text: "Learning rust with crabs.".into() },
        SourceDocument { label: "https://rust.example/3".into(), text: "Crabs walk sideways.".into() },
    ];
    let words: WordList = ["rust", "great", "systems", "programming", "learning", "crab", "crabs", "walk", "sideways"]
        .into_iter()
        .collect();
    let lemmas = LemmaDictionary::parse("crab: crab crabs\nlearn: learning\n").unwrap();
    let artifacts = build(docs, &Normalizer::new(words), Some(lemmas));
    artifacts.save(&IndexPaths::new(dir), "2024-01-01T00:00:00Z".into()).unwrap();
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

fn app_for(dir: &std::path::Path) -> Router {
    server::build_app(dir).unwrap()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (status, body) = call(app_for(dir.path()), "/search?q=crabs&k=5").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 3);
    // Only "crab" and "learn" are lemmas, and document 3 has nothing but "crab".
    assert_eq!(arr[0]["doc_id"].as_u64().unwrap(), 3);
    assert_eq!(arr[1]["doc_id"].as_u64().unwrap(), 2);
    assert_eq!(arr[2]["doc_id"].as_u64().unwrap(), 1);
    assert!((arr[0]["score"].as_f64().unwrap() - 1.0).abs() < 1e-12);
    assert!(arr[0]["score"].as_f64().unwrap() > arr[1]["score"].as_f64().unwrap());
    assert_eq!(arr[2]["score"].as_f64().unwrap(), 0.0);
    assert_eq!(arr[0]["label"], "https://rust.example/3");
    assert!(json.get("message").is_none());
}

#[tokio::test]
async fn search_clamps_k() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (status, body) = call(app_for(dir.path()), "/search?q=crabs&k=0").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn degenerate_search_is_empty_with_message() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (status, body) = call(app_for(dir.path()), "/search?q=zebra").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["results"].as_array().unwrap().is_empty());
    assert_eq!(json["total_hits"], 0);
    assert!(json["message"].is_string());
}

#[tokio::test]
async fn boolean_query_and_syntax_error() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let app = app_for(dir.path());

    let (status, body) = call(app.clone(), "/boolean?q=rust%20AND%20NOT%20crab").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let ids: Vec<u64> = json["results"].as_array().unwrap().iter().map(|h| h["doc_id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1]);
    assert!(json["results"][0].get("score").is_none());

    let (status, body) = call(app, "/boolean?q=rust%20AND").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().starts_with("invalid query"));
}

#[tokio::test]
async fn doc_lookup() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let app = app_for(dir.path());

    let (status, body) = call(app.clone(), "/doc/2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["label"], "https://rust.example/2");
    assert_eq!(json["text"], "Learning rust with crabs.");

    let (status, _) = call(app.clone(), "/doc/9").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[test]
fn incomplete_data_dir_fails_startup() {
    let dir = tempdir().unwrap();
    assert!(server::build_app(dir.path()).is_err());
}
