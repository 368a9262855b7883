use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;
use websim_core::persist::SnapshotPaths;
use websim_core::{FrequencyVector, SimilarityGraph};
use websim_server::{router, AppState};

const A: &str = "https://a.test/";
const B: &str = "https://b.test/";
const C: &str = "https://c.test/";
const D: &str = "https://d.test/";

fn doc(words: &[&str]) -> FrequencyVector {
    FrequencyVector::from_words(words.iter().copied())
}

fn app() -> (Router, TempDir) {
    let dir = tempdir().unwrap();
    let graph = SimilarityGraph::from_documents([
        (A, doc(&["rust", "cargo"])),
        (B, doc(&["rust", "borrow"])),
        (C, doc(&["piano"])),
        (D, doc(&["rust", "cargo"])),
    ]);
    let state = AppState::new(graph, SnapshotPaths::new(dir.path()), Some("secret".into())).unwrap();
    (router(state), dir)
}

fn enc(id: &str) -> String {
    id.replace(':', "%3A").replace('/', "%2F")
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Bytes) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn get_json(app: Router, uri: &str) -> Value {
    let (status, body) = get(app, uri).await;
    assert_eq!(status, StatusCode::OK, "{uri}: {}", String::from_utf8_lossy(&body));
    serde_json::from_slice(&body).unwrap()
}

fn add_site(token: Option<&str>, url: &str) -> Request<Body> {
    let mut req = Request::post("/sites").header("content-type", "application/json");
    if let Some(t) = token {
        req = req.header("X-ADMIN-TOKEN", t);
    }
    req.body(Body::from(serde_json::json!({ "url": url }).to_string())).unwrap()
}

#[tokio::test]
async fn health_and_site_listing() {
    let (app, _dir) = app();
    let (status, body) = get(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");

    let sites = get_json(app, "/sites").await;
    let sites = sites.as_array().unwrap();
    assert_eq!(sites.len(), 4);
    assert_eq!(sites[0]["id"], A);
    assert_eq!(sites[0]["distinct_words"], 2);
}

#[tokio::test]
async fn fully_linked_graph_is_one_component() {
    let (app, _dir) = app();
    let json = get_json(app, "/components").await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["components"][0].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn path_detours_through_dissimilar_sites() {
    let (app, _dir) = app();
    let json = get_json(app.clone(), &format!("/path?from={}&to={}", enc(A), enc(D))).await;
    assert_eq!(json["found"], true);
    assert_eq!(json["cost"], 0.0);
    let steps = json["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0]["from"], A);
    assert_eq!(steps[1]["to"], D);

    let (status, _) = get(app, &format!("/path?from={}&to=nowhere", enc(A))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rank_and_similar() {
    let (app, _dir) = app();
    let ranked = get_json(app.clone(), &format!("/rank?reference={}", enc(A))).await;
    let ranked = ranked.as_array().unwrap();
    assert_eq!(ranked.len(), 4);
    assert_eq!(ranked[0]["id"], A);
    assert_eq!(ranked[1]["id"], D);
    assert_eq!(ranked[3]["id"], C);

    let similar = get_json(app.clone(), &format!("/similar?reference={}&k=1", enc(A))).await;
    assert_eq!(similar.as_array().unwrap().len(), 1);
    assert_eq!(similar[0]["id"], D);

    let (status, _) = get(app, "/similar?reference=missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn clusters_cover_every_site() {
    let (app, _dir) = app();
    let json = get_json(app.clone(), "/clusters?k=2&seed=7").await;
    let total: usize = json["clusters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["members"].as_array().unwrap().len())
        .sum();
    assert_eq!(total, 4);

    let (status, _) = get(app, "/clusters?k=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cluster_request_sizes_are_clamped() {
    let (app, _dir) = app();
    let json = get_json(app, "/clusters?k=100000&max_iterations=100000000&seed=3").await;
    assert_eq!(json["k"], 100);
    assert_eq!(json["max_iterations"], 500);
    assert!(json["iterations"].as_u64().unwrap() <= 500);
}

#[tokio::test]
async fn adding_sites_requires_the_admin_token() {
    let (app, _dir) = app();
    let (status, _) = send(app.clone(), add_site(None, "https://new.test/")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(app.clone(), add_site(Some("wrong"), "https://new.test/")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(app.clone(), add_site(Some("secret"), A)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(app.clone(), add_site(Some("secret"), "ftp://files.test/x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let sites = get_json(app, "/sites").await;
    assert_eq!(sites.as_array().unwrap().len(), 4);
}
