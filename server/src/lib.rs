use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use websim_core::persist::{append_id, load_ids, save_snapshot_with_meta, SnapshotPaths, VectorMap};
use websim_core::{
    cluster_graph, load_or_rebuild, most_similar, path_cost, path_steps, rank_against, shortest_path, ClusterConfig,
    ClusterView, Clusterer, Fetcher, FrequencyVector, PathStep, RankedSite, SimError, SimilarityGraph, Tokenization,
    VectorBuilder,
};
use websim_crawler::{normalize_id, FetcherConfig, HttpFetcher};

type ApiError = (StatusCode, String);

const MAX_CLUSTERS: usize = 100;
const MAX_ITERATIONS: usize = 500;

#[derive(Clone)]
pub struct AppState {
    pub graph: Arc<RwLock<SimilarityGraph>>,
    pub paths: SnapshotPaths,
    pub admin_token: Option<String>,
    /// Whitespace-tokenizing fetcher for single-document additions.
    incremental: Arc<HttpFetcher>,
    /// Held for the whole of an addition so snapshot writes stay ordered.
    writer: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(graph: SimilarityGraph, paths: SnapshotPaths, admin_token: Option<String>) -> Result<Self> {
        let incremental = HttpFetcher::new(FetcherConfig::default())?.with_tokenization(Tokenization::Whitespace);
        Ok(Self {
            graph: Arc::new(RwLock::new(graph)),
            paths,
            admin_token,
            incremental: Arc::new(incremental),
            writer: Arc::new(tokio::sync::Mutex::new(())),
        })
    }
}

/// Load (or rebuild) the snapshot under `data_dir` and build the router.
pub async fn build_app(data_dir: String) -> Result<Router> {
    let paths = SnapshotPaths::new(&data_dir);
    let fetcher = Arc::new(HttpFetcher::new(FetcherConfig::default())?);
    let loaded = load_or_rebuild(&paths, &VectorBuilder::default(), fetcher).await?;
    let graph = SimilarityGraph::from_documents(loaded.documents());
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    Ok(router(AppState::new(graph, paths, admin_token)?))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/sites", get(sites_handler).post(add_site_handler))
        .route("/components", get(components_handler))
        .route("/path", get(path_handler))
        .route("/rank", get(rank_handler))
        .route("/similar", get(similar_handler))
        .route("/clusters", get(clusters_handler))
        .with_state(state)
        .layer(cors_from_env())
        .layer(TraceLayer::new_for_http())
}

/// CORS_ALLOW_ORIGIN is a comma-separated origin list; unset or empty allows any.
fn cors_from_env() -> CorsLayer {
    let origins: Vec<_> = std::env::var("CORS_ALLOW_ORIGIN")
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

#[derive(Serialize)]
pub struct SiteSummary {
    pub id: String,
    pub distinct_words: usize,
    pub total_words: u64,
    pub component: String,
}

pub async fn sites_handler(State(state): State<AppState>) -> Json<Vec<SiteSummary>> {
    let graph = state.graph.read();
    let sites = graph
        .sites()
        .iter()
        .map(|s| SiteSummary {
            id: s.id.clone(),
            distinct_words: s.vector.len(),
            total_words: s.vector.total_count(),
            component: graph.component_of(&s.id).unwrap_or(&s.id).to_string(),
        })
        .collect();
    Json(sites)
}

#[derive(Serialize)]
pub struct ComponentsResponse {
    pub count: usize,
    pub components: Vec<Vec<String>>,
}

pub async fn components_handler(State(state): State<AppState>) -> Json<ComponentsResponse> {
    let graph = state.graph.read();
    Json(ComponentsResponse { count: graph.disjoint_set_count(), components: graph.components() })
}

#[derive(Deserialize)]
pub struct PathParams {
    pub from: String,
    pub to: String,
}

#[derive(Serialize)]
pub struct PathResponse {
    pub from: String,
    pub to: String,
    pub found: bool,
    pub cost: f64,
    pub steps: Vec<PathStep>,
}

pub async fn path_handler(
    State(state): State<AppState>,
    Query(params): Query<PathParams>,
) -> Result<Json<PathResponse>, ApiError> {
    let graph = state.graph.read();
    require_site(&graph, &params.from)?;
    require_site(&graph, &params.to)?;
    let path = shortest_path(&graph, &params.from, &params.to);
    let steps = path_steps(&params.from, &path);
    Ok(Json(PathResponse {
        found: !steps.is_empty() || params.from == params.to,
        cost: path_cost(&path),
        steps,
        from: params.from,
        to: params.to,
    }))
}

#[derive(Deserialize)]
pub struct RankParams {
    pub reference: String,
}

pub async fn rank_handler(
    State(state): State<AppState>,
    Query(params): Query<RankParams>,
) -> Result<Json<Vec<RankedSite>>, ApiError> {
    let graph = state.graph.read();
    require_site(&graph, &params.reference)?;
    Ok(Json(rank_against(&graph, &params.reference)))
}

#[derive(Deserialize)]
pub struct SimilarParams {
    pub reference: String,
    #[serde(default = "default_top")]
    pub k: usize,
    /// When set, only documents in the reference's cluster out of this many.
    pub clusters: Option<usize>,
    pub seed: Option<u64>,
}
fn default_top() -> usize { 5 }

pub async fn similar_handler(
    State(state): State<AppState>,
    Query(params): Query<SimilarParams>,
) -> Result<Json<Vec<RankedSite>>, ApiError> {
    let graph = state.graph.read();
    require_site(&graph, &params.reference)?;
    let top = params.k.clamp(1, 100);
    let ranked = match params.clusters {
        Some(k) => {
            let clusterer = Clusterer::new(ClusterConfig { k, seed: params.seed, ..ClusterConfig::default() });
            cluster_graph(&graph, &clusterer).map_err(bad_request)?.most_similar(&params.reference, top)
        }
        None => most_similar(&graph, &params.reference, top),
    };
    Ok(Json(ranked))
}

#[derive(Serialize)]
pub struct ClustersResponse {
    pub k: usize,
    pub max_iterations: usize,
    pub iterations: usize,
    pub converged: bool,
    pub clusters: Vec<ClusterView>,
}

pub async fn clusters_handler(
    State(state): State<AppState>,
    Query(config): Query<ClusterConfig>,
) -> Result<Json<ClustersResponse>, ApiError> {
    // clustering runs under the read lock, so request-controlled work is bounded
    let k = config.k.min(MAX_CLUSTERS);
    let max_iterations = config.max_iterations.min(MAX_ITERATIONS);
    let clusterer = Clusterer::new(ClusterConfig { k, max_iterations, seed: config.seed });
    let graph = state.graph.read();
    let clustering = cluster_graph(&graph, &clusterer).map_err(bad_request)?;
    Ok(Json(ClustersResponse {
        k,
        max_iterations,
        iterations: clustering.run.iterations,
        converged: clustering.run.converged,
        clusters: clustering.views(5),
    }))
}

#[derive(Deserialize)]
pub struct AddSiteRequest {
    pub url: String,
}

#[derive(Serialize)]
pub struct AddSiteResponse {
    pub id: String,
    pub sites: usize,
    pub components: usize,
}

pub async fn add_site_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddSiteRequest>,
) -> Result<(StatusCode, Json<AddSiteResponse>), ApiError> {
    authorize(&state, &headers)?;
    let id = normalize_id(&req.url).ok_or_else(|| (StatusCode::BAD_REQUEST, format!("not a usable url: {}", req.url)))?;

    let _writer = state.writer.lock().await;
    if state.graph.read().contains(&id) {
        return Err((StatusCode::CONFLICT, format!("{id} is already present")));
    }

    // no graph lock is held while the page is fetched
    let words = state.incremental.fetch(&id).await.map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;
    let vector = FrequencyVector::from_words(words);

    let (snapshot, sites, components) = {
        let mut graph = state.graph.write();
        graph.insert_document(id.clone(), vector);
        let snapshot: VectorMap = graph.vectors().map(|(id, v)| (id.to_string(), v.clone())).collect();
        (snapshot, graph.len(), graph.disjoint_set_count())
    };
    tracing::info!(%id, sites, components, "site added");

    persist_addition(&state.paths, &id, &snapshot).map_err(internal)?;
    Ok((StatusCode::CREATED, Json(AddSiteResponse { id, sites, components })))
}

fn persist_addition(paths: &SnapshotPaths, id: &str, snapshot: &VectorMap) -> websim_core::Result<()> {
    if !load_ids(paths)?.iter().any(|known| known == id) {
        append_id(paths, id)?;
    }
    save_snapshot_with_meta(paths, snapshot)
}

fn require_site(graph: &SimilarityGraph, id: &str) -> Result<(), ApiError> {
    if graph.contains(id) {
        Ok(())
    } else {
        Err((StatusCode::NOT_FOUND, format!("unknown site {id}")))
    }
}

fn bad_request(err: SimError) -> ApiError {
    (StatusCode::BAD_REQUEST, err.to_string())
}

fn internal(err: SimError) -> ApiError {
    tracing::error!(error = %err, "snapshot write failed");
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
