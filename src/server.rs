use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::indexer;
use crate::search::{DocumentType, ResultGroup, SearchDocument, SearchResult, SearchService};

/// Shared handler state. The service itself is not synchronized, so every
/// access goes through the lock: searches read, mutations write.
#[derive(Clone)]
pub struct AppState {
    service: Arc<RwLock<SearchService>>,
    snapshot_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(service: SearchService, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            service: Arc::new(RwLock::new(service)),
            snapshot_path: Arc::new(snapshot_path.into()),
        }
    }

    pub fn service(&self) -> &Arc<RwLock<SearchService>> {
        &self.service
    }
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
    #[serde(default)]
    grouped: bool,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<Vec<SearchResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    groups: Option<Vec<ResultGroup>>,
    total: usize,
    time_ms: u128,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    documents: usize,
}

#[derive(Debug, Serialize)]
struct ReindexResponse {
    documents: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/search", get(search_handler))
        .route("/api/reindex", post(reindex_handler))
        .route("/api/documents", post(add_document_handler))
        .route("/api/documents/:doc_type/:id", delete(remove_document_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!("🔍 Search API available at http://{}/api/search?q=<query>", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let documents = state.service.read().await.document_count();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        documents,
    })
}

async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let service = state.service.read().await;

    let (results, groups, total) = if params.grouped {
        let groups = service.search_grouped(&params.q);
        let total = groups.iter().map(|g| g.results.len()).sum();
        (None, Some(groups), total)
    } else {
        let results = service.search(&params.q);
        let total = results.len();
        (Some(results), None, total)
    };
    drop(service);

    let time_ms = start.elapsed().as_millis();

    tracing::info!(
        "Search query='{}' returned {} results in {}ms",
        params.q,
        total,
        time_ms
    );

    Json(SearchResponse {
        query: params.q,
        results,
        groups,
        total,
        time_ms,
    })
}

async fn reindex_handler(
    State(state): State<AppState>,
) -> Result<Json<ReindexResponse>, StatusCode> {
    // Load outside the lock; the old index keeps serving until the swap
    let snapshot = indexer::load_snapshot(state.snapshot_path.as_path())
        .await
        .map_err(|e| {
            tracing::error!("Reindex failed: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let mut service = state.service.write().await;
    service.initialize_index(snapshot.into_documents());
    let documents = service.document_count();

    tracing::info!("📚 Reindexed {} documents", documents);
    Ok(Json(ReindexResponse { documents }))
}

async fn add_document_handler(
    State(state): State<AppState>,
    Json(document): Json<SearchDocument>,
) -> StatusCode {
    tracing::info!("Adding {} document '{}'", document.doc_type, document.id);
    state.service.write().await.add_document(document);
    StatusCode::CREATED
}

async fn remove_document_handler(
    State(state): State<AppState>,
    Path((doc_type, id)): Path<(String, String)>,
) -> StatusCode {
    let doc_type = DocumentType::from(doc_type);
    tracing::info!("Removing {} document '{}'", doc_type, id);
    state.service.write().await.remove_document(&doc_type, &id);
    StatusCode::NO_CONTENT
}
