//! JSON HTTP surface for the web layer.
//!
//! Hosts the consumer-facing operations — document listing/upload/removal,
//! training start and status polling, index info, and similarity search —
//! behind a small JSON API. The training supervisor lives in this process,
//! so `GET /train/status` observes the live run.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/files` | List stored documents with page/size metadata |
//! | `POST`   | `/files` | Upload documents (base64 content) |
//! | `GET`    | `/files/{filename}` | Serve the stored PDF bytes |
//! | `DELETE` | `/files/{filename}` | Remove a document and its vectors |
//! | `POST`   | `/train` | Start a training run (returns immediately) |
//! | `GET`    | `/train/status` | Poll training state |
//! | `GET`    | `/info` | Index overview incl. the in-sync flag |
//! | `POST`   | `/search` | Top-k scored chunks for a query |
//! | `GET`    | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "conflict", "message": "a document named 'a.pdf' already exists" } }
//! ```
//!
//! Codes: `invalid_input` (400), `embeddings_disabled` (400), `not_found`
//! (404), `conflict` (409), `already_running` (409), `adapter_failure`
//! (502), `persistence` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser-based
//! clients can call the API directly.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::db;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::error::Error;
use crate::extract::PdfExtractor;
use crate::index::VectorIndex;
use crate::migrate;
use crate::models::{IndexInfo, ScoredChunk, StoredDocument, TrainingStatus};
use crate::search::search_chunks;
use crate::store::DocumentStore;
use crate::train::TrainingSupervisor;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: DocumentStore,
    index: VectorIndex,
    supervisor: TrainingSupervisor,
    provider: Arc<dyn EmbeddingProvider>,
}

/// Start the HTTP server. Binds to `[server].bind` and runs until the
/// process is terminated. Migrations run first, so a fresh install can
/// start serving without a separate `pb init`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(&config.storage.db_path).await?;
    migrate::run_migrations(&pool).await?;

    let extractor = Arc::new(PdfExtractor);
    let provider = create_provider(&config.embedding)?;
    let store = DocumentStore::new(pool.clone(), config.storage.uploads_dir.clone(), extractor.clone())?;
    let index = VectorIndex::new(pool);
    let supervisor = TrainingSupervisor::new(
        store.clone(),
        index.clone(),
        extractor,
        provider.clone(),
        config.chunking.clone(),
        config.embedding.batch_size,
    );

    let bind_addr = config.server.bind.clone();
    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        index,
        supervisor,
        provider,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/files", get(handle_list_files).post(handle_upload_files))
        .route(
            "/files/{filename}",
            get(handle_view_file).delete(handle_delete_file),
        )
        .route("/train", post(handle_start_training))
        .route("/train/status", get(handle_training_status))
        .route("/info", get(handle_info))
        .route("/search", post(handle_search))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("paperbase listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        let (status, code) = match &e {
            Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            Error::AlreadyRunning => (StatusCode::CONFLICT, "already_running"),
            Error::Adapter(_) => (StatusCode::BAD_GATEWAY, "adapter_failure"),
            Error::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence"),
        };
        AppError {
            status,
            code: code.to_string(),
            message: e.to_string(),
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "invalid_input".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /files ============

async fn handle_list_files(
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredDocument>>, AppError> {
    let docs = state.store.list().await?;
    Ok(Json(docs))
}

// ============ POST /files ============

#[derive(Deserialize)]
struct UploadRequest {
    files: Vec<UploadFile>,
}

#[derive(Deserialize)]
struct UploadFile {
    filename: String,
    /// PDF bytes, standard base64.
    content_base64: String,
}

async fn handle_upload_files(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<Vec<StoredDocument>>, AppError> {
    if req.files.is_empty() {
        return Err(bad_request("no files in request"));
    }

    let mut uploaded = Vec::with_capacity(req.files.len());
    for file in &req.files {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&file.content_base64)
            .map_err(|e| bad_request(format!("{}: invalid base64: {}", file.filename, e)))?;
        let doc = state.store.add(&file.filename, &bytes).await?;
        uploaded.push(doc);
    }

    Ok(Json(uploaded))
}

// ============ GET /files/{filename} ============

async fn handle_view_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let bytes = state.store.read(&filename).await?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes).into_response())
}

// ============ DELETE /files/{filename} ============

async fn handle_delete_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.remove(&filename, &state.index).await?;
    Ok(Json(serde_json::json!({
        "message": format!("Deleted {}", filename)
    })))
}

// ============ POST /train ============

async fn handle_start_training(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.config.embedding.is_enabled() {
        let mut e = bad_request("embedding provider is disabled; set [embedding] provider in config");
        e.code = "embeddings_disabled".to_string();
        return Err(e);
    }

    state.supervisor.start().await?;
    Ok(Json(serde_json::json!({ "message": "Training started" })))
}

// ============ GET /train/status ============

async fn handle_training_status(State(state): State<AppState>) -> Json<TrainingStatus> {
    Json(state.supervisor.status())
}

// ============ GET /info ============

async fn handle_info(State(state): State<AppState>) -> Result<Json<IndexInfo>, AppError> {
    let document_count = state.store.count().await?;
    let configured_model = state.config.embedding.model.as_deref().unwrap_or("disabled");
    let info = state.index.info(document_count, configured_model).await?;
    Ok(Json(info))
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<ScoredChunk>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let top_k = req.top_k.unwrap_or(state.config.retrieval.top_k);
    let results = search_chunks(&state.index, state.provider.as_ref(), &req.query, top_k).await?;
    Ok(Json(SearchResponse { results }))
}
