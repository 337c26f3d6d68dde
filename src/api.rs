//! HTTP surface for the document pipeline.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /documents/upload` – Decode an uploaded file, extract and chunk its text,
//!   generate embeddings, and persist them. Returns `{doc_id, filename, chunks,
//!   total_characters, status, message}`.
//! - `DELETE /documents/{doc_id}` – Remove a document and every chunk it owns.
//!   Requires an `owner_id` query parameter matching the stored owner.
//! - `GET /documents` – List stored documents, optionally filtered by `owner_id`.
//! - `POST /documents/search` – Semantic search over stored chunks.
//! - `POST /chat` – Generate a chat completion grounded in retrieved document context.
//! - `GET /health` – Liveness probe.
//! - `GET /metrics` – Observe ingestion and search counters.
//!
//! Every handler is generic over the [`DocumentApi`] and [`GeneratorClient`]
//! traits so tests can exercise the full router against stub services.

use crate::chat::{ChatTurn, GeneratorClient, GeneratorError, build_prompt};
use crate::config::get_config;
use crate::pipeline::{DocumentApi, IngestError, SearchError};
use crate::store::payload::current_timestamp_rfc3339;
use crate::store::{ChunkMetadata, DeleteError, DocumentSummary, StoreError};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Shared handler state: the document service plus the chat generator.
pub struct AppState<S, G> {
    service: Arc<S>,
    generator: Arc<G>,
}

impl<S, G> Clone for AppState<S, G> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            generator: Arc::clone(&self.generator),
        }
    }
}

/// Build the HTTP router exposing the document and chat API surface.
pub fn create_router<S, G>(service: Arc<S>, generator: Arc<G>) -> Router
where
    S: DocumentApi + 'static,
    G: GeneratorClient + 'static,
{
    let state = AppState { service, generator };
    Router::new()
        .route("/documents/upload", post(upload_document::<S, G>))
        .route(
            "/documents/:doc_id",
            axum::routing::delete(delete_document::<S, G>),
        )
        .route("/documents", get(list_documents::<S, G>))
        .route("/documents/search", post(search_documents::<S, G>))
        .route("/chat", post(chat::<S, G>))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics::<S, G>))
        .with_state(state)
}

fn default_owner() -> String {
    "anonymous".to_string()
}

/// Request body for `POST /documents/upload`.
#[derive(Deserialize)]
struct UploadRequest {
    /// Declared filename; the extension selects the extraction path.
    filename: String,
    /// Base64-encoded file bytes.
    content: String,
    /// Uploading owner; defaults to `"anonymous"`.
    #[serde(default = "default_owner")]
    owner_id: String,
}

/// Success response for `POST /documents/upload`.
#[derive(Serialize)]
struct UploadResponse {
    doc_id: String,
    filename: String,
    chunks: usize,
    total_characters: usize,
    status: &'static str,
    message: &'static str,
}

/// Decode, extract, chunk, embed, and persist an uploaded document.
async fn upload_document<S, G>(
    State(state): State<AppState<S, G>>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, AppError>
where
    S: DocumentApi,
    G: GeneratorClient,
{
    let bytes = BASE64
        .decode(request.content.as_bytes())
        .map_err(|error| AppError::BadRequest(format!("invalid base64 content: {error}")))?;

    let outcome = state
        .service
        .ingest(bytes, request.filename, request.owner_id)
        .await?;

    Ok(Json(UploadResponse {
        doc_id: outcome.doc_id,
        filename: outcome.filename,
        chunks: outcome.chunk_count,
        total_characters: outcome.total_characters,
        status: "success",
        message: "Document uploaded and processed successfully",
    }))
}

/// Query parameters for `DELETE /documents/{doc_id}`.
#[derive(Deserialize)]
struct DeleteQuery {
    /// Owner asserting the deletion; must match the stored owner.
    owner_id: String,
}

/// Success response for `DELETE /documents/{doc_id}`.
#[derive(Serialize)]
struct DeleteResponse {
    doc_id: String,
    chunks_deleted: usize,
    status: &'static str,
    message: &'static str,
}

/// Delete a document after verifying ownership.
async fn delete_document<S, G>(
    State(state): State<AppState<S, G>>,
    Path(doc_id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<DeleteResponse>, AppError>
where
    S: DocumentApi,
    G: GeneratorClient,
{
    let chunks_deleted = state
        .service
        .delete_document(&doc_id, &query.owner_id)
        .await?;

    Ok(Json(DeleteResponse {
        doc_id,
        chunks_deleted,
        status: "success",
        message: "Document deleted successfully",
    }))
}

/// Query parameters for `GET /documents`.
#[derive(Deserialize)]
struct ListQuery {
    /// Restrict the listing to one owner when present.
    #[serde(default)]
    owner_id: Option<String>,
}

/// Response body for `GET /documents`.
#[derive(Serialize)]
struct ListResponse {
    documents: Vec<DocumentSummary>,
    total: usize,
}

/// List stored documents.
async fn list_documents<S, G>(
    State(state): State<AppState<S, G>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, AppError>
where
    S: DocumentApi,
    G: GeneratorClient,
{
    let documents = state.service.list_documents(query.owner_id.as_deref()).await?;
    let total = documents.len();
    Ok(Json(ListResponse { documents, total }))
}

/// Request body for `POST /documents/search`.
#[derive(Deserialize)]
struct SearchRequest {
    /// Query text to embed and match against stored chunks.
    query: String,
    /// Restrict matches to one owner when present.
    #[serde(default)]
    owner_id: Option<String>,
    /// Number of results to return (defaults to `SEARCH_DEFAULT_LIMIT`).
    #[serde(default)]
    n_results: Option<usize>,
}

/// One search hit in the response.
#[derive(Serialize)]
struct SearchHit {
    content: String,
    metadata: ChunkMetadata,
    distance: f32,
}

/// Response body for `POST /documents/search`.
#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
    total: usize,
}

/// Search stored chunks by semantic similarity.
async fn search_documents<S, G>(
    State(state): State<AppState<S, G>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError>
where
    S: DocumentApi,
    G: GeneratorClient,
{
    let n_results = request
        .n_results
        .unwrap_or_else(|| get_config().search_default_limit);
    let hits = state
        .service
        .search(&request.query, request.owner_id.as_deref(), n_results)
        .await?;

    let results: Vec<SearchHit> = hits
        .into_iter()
        .map(|hit| SearchHit {
            content: hit.content,
            metadata: hit.metadata,
            distance: hit.distance,
        })
        .collect();
    let total = results.len();
    Ok(Json(SearchResponse { results, total }))
}

/// Request body for `POST /chat`.
#[derive(Deserialize)]
struct ChatRequest {
    /// The user's new message.
    message: String,
    /// Owner whose documents ground the response; defaults to `"anonymous"`.
    #[serde(default = "default_owner")]
    owner_id: String,
    /// Opaque client-side session identifier, echoed back unchanged.
    #[serde(default)]
    session_id: Option<String>,
    /// Prior conversation turns supplied by the client.
    #[serde(default)]
    history: Option<Vec<ChatTurn>>,
}

/// Response body for `POST /chat`.
#[derive(Serialize)]
struct ChatResponse {
    response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    timestamp: String,
}

/// Generate a chat completion grounded in the owner's documents.
///
/// Retrieval failures degrade to an uncontexted completion; only generator
/// failures surface as errors.
async fn chat<S, G>(
    State(state): State<AppState<S, G>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError>
where
    S: DocumentApi,
    G: GeneratorClient,
{
    let context = match state
        .service
        .document_context(&request.message, &request.owner_id)
        .await
    {
        Ok(context) => context,
        Err(error) => {
            tracing::warn!(error = %error, "Context retrieval failed, continuing without context");
            String::new()
        }
    };

    let history = request.history.unwrap_or_default();
    let prompt = build_prompt(&history, &context, &request.message);
    let response = state.generator.generate(prompt).await?;

    Ok(Json(ChatResponse {
        response,
        session_id: request.session_id,
        timestamp: current_timestamp_rfc3339(),
    }))
}

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": current_timestamp_rfc3339(),
    }))
}

/// Return ingestion and search counters.
async fn get_metrics<S, G>(
    State(state): State<AppState<S, G>>,
) -> Json<crate::metrics::MetricsSnapshot>
where
    S: DocumentApi,
    G: GeneratorClient,
{
    Json(state.service.metrics_snapshot())
}

enum AppError {
    BadRequest(String),
    Ingest(IngestError),
    Search(SearchError),
    Delete(DeleteError),
    Store(StoreError),
    Generator(GeneratorError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Ingest(error) => match error {
                IngestError::UnsupportedFileType(_)
                | IngestError::EmptyDocument
                | IngestError::Chunking(_) => StatusCode::BAD_REQUEST,
                IngestError::Duplicate { .. } => StatusCode::CONFLICT,
                IngestError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
                IngestError::Embedding(_) | IngestError::Store(_) => StatusCode::BAD_GATEWAY,
                IngestError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            },
            Self::Search(error) => match error {
                SearchError::InvalidLimit => StatusCode::BAD_REQUEST,
                SearchError::Embedding(_)
                | SearchError::EmptyEmbedding
                | SearchError::DimensionMismatch { .. }
                | SearchError::Store(_) => StatusCode::BAD_GATEWAY,
                SearchError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            },
            Self::Delete(error) => match error {
                DeleteError::NotFound { .. } => StatusCode::NOT_FOUND,
                DeleteError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
                DeleteError::Store(StoreError::Timeout) | DeleteError::Timeout => {
                    StatusCode::GATEWAY_TIMEOUT
                }
                DeleteError::Store(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Store(StoreError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            Self::Store(_) | Self::Generator(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::BadRequest(message) => message.clone(),
            Self::Ingest(error) => error.to_string(),
            Self::Search(error) => error.to_string(),
            Self::Delete(error) => error.to_string(),
            Self::Store(error) => error.to_string(),
            Self::Generator(error) => error.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.message(), "Request failed");
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(inner: IngestError) -> Self {
        Self::Ingest(inner)
    }
}

impl From<SearchError> for AppError {
    fn from(inner: SearchError) -> Self {
        Self::Search(inner)
    }
}

impl From<DeleteError> for AppError {
    fn from(inner: DeleteError) -> Self {
        Self::Delete(inner)
    }
}

impl From<StoreError> for AppError {
    fn from(inner: StoreError) -> Self {
        Self::Store(inner)
    }
}

impl From<GeneratorError> for AppError {
    fn from(inner: GeneratorError) -> Self {
        Self::Generator(inner)
    }
}
