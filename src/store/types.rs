//! Shared types for the document store adapter and its vector index backends.

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::extract::FileType;

/// Errors returned while interacting with the vector index.
///
/// These are the transient/store-outage kind: safe to retry from the caller's
/// perspective. Permission and not-found outcomes are reported separately via
/// [`DeleteError`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid vector index URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The index responded with an unexpected status code.
    #[error("Unexpected vector index response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the index.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// A stored payload was missing required chunk fields.
    #[error("Malformed chunk payload: {0}")]
    MalformedPayload(String),
    /// The index did not respond within the configured time budget.
    #[error("Store request timed out")]
    Timeout,
}

/// Errors returned by [`super::DocumentStore::delete`].
#[derive(Debug, Error)]
pub enum DeleteError {
    /// No chunks exist for the requested document.
    #[error("Document not found: {doc_id}")]
    NotFound {
        /// Identifier the caller asked to delete.
        doc_id: String,
    },
    /// The caller's owner id does not match the document's recorded owner.
    #[error("Permission denied deleting document {doc_id}")]
    PermissionDenied {
        /// Identifier the caller asked to delete.
        doc_id: String,
    },
    /// The underlying index failed while locating or removing chunks.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The index did not respond within the configured time budget.
    #[error("Delete timed out")]
    Timeout,
}

/// Denormalized metadata persisted with every chunk.
///
/// Carrying the owning document's fields on each chunk keeps retrieval
/// results self-describing without a join against a document table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkMetadata {
    /// Identifier of the owning document.
    pub doc_id: String,
    /// Declared filename of the owning document.
    pub filename: String,
    /// Owner who uploaded the document.
    pub owner_id: String,
    /// Format of the owning document.
    pub file_type: FileType,
    /// Zero-based position of this chunk within the document.
    pub chunk_index: usize,
    /// Total chunk count of the owning document, fixed at ingestion.
    pub total_chunks: usize,
    /// RFC3339 ingestion timestamp of the owning document.
    pub created_at: String,
}

/// A chunk ready for persistence: text plus its denormalized metadata.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    /// Chunk text content.
    pub content: String,
    /// Denormalized document metadata.
    pub metadata: ChunkMetadata,
}

/// One-line listing entry for a stored document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    /// Document identifier.
    pub doc_id: String,
    /// Declared filename.
    pub filename: String,
    /// Owner who uploaded the document.
    pub owner_id: String,
    /// Document format.
    pub file_type: FileType,
    /// Number of chunks the document was split into.
    pub total_chunks: usize,
    /// RFC3339 ingestion timestamp.
    pub created_at: String,
}

/// A retrieved chunk with its distance from the query embedding.
///
/// Distance follows the cosine-distance convention: non-negative, smaller
/// means more similar.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    /// Chunk text content.
    pub content: String,
    /// Denormalized document metadata.
    pub metadata: ChunkMetadata,
    /// Cosine distance to the query embedding.
    pub distance: f32,
}

/// Prepared vector point ready for insertion into the index.
#[derive(Debug, Clone)]
pub struct PointInsert {
    /// Point identifier assigned by the adapter.
    pub id: String,
    /// Embedding vector produced for the chunk.
    pub vector: Vec<f32>,
    /// Chunk payload stored alongside the vector.
    pub payload: Value,
}

/// Scored payload returned by index similarity queries.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Similarity score reported by the index (higher is more similar).
    pub score: f32,
    /// Payload associated with the vector.
    pub payload: Option<Map<String, Value>>,
}
