//! Core data types and error definitions for the ingestion and retrieval pipeline.

use thiserror::Error;

use crate::config::Config;
use crate::embedding::EmbeddingClientError;
use crate::extract::ExtractError;
use crate::pipeline::chunking::ChunkingError;
use crate::store::StoreError;

/// Errors emitted by the document ingestion pipeline.
///
/// Any failure aborts the whole ingestion; no partial document is ever
/// listed or searchable.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The declared filename carries an extension outside {pdf, docx, txt}.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    /// The extractor failed to produce text from the document bytes.
    #[error("Failed to extract text: {0}")]
    Extraction(#[from] ExtractError),
    /// Extraction succeeded but the document contains no text after trimming.
    #[error("Document contains no extractable text")]
    EmptyDocument,
    /// Chunking parameters were invalid.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// The embedding provider failed for at least one chunk.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// The vector index failed while persisting chunks.
    #[error("Store request failed: {0}")]
    Store(#[from] StoreError),
    /// Content-hash dedup is enabled and identical content already exists.
    #[error("Duplicate document; existing doc_id: {existing_doc_id}")]
    Duplicate {
        /// Identifier of the already-stored document with the same content.
        existing_doc_id: String,
    },
    /// A pipeline stage exceeded the configured time budget.
    #[error("Ingestion timed out during {stage}")]
    Timeout {
        /// Stage that exceeded the budget.
        stage: &'static str,
    },
}

/// Errors emitted while orchestrating similarity searches.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The caller requested zero or fewer results.
    #[error("n_results must be greater than zero")]
    InvalidLimit,
    /// Embedding provider failed to return a vector for the query text.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Embedding provider returned no vectors for the query.
    #[error("Embedding provider returned no vectors for the query")]
    EmptyEmbedding,
    /// Returned embedding dimension does not match configuration.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected embedding dimension configured on the server.
        expected: usize,
        /// Actual embedding dimension produced by the provider.
        actual: usize,
    },
    /// The vector index query failed.
    #[error("Store request failed: {0}")]
    Store(#[from] StoreError),
    /// The search exceeded the configured time budget.
    #[error("Search timed out")]
    Timeout,
}

/// Summary of a completed ingestion.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Identifier assigned to the new document.
    pub doc_id: String,
    /// Declared filename of the upload.
    pub filename: String,
    /// Number of chunks the document was split into.
    pub chunk_count: usize,
    /// Character count of the extracted text.
    pub total_characters: usize,
}

/// Pipeline knobs resolved from configuration at startup.
///
/// Carried as an explicit value rather than read from the global config so
/// tests can construct a service with arbitrary geometry.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Window size in characters for the chunker.
    pub chunk_size: usize,
    /// Overlap in characters between adjacent chunks.
    pub chunk_overlap: usize,
    /// Expected embedding dimension.
    pub embedding_dimension: usize,
    /// Refuse re-uploads of identical content per owner.
    pub dedup_by_content_hash: bool,
    /// Time budget for each external call (extraction, embedding, store).
    pub request_timeout: std::time::Duration,
    /// Hard ceiling on search results per request.
    pub search_max_limit: usize,
    /// Number of chunks retrieved for context assembly.
    pub context_top_k: usize,
    /// Character budget for the assembled context block.
    pub context_max_chars: usize,
}

impl PipelineSettings {
    /// Resolve settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            embedding_dimension: config.embedding_dimension,
            dedup_by_content_hash: config.dedup_by_content_hash,
            request_timeout: std::time::Duration::from_secs(config.request_timeout_secs),
            search_max_limit: config.search_max_limit,
            context_top_k: config.context_top_k,
            context_max_chars: config.context_max_chars,
        }
    }
}
