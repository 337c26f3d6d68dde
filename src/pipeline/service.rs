//! Document service coordinating extraction, chunking, embedding, and store operations.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::get_config;
use crate::embedding::get_embedding_client;
use crate::extract::{self, FileType};
use crate::metrics::{IngestMetrics, MetricsSnapshot};
use crate::pipeline::chunking::chunk_text;
use crate::pipeline::context::assemble_context;
use crate::pipeline::types::{IngestError, IngestOutcome, PipelineSettings, SearchError};
use crate::store::payload::{current_timestamp_rfc3339, generate_doc_id};
use crate::store::{
    ChunkMetadata, ChunkRecord, DeleteError, DocumentStore, DocumentSummary, QdrantIndex,
    ScoredChunk, StoreError, compute_content_hash,
};

/// Coordinates the full document lifecycle: ingestion, retrieval, deletion, listing.
///
/// The service owns the document store handle and metrics registry; construct
/// it once near process start and share it through an `Arc`. The store is an
/// explicit constructor argument so tests can inject an in-memory index.
pub struct DocumentService {
    store: DocumentStore,
    settings: PipelineSettings,
    metrics: Arc<IngestMetrics>,
}

/// Abstraction over the document pipeline used by external surfaces.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Extract, chunk, embed, and persist an uploaded document.
    async fn ingest(
        &self,
        bytes: Vec<u8>,
        filename: String,
        owner_id: String,
    ) -> Result<IngestOutcome, IngestError>;

    /// Execute a semantic search over stored chunks.
    async fn search(
        &self,
        query: &str,
        owner_id: Option<&str>,
        n_results: usize,
    ) -> Result<Vec<ScoredChunk>, SearchError>;

    /// Delete a document and all its chunks, enforcing ownership.
    async fn delete_document(&self, doc_id: &str, owner_id: &str) -> Result<usize, DeleteError>;

    /// List stored documents, optionally restricted to one owner.
    async fn list_documents(&self, owner_id: Option<&str>)
    -> Result<Vec<DocumentSummary>, StoreError>;

    /// Assemble a bounded RAG context block for a query.
    async fn document_context(&self, query: &str, owner_id: &str) -> Result<String, SearchError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl DocumentService {
    /// Build a service over an explicit store handle.
    pub fn new(store: DocumentStore, settings: PipelineSettings) -> Self {
        Self {
            store,
            settings,
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    /// Build a service wired to Qdrant using the loaded configuration.
    pub async fn open_from_config() -> Result<Self, StoreError> {
        let config = get_config();
        let index = Arc::new(QdrantIndex::new()?);
        let store = DocumentStore::new(index, get_embedding_client());
        store.ensure_ready(config.embedding_dimension as u64).await?;
        tracing::debug!(collection = %config.qdrant_collection_name, "Document store ready");
        Ok(Self::new(store, PipelineSettings::from_config(config)))
    }

    /// Run the ingestion state machine for one upload.
    ///
    /// Any stage failure aborts the whole pipeline; a failed persist rolls
    /// back partial writes so no partial document is ever visible.
    pub async fn ingest(
        &self,
        bytes: Vec<u8>,
        filename: String,
        owner_id: String,
    ) -> Result<IngestOutcome, IngestError> {
        let file_type = FileType::from_filename(&filename).ok_or_else(|| {
            let extension = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
            IngestError::UnsupportedFileType(extension.to_string())
        })?;

        tracing::info!(filename = %filename, file_type = %file_type, "Processing upload");

        let extraction = tokio::task::spawn_blocking(move || extract::extract_text(&bytes, file_type));
        let text = tokio::time::timeout(self.settings.request_timeout, extraction)
            .await
            .map_err(|_| IngestError::Timeout { stage: "extraction" })?
            .map_err(|err| extract::ExtractError::Task(err.to_string()))??;

        if text.is_empty() {
            return Err(IngestError::EmptyDocument);
        }

        let content_hash = compute_content_hash(&text);
        if self.settings.dedup_by_content_hash
            && let Some(existing_doc_id) = tokio::time::timeout(
                self.settings.request_timeout,
                self.store.find_by_content_hash(&owner_id, &content_hash),
            )
            .await
            .map_err(|_| IngestError::Timeout { stage: "dedup check" })??
        {
            tracing::info!(filename = %filename, existing_doc_id = %existing_doc_id, "Duplicate upload refused");
            return Err(IngestError::Duplicate { existing_doc_id });
        }

        let chunks = chunk_text(&text, self.settings.chunk_size, self.settings.chunk_overlap)?;
        if chunks.is_empty() {
            return Err(IngestError::EmptyDocument);
        }

        let embeddings = tokio::time::timeout(
            self.settings.request_timeout,
            self.store.embed(chunks.clone()),
        )
        .await
        .map_err(|_| IngestError::Timeout { stage: "embedding" })??;

        let doc_id = generate_doc_id();
        let created_at = current_timestamp_rfc3339();
        let total_chunks = chunks.len();
        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| ChunkRecord {
                content,
                metadata: ChunkMetadata {
                    doc_id: doc_id.clone(),
                    filename: filename.clone(),
                    owner_id: owner_id.clone(),
                    file_type,
                    chunk_index,
                    total_chunks,
                    created_at: created_at.clone(),
                },
            })
            .collect();

        let persist = tokio::time::timeout(
            self.settings.request_timeout,
            self.store.upsert(records, embeddings, &content_hash),
        )
        .await
        .map_err(|_| IngestError::Timeout { stage: "persist" });

        if let Err(store_err) = persist.and_then(|result| result.map_err(IngestError::from)) {
            // Failed upsert means the whole ingestion failed; drop anything
            // the index may have accepted so no partial document is visible.
            match tokio::time::timeout(self.settings.request_timeout, self.store.purge(&doc_id))
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(purge_err)) => {
                    tracing::warn!(doc_id = %doc_id, error = %purge_err, "Rollback purge failed");
                }
                Err(_) => {
                    tracing::warn!(doc_id = %doc_id, "Rollback purge timed out");
                }
            }
            return Err(store_err);
        }

        self.metrics.record_document(total_chunks as u64);
        tracing::info!(
            doc_id = %doc_id,
            filename = %filename,
            chunks = total_chunks,
            total_characters = text.chars().count(),
            "Document indexed"
        );

        Ok(IngestOutcome {
            doc_id,
            filename,
            chunk_count: total_chunks,
            total_characters: text.chars().count(),
        })
    }

    /// Embed the query text and return the closest stored chunks.
    ///
    /// Fewer matches than requested is not an error; the result is simply
    /// shorter. Ordering is ascending by distance with `chunk_index` ties.
    pub async fn search(
        &self,
        query: &str,
        owner_id: Option<&str>,
        n_results: usize,
    ) -> Result<Vec<ScoredChunk>, SearchError> {
        if n_results == 0 {
            return Err(SearchError::InvalidLimit);
        }
        let limit = n_results.min(self.settings.search_max_limit);

        let mut vectors = tokio::time::timeout(
            self.settings.request_timeout,
            self.store.embed(vec![query.to_string()]),
        )
        .await
        .map_err(|_| SearchError::Timeout)??;
        let vector = vectors.pop().ok_or(SearchError::EmptyEmbedding)?;

        let expected = self.settings.embedding_dimension;
        if vector.len() != expected {
            return Err(SearchError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let hits = tokio::time::timeout(
            self.settings.request_timeout,
            self.store.query(vector, owner_id, limit),
        )
        .await
        .map_err(|_| SearchError::Timeout)??;

        self.metrics.record_search();
        tracing::debug!(results = hits.len(), limit, "Search completed");
        Ok(hits)
    }

    /// Delete a document after verifying the caller owns it.
    pub async fn delete_document(&self, doc_id: &str, owner_id: &str) -> Result<usize, DeleteError> {
        tokio::time::timeout(
            self.settings.request_timeout,
            self.store.delete(doc_id, owner_id),
        )
        .await
        .map_err(|_| DeleteError::Timeout)?
    }

    /// List stored documents, optionally restricted to one owner.
    pub async fn list_documents(
        &self,
        owner_id: Option<&str>,
    ) -> Result<Vec<DocumentSummary>, StoreError> {
        tokio::time::timeout(self.settings.request_timeout, self.store.list(owner_id))
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    /// Retrieve top chunks for a query and merge them into a bounded context block.
    pub async fn document_context(
        &self,
        query: &str,
        owner_id: &str,
    ) -> Result<String, SearchError> {
        let hits = self
            .search(query, Some(owner_id), self.settings.context_top_k)
            .await?;
        Ok(assemble_context(&hits, self.settings.context_max_chars))
    }

    /// Return the current service metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl DocumentApi for DocumentService {
    async fn ingest(
        &self,
        bytes: Vec<u8>,
        filename: String,
        owner_id: String,
    ) -> Result<IngestOutcome, IngestError> {
        DocumentService::ingest(self, bytes, filename, owner_id).await
    }

    async fn search(
        &self,
        query: &str,
        owner_id: Option<&str>,
        n_results: usize,
    ) -> Result<Vec<ScoredChunk>, SearchError> {
        DocumentService::search(self, query, owner_id, n_results).await
    }

    async fn delete_document(&self, doc_id: &str, owner_id: &str) -> Result<usize, DeleteError> {
        DocumentService::delete_document(self, doc_id, owner_id).await
    }

    async fn list_documents(
        &self,
        owner_id: Option<&str>,
    ) -> Result<Vec<DocumentSummary>, StoreError> {
        DocumentService::list_documents(self, owner_id).await
    }

    async fn document_context(&self, query: &str, owner_id: &str) -> Result<String, SearchError> {
        DocumentService::document_context(self, query, owner_id).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        DocumentService::metrics_snapshot(self)
    }
}
