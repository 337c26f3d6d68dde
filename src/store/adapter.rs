//! Document store adapter: the stable contract the pipeline programs against.
//!
//! Wraps a [`VectorIndex`] backend and the embedding client behind
//! document-level operations (upsert, query, delete, list). The adapter is an
//! explicitly constructed handle passed to the service, so tests can inject
//! an in-memory index instead of a live Qdrant instance.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::embedding::{EmbeddingClient, EmbeddingClientError};

use super::filters::{content_hash_filter, doc_filter, owner_filter};
use super::index::VectorIndex;
use super::payload::{
    build_chunk_payload, generate_point_id, parse_chunk_payload, parse_document_summary,
};
use super::types::{
    ChunkRecord, DeleteError, DocumentSummary, PointInsert, ScoredChunk, StoreError,
};

/// Stable document-level facade over a vector index backend.
pub struct DocumentStore {
    index: Arc<dyn VectorIndex>,
    embedder: Box<dyn EmbeddingClient + Send + Sync>,
}

impl DocumentStore {
    /// Wrap a vector index and embedding client into a document store.
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Box<dyn EmbeddingClient + Send + Sync>) -> Self {
        Self { index, embedder }
    }

    /// Prepare the backing index for vectors of the given size.
    pub async fn ensure_ready(&self, vector_size: u64) -> Result<(), StoreError> {
        self.index.ensure_ready(vector_size).await
    }

    /// Produce one embedding per text using the store's embedding capability.
    ///
    /// Both ingestion and query embedding route through here so vectors stay
    /// in a single embedding space.
    pub async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        self.embedder.generate_embeddings(texts).await
    }

    /// Persist every chunk of a document along with its embedding.
    ///
    /// The backend applies the batch atomically with respect to readers; on
    /// failure the caller rolls back by issuing [`Self::purge`] for the
    /// document id.
    pub async fn upsert(
        &self,
        chunks: Vec<ChunkRecord>,
        embeddings: Vec<Vec<f32>>,
        content_hash: &str,
    ) -> Result<(), StoreError> {
        debug_assert_eq!(chunks.len(), embeddings.len());

        let points: Vec<PointInsert> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, vector)| PointInsert {
                id: generate_point_id(),
                vector,
                payload: build_chunk_payload(chunk, content_hash),
            })
            .collect();

        self.index.upsert_points(points).await
    }

    /// Return the `top_k` chunks closest to the query embedding.
    ///
    /// Results are ordered by ascending cosine distance, ties broken by
    /// `chunk_index`, regardless of how the backend orders its response.
    pub async fn query(
        &self,
        embedding: Vec<f32>,
        owner_id: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let points = self
            .index
            .query_points(embedding, owner_filter(owner_id), top_k)
            .await?;

        let mut chunks = Vec::with_capacity(points.len());
        for point in points {
            let Some(payload) = point.payload else {
                continue;
            };
            let record = parse_chunk_payload(&payload)?;
            chunks.push(ScoredChunk {
                content: record.content,
                metadata: record.metadata,
                distance: (1.0 - point.score).max(0.0),
            });
        }

        chunks.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.metadata.chunk_index.cmp(&b.metadata.chunk_index))
        });

        Ok(chunks)
    }

    /// Remove a document and all its chunks, returning the count removed.
    ///
    /// Refuses with [`DeleteError::PermissionDenied`] when the caller's owner
    /// id does not match the stored one; no chunks are removed in that case.
    pub async fn delete(&self, doc_id: &str, owner_id: &str) -> Result<usize, DeleteError> {
        let payloads = self
            .index
            .scroll_payloads(Some(doc_filter(doc_id)))
            .await
            .map_err(DeleteError::Store)?;

        if payloads.is_empty() {
            return Err(DeleteError::NotFound {
                doc_id: doc_id.to_string(),
            });
        }

        let record = parse_chunk_payload(&payloads[0]).map_err(DeleteError::Store)?;
        if record.metadata.owner_id != owner_id {
            tracing::warn!(doc_id, owner_id, "Delete refused: owner mismatch");
            return Err(DeleteError::PermissionDenied {
                doc_id: doc_id.to_string(),
            });
        }

        self.index
            .delete_by_filter(doc_filter(doc_id))
            .await
            .map_err(DeleteError::Store)?;

        let removed = payloads.len();
        tracing::info!(doc_id, chunks = removed, "Document deleted");
        Ok(removed)
    }

    /// Remove every chunk of a document without an ownership check.
    ///
    /// Rollback path for failed ingestions; never exposed to callers.
    pub(crate) async fn purge(&self, doc_id: &str) -> Result<(), StoreError> {
        self.index.delete_by_filter(doc_filter(doc_id)).await
    }

    /// List stored documents, optionally restricted to one owner.
    pub async fn list(&self, owner_id: Option<&str>) -> Result<Vec<DocumentSummary>, StoreError> {
        let payloads = self.index.scroll_payloads(owner_filter(owner_id)).await?;

        let mut documents: BTreeMap<String, DocumentSummary> = BTreeMap::new();
        for payload in payloads {
            let summary = parse_document_summary(&payload)?;
            documents.entry(summary.doc_id.clone()).or_insert(summary);
        }

        Ok(documents.into_values().collect())
    }

    /// Look up an existing document by content hash within one owner's uploads.
    pub async fn find_by_content_hash(
        &self,
        owner_id: &str,
        content_hash: &str,
    ) -> Result<Option<String>, StoreError> {
        let payloads = self
            .index
            .scroll_payloads(Some(content_hash_filter(owner_id, content_hash)))
            .await?;

        match payloads.first() {
            Some(payload) => Ok(Some(parse_chunk_payload(payload)?.metadata.doc_id)),
            None => Ok(None),
        }
    }
}
