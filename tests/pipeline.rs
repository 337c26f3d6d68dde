//! End-to-end pipeline tests over an in-memory vector index.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use common::InMemoryIndex;
use docrag::embedding::HashEmbedder;
use docrag::pipeline::{DocumentService, IngestError, PipelineSettings, SearchError};
use docrag::store::{
    DocumentStore, VectorIndex,
    types::{DeleteError, PointInsert, ScoredPoint, StoreError},
};

const DIMENSION: usize = 16;

fn settings() -> PipelineSettings {
    PipelineSettings {
        chunk_size: 100,
        chunk_overlap: 20,
        embedding_dimension: DIMENSION,
        dedup_by_content_hash: false,
        request_timeout: Duration::from_secs(5),
        search_max_limit: 50,
        context_top_k: 3,
        context_max_chars: 4000,
    }
}

fn service_over(index: Arc<dyn VectorIndex>, settings: PipelineSettings) -> DocumentService {
    let store = DocumentStore::new(index, Box::new(HashEmbedder::new(DIMENSION)));
    DocumentService::new(store, settings)
}

fn txt_bytes(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

#[tokio::test]
async fn ingest_persists_every_chunk_with_metadata() {
    let index = Arc::new(InMemoryIndex::new());
    let service = service_over(index.clone(), settings());

    let text = "word ".repeat(60); // 300 chars, chunk_size 100, overlap 20
    let outcome = service
        .ingest(txt_bytes(&text), "notes.txt".into(), "alice".into())
        .await
        .expect("ingest");

    assert_eq!(outcome.filename, "notes.txt");
    assert!(outcome.chunk_count > 1);
    assert_eq!(index.point_count(), outcome.chunk_count);

    let documents = service.list_documents(Some("alice")).await.expect("list");
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].doc_id, outcome.doc_id);
    assert_eq!(documents[0].total_chunks, outcome.chunk_count);
}

#[tokio::test]
async fn ingest_rejects_unsupported_extension() {
    let service = service_over(Arc::new(InMemoryIndex::new()), settings());

    let error = service
        .ingest(txt_bytes("data"), "binary.exe".into(), "alice".into())
        .await
        .expect_err("unsupported ingest");

    assert!(matches!(error, IngestError::UnsupportedFileType(ext) if ext == "exe"));
}

#[tokio::test]
async fn ingest_rejects_whitespace_only_document() {
    let service = service_over(Arc::new(InMemoryIndex::new()), settings());

    let error = service
        .ingest(txt_bytes("   \n\t  "), "blank.txt".into(), "alice".into())
        .await
        .expect_err("empty ingest");

    assert!(matches!(error, IngestError::EmptyDocument));
}

#[tokio::test]
async fn duplicate_content_is_refused_when_dedup_enabled() {
    let index = Arc::new(InMemoryIndex::new());
    let service = service_over(
        index.clone(),
        PipelineSettings {
            dedup_by_content_hash: true,
            ..settings()
        },
    );

    let first = service
        .ingest(txt_bytes("identical body"), "a.txt".into(), "alice".into())
        .await
        .expect("first ingest");

    let error = service
        .ingest(txt_bytes("identical body"), "b.txt".into(), "alice".into())
        .await
        .expect_err("duplicate ingest");
    assert!(matches!(
        error,
        IngestError::Duplicate { existing_doc_id } if existing_doc_id == first.doc_id
    ));

    // A different owner may store the same content.
    service
        .ingest(txt_bytes("identical body"), "c.txt".into(), "bob".into())
        .await
        .expect("other owner ingest");
}

#[tokio::test]
async fn search_orders_hits_and_respects_owner_filter() {
    let index = Arc::new(InMemoryIndex::new());
    let service = service_over(index, settings());

    service
        .ingest(
            txt_bytes("the quick brown fox jumps over the lazy dog"),
            "fox.txt".into(),
            "alice".into(),
        )
        .await
        .expect("ingest fox");
    service
        .ingest(
            txt_bytes("completely unrelated ledger of quarterly expenses"),
            "ledger.txt".into(),
            "bob".into(),
        )
        .await
        .expect("ingest ledger");

    let hits = service
        .search("quick brown fox", Some("alice"), 10)
        .await
        .expect("search");

    assert!(!hits.is_empty());
    assert!(hits.iter().all(|hit| hit.metadata.owner_id == "alice"));
    for pair in hits.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
    for hit in &hits {
        assert!(hit.distance >= 0.0);
    }
}

#[tokio::test]
async fn search_returns_fewer_hits_than_requested_without_error() {
    let index = Arc::new(InMemoryIndex::new());
    let service = service_over(index, settings());

    service
        .ingest(txt_bytes("short document"), "one.txt".into(), "alice".into())
        .await
        .expect("ingest");

    let hits = service
        .search("short document", Some("alice"), 10)
        .await
        .expect("search");
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn search_rejects_zero_limit_and_clamps_excess() {
    let index = Arc::new(InMemoryIndex::new());
    let service = service_over(
        index,
        PipelineSettings {
            search_max_limit: 2,
            ..settings()
        },
    );

    let error = service
        .search("anything", None, 0)
        .await
        .expect_err("zero limit");
    assert!(matches!(error, SearchError::InvalidLimit));

    let text = "sentence ".repeat(60);
    service
        .ingest(txt_bytes(&text), "long.txt".into(), "alice".into())
        .await
        .expect("ingest");
    let hits = service
        .search("sentence", Some("alice"), 1000)
        .await
        .expect("clamped search");
    assert!(hits.len() <= 2);
}

#[tokio::test]
async fn delete_removes_every_chunk_and_enforces_ownership() {
    let index = Arc::new(InMemoryIndex::new());
    let service = service_over(index.clone(), settings());

    let text = "chunked content ".repeat(30);
    let outcome = service
        .ingest(txt_bytes(&text), "doc.txt".into(), "alice".into())
        .await
        .expect("ingest");

    // Wrong owner is refused and leaves the chunks intact.
    let error = service
        .delete_document(&outcome.doc_id, "mallory")
        .await
        .expect_err("foreign delete");
    assert!(matches!(error, DeleteError::PermissionDenied { .. }));
    assert_eq!(index.point_count(), outcome.chunk_count);

    // The owner removes exactly total_chunks chunks.
    let deleted = service
        .delete_document(&outcome.doc_id, "alice")
        .await
        .expect("owner delete");
    assert_eq!(deleted, outcome.chunk_count);
    assert_eq!(index.point_count(), 0);

    // A second delete reports the document as missing.
    let error = service
        .delete_document(&outcome.doc_id, "alice")
        .await
        .expect_err("repeat delete");
    assert!(matches!(error, DeleteError::NotFound { .. }));
}

#[tokio::test]
async fn list_without_owner_returns_all_documents() {
    let index = Arc::new(InMemoryIndex::new());
    let service = service_over(index, settings());

    service
        .ingest(txt_bytes("first body"), "a.txt".into(), "alice".into())
        .await
        .expect("ingest a");
    service
        .ingest(txt_bytes("second body"), "b.txt".into(), "bob".into())
        .await
        .expect("ingest b");

    let all = service.list_documents(None).await.expect("list all");
    assert_eq!(all.len(), 2);

    let theirs = service.list_documents(Some("bob")).await.expect("list bob");
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].filename, "b.txt");
}

#[tokio::test]
async fn document_context_tags_sources_and_respects_owner() {
    let index = Arc::new(InMemoryIndex::new());
    let service = service_over(index, settings());

    service
        .ingest(
            txt_bytes("the moon orbits the earth once every month"),
            "moon.txt".into(),
            "alice".into(),
        )
        .await
        .expect("ingest");

    let context = service
        .document_context("moon orbit", "alice")
        .await
        .expect("context");
    assert!(context.contains("[Source: moon.txt #0]"));
    assert!(context.contains("the moon orbits the earth"));

    let empty = service
        .document_context("moon orbit", "nobody")
        .await
        .expect("context for stranger");
    assert!(empty.is_empty());
}

/// Index whose upserts always fail, recording delete filters it receives.
struct FailingUpsertIndex {
    inner: InMemoryIndex,
    deletes: std::sync::Mutex<Vec<Value>>,
}

impl FailingUpsertIndex {
    fn new() -> Self {
        Self {
            inner: InMemoryIndex::new(),
            deletes: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorIndex for FailingUpsertIndex {
    async fn ensure_ready(&self, vector_size: u64) -> Result<(), StoreError> {
        self.inner.ensure_ready(vector_size).await
    }

    async fn upsert_points(&self, _points: Vec<PointInsert>) -> Result<(), StoreError> {
        Err(StoreError::UnexpectedStatus {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "forced failure".into(),
        })
    }

    async fn query_points(
        &self,
        vector: Vec<f32>,
        filter: Option<Value>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, StoreError> {
        self.inner.query_points(vector, filter, limit).await
    }

    async fn delete_by_filter(&self, filter: Value) -> Result<(), StoreError> {
        self.deletes.lock().expect("deletes lock").push(filter.clone());
        self.inner.delete_by_filter(filter).await
    }

    async fn scroll_payloads(
        &self,
        filter: Option<Value>,
    ) -> Result<Vec<Map<String, Value>>, StoreError> {
        self.inner.scroll_payloads(filter).await
    }
}

/// Index whose every operation outlasts any reasonable request budget.
struct StallingIndex;

const STALL: Duration = Duration::from_secs(30);

#[async_trait]
impl VectorIndex for StallingIndex {
    async fn ensure_ready(&self, _vector_size: u64) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert_points(&self, _points: Vec<PointInsert>) -> Result<(), StoreError> {
        tokio::time::sleep(STALL).await;
        Ok(())
    }

    async fn query_points(
        &self,
        _vector: Vec<f32>,
        _filter: Option<Value>,
        _limit: usize,
    ) -> Result<Vec<ScoredPoint>, StoreError> {
        tokio::time::sleep(STALL).await;
        Ok(Vec::new())
    }

    async fn delete_by_filter(&self, _filter: Value) -> Result<(), StoreError> {
        tokio::time::sleep(STALL).await;
        Ok(())
    }

    async fn scroll_payloads(
        &self,
        _filter: Option<Value>,
    ) -> Result<Vec<Map<String, Value>>, StoreError> {
        tokio::time::sleep(STALL).await;
        Ok(Vec::new())
    }
}

fn stalling_service() -> DocumentService {
    service_over(
        Arc::new(StallingIndex),
        PipelineSettings {
            request_timeout: Duration::from_millis(50),
            ..settings()
        },
    )
}

#[tokio::test]
async fn ingest_times_out_when_the_index_stalls() {
    let service = stalling_service();
    let started = std::time::Instant::now();

    let error = service
        .ingest(txt_bytes("document body"), "doc.txt".into(), "alice".into())
        .await
        .expect_err("stalled persist");

    assert!(matches!(error, IngestError::Timeout { .. }));
    // Persist budget plus the bounded rollback purge, not the full stall.
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn search_times_out_when_the_index_stalls() {
    let service = stalling_service();
    let started = std::time::Instant::now();

    let error = service
        .search("anything", Some("alice"), 3)
        .await
        .expect_err("stalled query");

    assert!(matches!(error, SearchError::Timeout));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn delete_times_out_when_the_index_stalls() {
    let service = stalling_service();
    let started = std::time::Instant::now();

    let error = service
        .delete_document("doc-1", "alice")
        .await
        .expect_err("stalled delete");

    assert!(matches!(error, DeleteError::Timeout));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn list_times_out_when_the_index_stalls() {
    let service = stalling_service();
    let started = std::time::Instant::now();

    let error = service
        .list_documents(Some("alice"))
        .await
        .expect_err("stalled scroll");

    assert!(matches!(error, StoreError::Timeout));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn failed_persist_rolls_back_partial_writes() {
    let index = Arc::new(FailingUpsertIndex::new());
    let service = service_over(index.clone(), settings());

    let error = service
        .ingest(txt_bytes("document body"), "doc.txt".into(), "alice".into())
        .await
        .expect_err("persist failure");
    assert!(matches!(error, IngestError::Store(_)));

    // The rollback purge issued a delete scoped to the new document.
    let deletes = index.deletes.lock().expect("deletes lock");
    assert_eq!(deletes.len(), 1);
    let condition = &deletes[0]["must"][0];
    assert_eq!(condition["key"], "doc_id");

    // Nothing remains visible to readers.
    drop(deletes);
    let documents = service.list_documents(None).await.expect("list");
    assert!(documents.is_empty());
}
