//! Chunk payload construction and decoding.
//!
//! Every stored point carries the chunk text plus a denormalized copy of the
//! owning document's metadata, so query and list results are self-describing
//! without a document table.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use super::types::{ChunkMetadata, ChunkRecord, DocumentSummary, StoreError};

/// Build the payload object stored alongside an indexed chunk.
///
/// `content_hash` is the document-level hash used for duplicate detection and
/// is repeated on every chunk so a single filter query can find it.
pub(crate) fn build_chunk_payload(record: &ChunkRecord, content_hash: &str) -> Value {
    let metadata = &record.metadata;
    let mut payload = Map::new();
    payload.insert("content".into(), Value::String(record.content.clone()));
    payload.insert("doc_id".into(), Value::String(metadata.doc_id.clone()));
    payload.insert("filename".into(), Value::String(metadata.filename.clone()));
    payload.insert("owner_id".into(), Value::String(metadata.owner_id.clone()));
    payload.insert(
        "file_type".into(),
        Value::String(metadata.file_type.as_str().to_string()),
    );
    payload.insert("chunk_index".into(), Value::from(metadata.chunk_index));
    payload.insert("total_chunks".into(), Value::from(metadata.total_chunks));
    payload.insert(
        "created_at".into(),
        Value::String(metadata.created_at.clone()),
    );
    payload.insert("content_hash".into(), Value::String(content_hash.into()));
    Value::Object(payload)
}

/// Decode a stored payload back into chunk content plus metadata.
pub(crate) fn parse_chunk_payload(payload: &Map<String, Value>) -> Result<ChunkRecord, StoreError> {
    let content = required_str(payload, "content")?.to_string();
    Ok(ChunkRecord {
        content,
        metadata: parse_chunk_metadata(payload)?,
    })
}

/// Decode the metadata fields shared by chunk and summary views.
pub(crate) fn parse_chunk_metadata(
    payload: &Map<String, Value>,
) -> Result<ChunkMetadata, StoreError> {
    Ok(ChunkMetadata {
        doc_id: required_str(payload, "doc_id")?.to_string(),
        filename: required_str(payload, "filename")?.to_string(),
        owner_id: required_str(payload, "owner_id")?.to_string(),
        file_type: required_str(payload, "file_type")?
            .parse()
            .map_err(|()| StoreError::MalformedPayload("unknown file_type".into()))?,
        chunk_index: required_usize(payload, "chunk_index")?,
        total_chunks: required_usize(payload, "total_chunks")?,
        created_at: required_str(payload, "created_at")?.to_string(),
    })
}

/// Project a chunk payload onto its owning document's summary.
pub(crate) fn parse_document_summary(
    payload: &Map<String, Value>,
) -> Result<DocumentSummary, StoreError> {
    let metadata = parse_chunk_metadata(payload)?;
    Ok(DocumentSummary {
        doc_id: metadata.doc_id,
        filename: metadata.filename,
        owner_id: metadata.owner_id,
        file_type: metadata.file_type,
        total_chunks: metadata.total_chunks,
        created_at: metadata.created_at,
    })
}

fn required_str<'a>(payload: &'a Map<String, Value>, key: &str) -> Result<&'a str, StoreError> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::MalformedPayload(format!("missing field `{key}`")))
}

fn required_usize(payload: &Map<String, Value>, key: &str) -> Result<usize, StoreError> {
    payload
        .get(key)
        .and_then(Value::as_u64)
        .map(|value| value as usize)
        .ok_or_else(|| StoreError::MalformedPayload(format!("missing field `{key}`")))
}

/// Compute the deterministic SHA-256 hash of a document's extracted text.
pub fn compute_content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Generate a fresh document identifier.
pub(crate) fn generate_doc_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate an identifier for a stored vector point.
pub(crate) fn generate_point_id() -> String {
    Uuid::new_v4().to_string()
}
