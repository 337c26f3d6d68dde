//! Document store adapter over the vector index.

mod adapter;
/// Filter builders shared by the adapter and index backends.
pub mod filters;
mod index;
/// Chunk payload construction and decoding.
pub mod payload;
/// Qdrant HTTP backend.
pub mod qdrant;
/// Shared store types and errors.
pub mod types;

pub use adapter::DocumentStore;
pub use index::VectorIndex;
pub use payload::compute_content_hash;
pub use qdrant::QdrantIndex;
pub use types::{
    ChunkMetadata, ChunkRecord, DeleteError, DocumentSummary, PointInsert, ScoredChunk,
    ScoredPoint, StoreError,
};
