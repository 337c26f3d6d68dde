//! Document ingestion and retrieval pipeline.
//!
//! The pipeline turns uploaded files into searchable chunks: extract the
//! text, split it into overlapping windows, embed each window, and persist
//! the result through the document store. Retrieval runs the same embedding
//! step over the query and returns the closest chunks, which the context
//! assembler can merge into a bounded prompt block.

/// Overlapping fixed-size text chunking.
pub mod chunking;
/// Context block assembly from search hits.
pub mod context;
mod service;
/// Pipeline errors, outcomes, and tuning knobs.
pub mod types;

pub use chunking::{ChunkingError, chunk_text};
pub use context::assemble_context;
pub use service::{DocumentApi, DocumentService};
pub use types::{IngestError, IngestOutcome, PipelineSettings, SearchError};
