#![deny(missing_docs)]

//! Core library for the docrag document retrieval service.

/// HTTP routing and REST handlers.
pub mod api;
/// Generator client abstraction and chat prompt assembly.
pub mod chat;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// File-type dispatch and text extraction for uploaded documents.
pub mod extract;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Chunking, ingestion, retrieval, and context assembly pipeline.
pub mod pipeline;
/// Document store adapter over the vector index.
pub mod store;
