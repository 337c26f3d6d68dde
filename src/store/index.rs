//! Backend contract implemented by vector index technologies.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::types::{PointInsert, ScoredPoint, StoreError};

/// Primitive operations the document store adapter requires from an index.
///
/// Implementations must apply an upsert atomically with respect to readers:
/// a concurrent query sees either none or all of the points from one call.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Prepare the backing collection for vectors of the given size.
    async fn ensure_ready(&self, vector_size: u64) -> Result<(), StoreError>;

    /// Insert or replace the given points.
    async fn upsert_points(&self, points: Vec<PointInsert>) -> Result<(), StoreError>;

    /// Return up to `limit` points most similar to `vector`, best first.
    async fn query_points(
        &self,
        vector: Vec<f32>,
        filter: Option<Value>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, StoreError>;

    /// Remove every point whose payload matches the filter.
    async fn delete_by_filter(&self, filter: Value) -> Result<(), StoreError>;

    /// Return the payloads of every point matching the optional filter.
    async fn scroll_payloads(
        &self,
        filter: Option<Value>,
    ) -> Result<Vec<Map<String, Value>>, StoreError>;
}
