//! Shared test fixtures: an in-memory vector index that stands in for Qdrant.

use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::{Map, Value};

use docrag::store::{
    VectorIndex,
    types::{PointInsert, ScoredPoint, StoreError},
};

/// Brute-force in-memory implementation of [`VectorIndex`].
///
/// Mirrors the Qdrant filter shape (`must` list of `key`/`match.value`
/// conditions) so adapter-built filters evaluate unchanged.
#[derive(Default)]
pub struct InMemoryIndex {
    points: RwLock<Vec<PointInsert>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn point_count(&self) -> usize {
        self.points.read().expect("points lock").len()
    }
}

fn payload_matches(payload: &Map<String, Value>, filter: &Value) -> bool {
    let Some(conditions) = filter.get("must").and_then(Value::as_array) else {
        return true;
    };
    conditions.iter().all(|condition| {
        let key = condition.get("key").and_then(Value::as_str);
        let expected = condition.get("match").and_then(|m| m.get("value"));
        match (key, expected) {
            (Some(key), Some(expected)) => payload.get(key) == Some(expected),
            _ => false,
        }
    })
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn ensure_ready(&self, _vector_size: u64) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert_points(&self, points: Vec<PointInsert>) -> Result<(), StoreError> {
        let mut guard = self.points.write().expect("points lock");
        for point in points {
            guard.retain(|existing| existing.id != point.id);
            guard.push(point);
        }
        Ok(())
    }

    async fn query_points(
        &self,
        vector: Vec<f32>,
        filter: Option<Value>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, StoreError> {
        let guard = self.points.read().expect("points lock");
        let mut scored: Vec<ScoredPoint> = guard
            .iter()
            .filter(|point| {
                let payload = point.payload.as_object().expect("object payload");
                filter
                    .as_ref()
                    .is_none_or(|filter| payload_matches(payload, filter))
            })
            .map(|point| ScoredPoint {
                score: dot(&vector, &point.vector),
                payload: point.payload.as_object().cloned(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn delete_by_filter(&self, filter: Value) -> Result<(), StoreError> {
        let mut guard = self.points.write().expect("points lock");
        guard.retain(|point| {
            let payload = point.payload.as_object().expect("object payload");
            !payload_matches(payload, &filter)
        });
        Ok(())
    }

    async fn scroll_payloads(
        &self,
        filter: Option<Value>,
    ) -> Result<Vec<Map<String, Value>>, StoreError> {
        let guard = self.points.read().expect("points lock");
        Ok(guard
            .iter()
            .filter(|point| {
                let payload = point.payload.as_object().expect("object payload");
                filter
                    .as_ref()
                    .is_none_or(|filter| payload_matches(payload, filter))
            })
            .map(|point| point.payload.as_object().cloned().expect("object payload"))
            .collect())
    }
}
