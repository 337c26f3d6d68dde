//! Filter builders for vector index queries.
//!
//! All payload filters use the Qdrant `must` clause shape so both the HTTP
//! backend and the in-memory test index evaluate the same structures.

use serde_json::{Value, json};

/// Filter restricting results to chunks uploaded by one owner.
///
/// Returns `None` for an absent or blank owner, meaning "no restriction".
pub fn owner_filter(owner_id: Option<&str>) -> Option<Value> {
    let owner = owner_id.map(str::trim).filter(|value| !value.is_empty())?;
    Some(json!({
        "must": [
            { "key": "owner_id", "match": { "value": owner } }
        ]
    }))
}

/// Filter matching every chunk belonging to one document.
pub fn doc_filter(doc_id: &str) -> Value {
    json!({
        "must": [
            { "key": "doc_id", "match": { "value": doc_id } }
        ]
    })
}

/// Filter locating a document by content hash within one owner's uploads.
pub fn content_hash_filter(owner_id: &str, content_hash: &str) -> Value {
    json!({
        "must": [
            { "key": "owner_id", "match": { "value": owner_id } },
            { "key": "content_hash", "match": { "value": content_hash } }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_filter_requires_non_blank_owner() {
        assert!(owner_filter(None).is_none());
        assert!(owner_filter(Some("   ")).is_none());

        let filter = owner_filter(Some("user-a")).expect("filter");
        assert_eq!(
            filter,
            json!({
                "must": [
                    { "key": "owner_id", "match": { "value": "user-a" } }
                ]
            })
        );
    }

    #[test]
    fn doc_filter_matches_single_document() {
        assert_eq!(
            doc_filter("doc-1"),
            json!({
                "must": [
                    { "key": "doc_id", "match": { "value": "doc-1" } }
                ]
            })
        );
    }

    #[test]
    fn content_hash_filter_is_owner_scoped() {
        let filter = content_hash_filter("user-a", "abc123");
        let must = filter["must"].as_array().expect("must clauses");
        assert_eq!(must.len(), 2);
        assert_eq!(must[0]["key"], "owner_id");
        assert_eq!(must[1]["key"], "content_hash");
    }
}
