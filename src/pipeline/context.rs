//! Context assembly for retrieval-augmented generation.
//!
//! Retrieved chunks are merged into a single bounded text block handed to the
//! generator. Chunks with identical content are collapsed (overlapping
//! windows can both rank highly for the same passage); the first occurrence
//! by rank wins. Each surviving chunk is prefixed with a source tag so the
//! generator can attribute its answer.

use std::collections::HashSet;

use crate::store::ScoredChunk;

/// Merge retrieved chunks into a context block of at most `max_chars` characters.
///
/// Chunks are emitted in rank order; when the budget runs out the final
/// included chunk is truncated at a character boundary. Zero input chunks
/// yield an empty string, which callers treat as "generate without document
/// context" rather than an error.
pub fn assemble_context(hits: &[ScoredChunk], max_chars: usize) -> String {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = String::new();
    let mut used_chars = 0;

    for hit in hits {
        if !seen.insert(hit.content.as_str()) {
            continue;
        }

        let entry = format!(
            "[Source: {} #{}]\n{}\n\n",
            hit.metadata.filename, hit.metadata.chunk_index, hit.content
        );
        let entry_chars = entry.chars().count();

        if used_chars + entry_chars <= max_chars {
            out.push_str(&entry);
            used_chars += entry_chars;
        } else {
            let remaining = max_chars - used_chars;
            out.extend(entry.chars().take(remaining));
            break;
        }
    }

    out.trim_end().to_string()
}
