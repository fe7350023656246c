use tracing::debug;

use crate::backend::Embedder;
use crate::embed_query::embed_query;
use crate::error::{RagError, Result};
use crate::store_index::LoadedIndex;

/// Returns up to `k` chunk texts most similar to `query`, best first.
pub fn retrieve_top(
    embedder: &dyn Embedder,
    loaded: &LoadedIndex,
    query: &str,
    k: usize,
) -> Result<Vec<String>> {
    let model_id = embedder.model_id();
    if loaded.index.model_id() != model_id {
        return Err(RagError::Index(format!(
            "index was built with '{}' but queries use '{}'; run ingest again",
            loaded.index.model_id(),
            model_id
        )));
    }
    let query_vec = embed_query(embedder, query)?;
    let hits = loaded.index.search(&query_vec, k)?;
    let chunks: Vec<String> = hits
        .into_iter()
        .flatten()
        .filter_map(|n| loaded.chunks.get(n.id).cloned())
        .collect();
    debug!(k, hits = chunks.len(), "retrieved chunks");
    Ok(chunks)
}
