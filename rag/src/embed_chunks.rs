use tracing::debug;

use crate::backend::Embedder;
use crate::error::{RagError, Result};
use crate::vector_index::normalize;

/// Embeds every chunk and scales each vector to unit length, so that inner
/// product search behaves like cosine similarity.
pub fn embed_chunks(embedder: &dyn Embedder, chunks: &[String]) -> Result<Vec<Vec<f32>>> {
    let mut vectors = embedder.embed_texts(chunks)?;
    if vectors.len() != chunks.len() {
        return Err(RagError::ExternalService(format!(
            "embedder returned {} vectors for {} chunks",
            vectors.len(),
            chunks.len()
        )));
    }
    for v in vectors.iter_mut() {
        normalize(v);
    }
    debug!(count = vectors.len(), "embedded chunks");
    Ok(vectors)
}
