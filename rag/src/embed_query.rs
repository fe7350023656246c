use crate::backend::Embedder;
use crate::error::{RagError, Result};
use crate::vector_index::normalize;

/// Embeds a single query the same way chunks are embedded at build time.
pub fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let mut vec = embedder
        .embed_texts(&[text.to_string()])?
        .into_iter()
        .next()
        .ok_or_else(|| RagError::ExternalService("embedder returned no vector for query".to_string()))?;
    normalize(&mut vec);
    Ok(vec)
}
