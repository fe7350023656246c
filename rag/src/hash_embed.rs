use std::hash::{Hash, Hasher};

use twox_hash::XxHash64;

use crate::backend::Embedder;
use crate::error::Result;

/// Deterministic bag-of-words embedder using the hashing trick.
///
/// Quality is far below a trained model but it needs no network or weights,
/// which makes it suitable for tests and air-gapped smoke runs.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            // Top bit picks the sign so collisions tend to cancel out.
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn model_id(&self) -> String {
        format!("hash:{}", self.dim)
    }

    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_vector() {
        let e = HashEmbedder::new(64);
        assert_eq!(e.embed_one("Hello, world"), e.embed_one("hello world"));
        assert_ne!(e.embed_one("hello world"), e.embed_one("goodbye moon"));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let e = HashEmbedder::new(8);
        assert!(e.embed_one("  ").iter().all(|x| *x == 0.0));
    }
}
