//! Exact inner-product index over unit vectors.
//!
//! Vectors are stored in insertion order and a vector's position is its ID,
//! which is what keeps the index aligned with the chunk list.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Scales `v` to unit length in place. Zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub id: usize,
    pub score: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlatIndex {
    dim: usize,
    /// Embedding model the vectors came from.
    model_id: String,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dim: usize, model_id: impl Into<String>) -> Self {
        Self {
            dim,
            model_id: model_id.into(),
            vectors: Vec::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn add(&mut self, vector: Vec<f32>) -> Result<usize> {
        self.check_dim(vector.len())?;
        self.vectors.push(vector);
        Ok(self.vectors.len() - 1)
    }

    /// Returns exactly `k` slots ranked by inner product, best first.
    /// Slots past the number of stored vectors are `None`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Option<Neighbor>>> {
        self.check_dim(query.len())?;
        let mut scored: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, v)| Neighbor {
                id,
                score: dot(v, query),
            })
            .collect();
        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);

        let mut out: Vec<Option<Neighbor>> = scored.into_iter().map(Some).collect();
        out.resize(k, None);
        Ok(out)
    }

    /// Verifies every stored vector against `dim`. Needed after
    /// deserializing, since `add` is bypassed there.
    pub(crate) fn check_vectors(&self) -> Result<()> {
        self.vectors.iter().try_for_each(|v| self.check_dim(v.len()))
    }

    fn check_dim(&self, got: usize) -> Result<()> {
        if got != self.dim {
            return Err(RagError::Index(format!(
                "vector dimension {} does not match index dimension {}",
                got, self.dim
            )));
        }
        Ok(())
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_yields_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn search_ranks_and_pads_with_none() {
        let mut index = FlatIndex::new(2, "test");
        index.add(vec![1.0, 0.0]).expect("add");
        index.add(vec![0.0, 1.0]).expect("add");

        let hits = index.search(&[0.0, 1.0], 4).expect("search");
        assert_eq!(hits.len(), 4);
        assert_eq!(hits[0].map(|n| n.id), Some(1));
        assert_eq!(hits[1].map(|n| n.id), Some(0));
        assert!(hits[2].is_none() && hits[3].is_none());
    }

    #[test]
    fn rejects_wrong_dimension() {
        let mut index = FlatIndex::new(3, "test");
        assert!(index.add(vec![1.0]).is_err());
        assert!(index.search(&[1.0, 0.0], 1).is_err());
    }

    #[test]
    fn deserialized_vectors_are_checked_against_dim() {
        let ok: FlatIndex =
            serde_json::from_str(r#"{"dim":2,"model_id":"t","vectors":[[1.0,0.0]]}"#)
                .expect("deserialize");
        assert!(ok.check_vectors().is_ok());

        let long: FlatIndex =
            serde_json::from_str(r#"{"dim":2,"model_id":"t","vectors":[[1.0,0.0,0.5]]}"#)
                .expect("deserialize");
        assert!(long.check_vectors().is_err());
    }
}
