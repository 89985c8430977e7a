//! Vector math shared by the indexer (storage time) and the searcher (query time)

use super::EmbeddingError;

/// Vectors with a norm below this are treated as degenerate
const MIN_NORM: f32 = 1e-12;

/// Euclidean length of a vector
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Return a unit-length copy of `v`.
///
/// Fails on empty, non-finite or zero vectors since none of them has a
/// direction to preserve.
pub fn normalized(v: &[f32]) -> Result<Vec<f32>, EmbeddingError> {
    if v.is_empty() {
        return Err(EmbeddingError::InvalidInput("Empty vector".to_string()));
    }

    let norm = l2_norm(v);
    if !norm.is_finite() || norm < MIN_NORM {
        return Err(EmbeddingError::DegenerateVector(norm));
    }

    Ok(v.iter().map(|x| x / norm).collect())
}

/// Dot product; equals cosine similarity when both inputs are unit length
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
