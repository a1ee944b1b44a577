use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SimilarityError {
    #[error("Vector dimensions must match: {0} != {1}")]
    DimensionMismatch(usize, usize),

    #[error("Vectors cannot be empty")]
    Empty,

    #[error("Similarity is not a finite number")]
    NonFinite,
}

/// Cosine similarity between two embedding vectors, in [-1.0, 1.0].
/// A zero-magnitude vector is similar to nothing (0.0).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch(a.len(), b.len()));
    }

    if a.is_empty() {
        return Err(SimilarityError::Empty);
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !similarity.is_finite() {
        return Err(SimilarityError::NonFinite);
    }

    // Clamp to absorb floating point drift
    Ok(similarity.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors() {
        let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_scale_invariant() {
        let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[10.0, 20.0, 30.0]).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-6);
        let opposite = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap();
        assert!((opposite + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch() {
        assert_eq!(
            cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]),
            Err(SimilarityError::DimensionMismatch(2, 3))
        );
        assert_eq!(cosine_similarity(&[], &[]), Err(SimilarityError::Empty));
    }

    #[test]
    fn test_non_finite_components() {
        assert_eq!(
            cosine_similarity(&[f32::INFINITY, 0.0], &[1.0, 0.0]),
            Err(SimilarityError::NonFinite)
        );
        assert_eq!(
            cosine_similarity(&[f32::NAN, 1.0], &[1.0, 0.0]),
            Err(SimilarityError::NonFinite)
        );
    }

    #[test]
    fn test_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
    }
}
