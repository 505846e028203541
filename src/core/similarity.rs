/// Cosine similarity between two equal-length vectors
///
/// Accumulates in f64 so identical inputs produce exactly 1.0.
///
/// # Returns
/// `None` when the vectors are empty, differ in length, have zero norm,
/// or contain non-finite values. Otherwise a value in [-1, 1].
pub fn cosine_similarity(lhs: &[f32], rhs: &[f32]) -> Option<f64> {
    if lhs.is_empty() || lhs.len() != rhs.len() {
        return None;
    }

    let mut dot = 0.0_f64;
    let mut lhs_norm_sq = 0.0_f64;
    let mut rhs_norm_sq = 0.0_f64;

    for (&l, &r) in lhs.iter().zip(rhs.iter()) {
        let (l, r) = (l as f64, r as f64);
        dot += l * r;
        lhs_norm_sq += l * l;
        rhs_norm_sq += r * r;
    }

    if !dot.is_finite() || !lhs_norm_sq.is_finite() || !rhs_norm_sq.is_finite() {
        return None;
    }
    if lhs_norm_sq == 0.0 || rhs_norm_sq == 0.0 {
        return None;
    }

    // sqrt(a * b) keeps sqrt(s * s) == s, so a vector against itself is exactly 1
    Some((dot / (lhs_norm_sq * rhs_norm_sq).sqrt()).clamp(-1.0, 1.0))
}

/// Standard cosine distance, `1 - cosine_similarity`, in [0, 2]
#[inline]
pub fn cosine_distance(lhs: &[f32], rhs: &[f32]) -> Option<f64> {
    cosine_similarity(lhs, rhs).map(|similarity| 1.0 - similarity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors() {
        let v = vec![0.12_f32, -0.5, 0.33, 0.91, 0.07];
        assert_eq!(cosine_similarity(&v, &v), Some(1.0));
        assert_eq!(cosine_distance(&v, &v), Some(0.0));
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        let x = [1.0_f32, 0.0];
        let y = [0.0_f32, 1.0];
        let neg_x = [-1.0_f32, 0.0];

        assert_eq!(cosine_similarity(&x, &y), Some(0.0));
        assert_eq!(cosine_similarity(&x, &neg_x), Some(-1.0));
        assert_eq!(cosine_distance(&x, &neg_x), Some(2.0));
    }

    #[test]
    fn test_scale_invariance() {
        let a = [1.0_f32, 2.0, 3.0];
        let b = [2.0_f32, 4.0, 6.0];
        let similarity = cosine_similarity(&a, &b).unwrap();
        assert!((similarity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), None);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), None);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), None);
        assert_eq!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 2.0]), None);
        assert_eq!(cosine_similarity(&[f32::INFINITY, 1.0], &[1.0, 2.0]), None);
    }
}
