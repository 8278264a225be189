//! Vector similarity scoring.

/// Calculate cosine similarity between two equal-length vectors.
///
/// Returns `0.0` when either vector has zero magnitude, so a degenerate
/// embedding ranks as unrelated instead of producing `NaN`. Vectors of
/// different lengths also score `0.0`; callers validate dimensionality first.
/// The result is clamped to `[-1.0, 1.0]` to absorb rounding drift.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "cosine similarity on mismatched dimensions");
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_nan() {
        0.0
    } else {
        score.clamp(-1.0, 1.0)
    }
}

/// Euclidean (L2) magnitude of a vector.
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale a vector to unit length in place; zero vectors are left untouched.
pub fn normalize_in_place(v: &mut [f32]) {
    let norm = magnitude(v);
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
