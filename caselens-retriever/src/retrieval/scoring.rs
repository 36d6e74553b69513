//! Per-query confidence scoring.
//!
//! Raw k-NN distances have no fixed scale, so they are turned into a percentage by
//! min-max scaling over the results of a single query:
//!
//! ```text
//! confidence = 100 * (1 - (d - d_min) / (d_max - d_min))    when d_max > d_min
//! confidence = 100                                          otherwise
//! ```
//!
//! The closest result of every query scores 100 and the farthest scores 0, however
//! near or far they are in absolute terms. A confidence therefore only ranks
//! results *within* one query. It is not a probability, and two queries'
//! confidences cannot be compared.

/// Confidence for each distance, in input order. Always within `[0, 100]`.
pub fn min_max_confidence(distances: &[f32]) -> Vec<f32> {
    let finite = distances.iter().copied().filter(|d| d.is_finite());
    let (min, max) = finite.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), d| {
        (lo.min(d), hi.max(d))
    });

    let range = max - min;
    let degenerate = !range.is_finite() || range <= 0.0;
    distances
        .iter()
        .map(|&d| {
            if degenerate {
                return 100.0;
            }
            if !d.is_finite() {
                return 0.0;
            }
            (100.0 * (1.0 - (d - min) / range)).clamp(0.0, 100.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_scaling() {
        let scores = min_max_confidence(&[1.0, 2.0, 5.0]);
        assert_eq!(scores, vec![100.0, 75.0, 0.0]);
    }

    #[test]
    fn test_equal_distances_are_all_100() {
        assert_eq!(min_max_confidence(&[0.7, 0.7, 0.7]), vec![100.0; 3]);
        assert_eq!(min_max_confidence(&[3.0]), vec![100.0]);
        assert!(min_max_confidence(&[]).is_empty());
    }

    #[test]
    fn test_scores_stay_in_bounds() {
        let distances = [0.0, 1e-7, 0.31, 12.5, 12.5, 1e6];
        for score in min_max_confidence(&distances) {
            assert!((0.0..=100.0).contains(&score), "{score} out of range");
        }
    }

    #[test]
    fn test_non_finite_distances() {
        let scores = min_max_confidence(&[1.0, f32::NAN, 3.0]);
        assert_eq!(scores, vec![100.0, 0.0, 0.0]);
    }
}
