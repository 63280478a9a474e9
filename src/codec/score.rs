//! Order-preserving transform between sorted-set scores and `u64`.
//!
//! Scores are fixed-point with five decimal digits. The scaled value is
//! offset by half the `u64` range, so negative scores sort before positive
//! ones under unsigned big-endian comparison. Precision past the fifth
//! decimal is dropped: scores that differ only there encode identically.

/// Offset added to the scaled score.
pub const SCORE_SHIFT: u64 = 1 << 63;

/// Fixed-point scale factor.
pub const SCORE_SCALE: f64 = 100_000.0;

/// Largest magnitude whose scaled value still fits the signed range.
pub const MAX_SCORE: f64 = (i64::MAX as f64) / SCORE_SCALE;

/// Encode `score`. Values outside `±MAX_SCORE` saturate; NaN encodes as 0.0.
pub fn encode_score(score: f64) -> u64 {
    // `as` saturates and maps NaN to zero.
    let scaled = (score * SCORE_SCALE).round() as i64;
    (scaled as u64).wrapping_add(SCORE_SHIFT)
}

pub fn decode_score(encoded: u64) -> f64 {
    encoded.wrapping_sub(SCORE_SHIFT) as i64 as f64 / SCORE_SCALE
}

/// True when `score` survives [`encode_score`] without saturating.
pub fn is_encodable(score: f64) -> bool {
    score.is_finite() && score.abs() < MAX_SCORE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_shift() {
        assert_eq!(encode_score(0.0), SCORE_SHIFT);
        assert_eq!(encode_score(-0.0), SCORE_SHIFT);
    }

    #[test]
    fn test_ordering() {
        let scores = [-1e9, -1.0, -0.00001, 0.0, 0.00001, 1.0, 2.5, 1e9];
        let encoded: Vec<u64> = scores.iter().map(|s| encode_score(*s)).collect();
        for pair in encoded.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        // byte order agrees with numeric order
        assert!(encode_score(-1.0).to_be_bytes() < encode_score(1.0).to_be_bytes());
    }

    #[test]
    fn test_round_trip_precision() {
        for s in [0.0, 1.5, -3.25, 123456.78901, -0.00001] {
            assert!((decode_score(encode_score(s)) - s).abs() <= 1e-5);
        }
    }

    #[test]
    fn test_precision_collapse() {
        assert_eq!(encode_score(1.000001), encode_score(1.000002));
    }

    #[test]
    fn test_encodable_range() {
        assert!(is_encodable(1e13));
        assert!(!is_encodable(1e14));
        assert!(!is_encodable(f64::NAN));
        assert!(!is_encodable(f64::INFINITY));
    }
}
