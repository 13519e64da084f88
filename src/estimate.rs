//! Expected-attempt estimates for a compiled prefix.
//!
//! The admissible measure `S` is the number of 32-byte keys inside the
//! range cover (overlaps double-count, which only makes the estimates
//! conservative). For success probability `p` under independent uniform
//! draws the attempt count is `ceil(-ln(1-p) * 2^256 / S)`; the thresholds
//! `-ln(1-p)` are carried as 64-bit fixed-point fractions of 2^64, so the
//! quotient `threshold * 2^192 / S` already has the 2^256 numerator folded
//! in and its low 64 bits are the answer.

use num_bigint::BigUint;

use crate::matcher::PubkeyRange;

// -ln(1 - p) scaled by 2^64: ln 2, ln 10, ln 100.
const P50_THRESHOLD: u64 = 0x8000_0000_0000_0000;
const P90_THRESHOLD: u64 = 0xE666_6666_6666_6666;
const P99_THRESHOLD: u64 = 0xFD70_A3D7_0A3D_70A3;

/// Attempt counts at which the probability of at least one match reaches
/// 50%, 90% and 99%. Purely advisory; computed once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfidenceEstimates {
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
}

impl ConfidenceEstimates {
    pub fn for_ranges(ranges: &[PubkeyRange]) -> Self {
        let mut measure = BigUint::from(0u32);
        for range in ranges {
            measure += BigUint::from_bytes_be(&range.max) - BigUint::from_bytes_be(&range.min)
                + BigUint::from(1u32);
        }
        Self {
            p50: attempts_for(P50_THRESHOLD, &measure),
            p90: attempts_for(P90_THRESHOLD, &measure),
            p99: attempts_for(P99_THRESHOLD, &measure),
        }
    }
}

/// `floor(threshold * 2^192 / measure)`, saturating when the quotient does
/// not fit in 64 bits (tiny measures, e.g. a single-key range).
fn attempts_for(threshold: u64, measure: &BigUint) -> u64 {
    let quotient = (BigUint::from(threshold) << 192usize) / measure;
    u64::try_from(quotient).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: [u8; 32], max: [u8; 32]) -> PubkeyRange {
        PubkeyRange { min, max }
    }

    #[test]
    fn measure_of_2_pow_192_reproduces_the_thresholds() {
        // top 8 bytes zero, the rest free: exactly 2^192 keys
        let mut max = [0xFFu8; 32];
        max[..8].fill(0);
        let estimates = ConfidenceEstimates::for_ranges(&[range([0u8; 32], max)]);
        assert_eq!(estimates.p50, P50_THRESHOLD);
        assert_eq!(estimates.p90, P90_THRESHOLD);
        assert_eq!(estimates.p99, P99_THRESHOLD);
    }

    #[test]
    fn single_key_range_saturates() {
        let estimates = ConfidenceEstimates::for_ranges(&[range([7u8; 32], [7u8; 32])]);
        assert_eq!(estimates.p50, u64::MAX);
        assert_eq!(estimates.p90, u64::MAX);
        assert_eq!(estimates.p99, u64::MAX);
    }

    #[test]
    fn estimates_are_ordered() {
        let matcher = crate::matcher::Matcher::compile("ab").unwrap();
        let estimates = ConfidenceEstimates::for_ranges(matcher.ranges());
        assert!(estimates.p50 <= estimates.p90);
        assert!(estimates.p90 <= estimates.p99);
        assert!(estimates.p50 > 0);
    }

    #[test]
    fn full_keyspace_needs_roughly_one_attempt() {
        let estimates = ConfidenceEstimates::for_ranges(&[range([0u8; 32], [0xFFu8; 32])]);
        // 2^256 keys: the fixed-point quotient rounds down to zero
        assert!(estimates.p50 <= 1);
    }
}
