// Probability Blending
// Combines the local heuristic with up to two oracle estimates using a fixed,
// availability-dependent weight table. Oracles outweigh the heuristic when present.

use crate::models::ProbabilityEstimate;

/// Weights applied as (primary, secondary, heuristic).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendWeights {
    pub primary: f64,
    pub secondary: f64,
    pub heuristic: f64,
}

const BOTH: BlendWeights = BlendWeights {
    primary: 0.60,
    secondary: 0.25,
    heuristic: 0.15,
};
const PRIMARY_ONLY: BlendWeights = BlendWeights {
    primary: 0.70,
    secondary: 0.0,
    heuristic: 0.30,
};
const SECONDARY_ONLY: BlendWeights = BlendWeights {
    primary: 0.0,
    secondary: 0.60,
    heuristic: 0.40,
};
const HEURISTIC_ONLY: BlendWeights = BlendWeights {
    primary: 0.0,
    secondary: 0.0,
    heuristic: 1.0,
};

/// Select the weight row for the oracles that actually answered.
pub fn weights_for(has_primary: bool, has_secondary: bool) -> BlendWeights {
    match (has_primary, has_secondary) {
        (true, true) => BOTH,
        (true, false) => PRIMARY_ONLY,
        (false, true) => SECONDARY_ONLY,
        (false, false) => HEURISTIC_ONLY,
    }
}

/// Blend into a single AI probability, always within [0, 1].
///
/// `primary` is the labeled-classification oracle, `secondary` the JSON-verdict oracle.
pub fn blend(
    heuristic: f64,
    primary: ProbabilityEstimate,
    secondary: ProbabilityEstimate,
) -> f64 {
    let heuristic = if heuristic.is_nan() { 0.0 } else { heuristic };
    let w = weights_for(primary.is_some(), secondary.is_some());
    let value = w.primary * primary.map_or(0.0, |p| p.value())
        + w.secondary * secondary.map_or(0.0, |p| p.value())
        + w.heuristic * heuristic;
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Probability;

    fn p(v: f64) -> ProbabilityEstimate {
        Probability::new(v)
    }

    #[test]
    fn test_heuristic_only_is_clamped_identity() {
        assert_eq!(blend(0.37, None, None), 0.37);
        assert_eq!(blend(1.4, None, None), 1.0);
        assert_eq!(blend(-0.2, None, None), 0.0);
    }

    #[test]
    fn test_both_oracles() {
        let v = blend(0.2, p(0.9), p(0.5));
        assert!((v - (0.6 * 0.9 + 0.25 * 0.5 + 0.15 * 0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_primary_only() {
        let v = blend(0.5, p(1.0), None);
        assert!((v - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_secondary_only() {
        let v = blend(0.5, None, p(0.0));
        assert!((v - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_unavailable_is_not_zero() {
        // A real zero from an oracle changes the weights; absence does not.
        assert_ne!(blend(0.8, p(0.0), None), blend(0.8, None, None));
    }

    #[test]
    fn test_blend_always_in_range() {
        let heuristics = [-5.0, 0.0, 0.12, 0.5, 1.0, 7.0, f64::NAN];
        let oracles = [None, p(0.0), p(0.33), p(1.0)];
        for h in heuristics {
            for a in oracles {
                for b in oracles {
                    let v = blend(h, a, b);
                    assert!((0.0..=1.0).contains(&v), "blend({}, {:?}, {:?}) = {}", h, a, b, v);
                }
            }
        }
    }

    #[test]
    fn test_weight_rows_sum_to_one() {
        for (a, b) in [(true, true), (true, false), (false, true), (false, false)] {
            let w = weights_for(a, b);
            assert!((w.primary + w.secondary + w.heuristic - 1.0).abs() < 1e-12);
        }
    }
}
