use super::types::ResolutionTier;
use terrabake_core::{BakeError, BakeResult};

/// Maps the longest bounding-box side to a texture tier.
///
/// An extent strictly greater than `thresholds[i]` reaches tier `i + 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolutionPolicy {
    thresholds: [f32; 5],
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            thresholds: [20.0, 40.0, 80.0, 160.0, 320.0],
        }
    }
}

impl ResolutionPolicy {
    pub fn new(thresholds: [f32; 5]) -> BakeResult<Self> {
        if thresholds.iter().any(|t| !t.is_finite()) {
            return Err(BakeError::InvalidState(format!("non-finite resolution threshold in {:?}", thresholds)));
        }
        if thresholds.windows(2).any(|w| w[1] < w[0]) {
            return Err(BakeError::InvalidState(format!(
                "resolution thresholds must not decrease: {:?}",
                thresholds
            )));
        }
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> [f32; 5] {
        self.thresholds
    }

    pub fn tier(&self, max_extent: f32) -> ResolutionTier {
        // NaN compares false against every threshold and lands on the smallest tier.
        let reached = self.thresholds.iter().filter(|&&t| max_extent > t).count();
        ResolutionTier::ALL[reached]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tiers() {
        let policy = ResolutionPolicy::default();
        assert_eq!(policy.tier(0.0), ResolutionTier::R128);
        assert_eq!(policy.tier(20.0), ResolutionTier::R128);
        assert_eq!(policy.tier(20.5), ResolutionTier::R256);
        assert_eq!(policy.tier(30.0), ResolutionTier::R256);
        assert_eq!(policy.tier(200.0), ResolutionTier::R2048);
        assert_eq!(policy.tier(320.0), ResolutionTier::R2048);
        assert_eq!(policy.tier(400.0), ResolutionTier::R4096);
        assert_eq!(policy.tier(-5.0), ResolutionTier::R128);
        assert_eq!(policy.tier(f32::NAN), ResolutionTier::R128);
        assert_eq!(policy.tier(f32::INFINITY), ResolutionTier::R4096);
    }

    #[test]
    fn tier_is_monotonic() {
        let policy = ResolutionPolicy::default();
        let mut previous = policy.tier(0.0);
        for step in 0..2000 {
            let tier = policy.tier(step as f32 * 0.25);
            assert!(tier >= previous, "tier dropped at {}", step as f32 * 0.25);
            previous = tier;
        }
    }

    #[test]
    fn rejects_decreasing_thresholds() {
        assert!(ResolutionPolicy::new([10.0, 5.0, 20.0, 30.0, 40.0]).is_err());
        assert!(ResolutionPolicy::new([1.0, 1.0, 2.0, 3.0, f32::NAN]).is_err());
        let custom = ResolutionPolicy::new([1.0, 2.0, 4.0, 8.0, 16.0]).unwrap();
        assert_eq!(custom.tier(5.0), ResolutionTier::R1024);
    }
}
