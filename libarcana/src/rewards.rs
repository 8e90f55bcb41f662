//! Quiz reward tiers

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reward {
    pub experience: u64,
    pub coins: u64,
}

/// Bands as (lower bound, experience, coins), highest first
const BANDS: [(f64, u64, u64); 5] = [
    (90.0, 50, 10),
    (80.0, 40, 8),
    (70.0, 30, 6),
    (60.0, 20, 4),
    (50.0, 10, 2),
];

const FLOOR_REWARD: Reward = Reward {
    experience: 5,
    coins: 1,
};

/// Map a quiz percentage (0..=100) to its reward
///
/// Each band includes its lower bound; anything under 50, NaN included,
/// earns the floor reward.
pub fn rewards_for(percentage: f64) -> Reward {
    BANDS
        .iter()
        .find(|(lower, _, _)| percentage >= *lower)
        .map(|&(_, experience, coins)| Reward { experience, coins })
        .unwrap_or(FLOOR_REWARD)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reward(experience: u64, coins: u64) -> Reward {
        Reward { experience, coins }
    }

    #[test]
    fn test_band_boundaries_belong_to_higher_band() {
        assert_eq!(rewards_for(90.0), reward(50, 10));
        assert_eq!(rewards_for(80.0), reward(40, 8));
        assert_eq!(rewards_for(70.0), reward(30, 6));
        assert_eq!(rewards_for(60.0), reward(20, 4));
        assert_eq!(rewards_for(50.0), reward(10, 2));
    }

    #[test]
    fn test_just_below_boundaries() {
        assert_eq!(rewards_for(89.9), reward(40, 8));
        assert_eq!(rewards_for(79.99), reward(30, 6));
        assert_eq!(rewards_for(49.9), reward(5, 1));
    }

    #[test]
    fn test_extremes() {
        assert_eq!(rewards_for(100.0), reward(50, 10));
        assert_eq!(rewards_for(0.0), reward(5, 1));
        assert_eq!(rewards_for(f64::NAN), reward(5, 1));
    }

    #[test]
    fn test_monotonic_across_range() {
        let mut previous = rewards_for(0.0);
        for tenth in 0..=1000 {
            let current = rewards_for(f64::from(tenth) / 10.0);
            assert!(current.experience >= previous.experience);
            assert!(current.coins >= previous.coins);
            previous = current;
        }
    }
}
