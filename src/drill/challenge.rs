use tracing::info;

use crate::config::ChallengeSettings;

/// Speed ladder: a run of correct answers raises the speed, a miss drops it back
#[derive(Clone, Debug)]
pub struct ChallengeLadder {
    settings: ChallengeSettings,
    level: u32,
    streak: u32,
}

impl ChallengeLadder {
    pub fn new(settings: ChallengeSettings) -> Self {
        Self {
            settings,
            level: 1,
            streak: 0,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    /// Factor applied to the base speed at the current level
    pub fn speed_multiplier(&self) -> f64 {
        let raw = 1.0 + (self.level - 1) as f64 * self.settings.speed_step;
        raw.min(self.settings.max_multiplier)
    }

    /// Update the ladder. Returns true when the level changed.
    pub fn record(&mut self, correct: bool) -> bool {
        if correct {
            self.streak += 1;
            if self.streak >= self.settings.streak_threshold {
                self.level += 1;
                self.streak = 0;
                info!(
                    "Challenge level {} (x{:.1} speed)",
                    self.level,
                    self.speed_multiplier()
                );
                return true;
            }
            false
        } else {
            let changed = self.level != 1;
            self.reset();
            changed
        }
    }

    pub fn reset(&mut self) {
        self.level = 1;
        self.streak = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_up_after_streak() {
        let mut ladder = ChallengeLadder::new(ChallengeSettings::default());
        for _ in 0..4 {
            assert!(!ladder.record(true));
        }
        assert_eq!(ladder.level(), 1);
        assert!(ladder.record(true));
        assert_eq!(ladder.level(), 2);
        assert_eq!(ladder.streak(), 0);
        assert!((ladder.speed_multiplier() - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_miss_resets() {
        let mut ladder = ChallengeLadder::new(ChallengeSettings::default());
        for _ in 0..12 {
            ladder.record(true);
        }
        assert_eq!(ladder.level(), 3);
        assert!(ladder.record(false));
        assert_eq!(ladder.level(), 1);
        assert_eq!(ladder.streak(), 0);
        assert_eq!(ladder.speed_multiplier(), 1.0);
        // Missing at level 1 changes nothing
        assert!(!ladder.record(false));
    }

    #[test]
    fn test_multiplier_is_capped() {
        let mut ladder = ChallengeLadder::new(ChallengeSettings::default());
        for _ in 0..500 {
            ladder.record(true);
        }
        assert_eq!(ladder.speed_multiplier(), 2.0);
    }
}
