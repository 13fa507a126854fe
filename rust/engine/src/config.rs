use std::time::Duration;

use crate::errors::GameError;

/// Largest battle hand a match may deal: one card per pool template.
pub const MAX_HAND_SIZE: usize = 36;
/// Largest number of helper cards dealt to each player.
pub const MAX_HELPER_CARDS: usize = 3;

/// Timing and dealing parameters of one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchConfig {
    pub round_duration: Duration,
    /// Delay between resolution and destruction of the played cards.
    pub cleanup_delay: Duration,
    /// Delay between card cleanup and the next round.
    pub next_round_delay: Duration,
    pub initial_hand_size: usize,
    pub helper_cards_per_player: usize,
    /// Pause after the match is decided before logical state is reset.
    pub display_grace: Duration,
    /// Pause between the teardown warning and entity destruction.
    pub prepare_grace: Duration,
    /// Pause between entity destruction and the final re-sync.
    pub destruction_grace: Duration,
    /// End the round as soon as both players committed a card.
    pub resolve_when_all_committed: bool,
    pub seed: Option<u64>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            round_duration: Duration::from_secs(15),
            cleanup_delay: Duration::from_secs(1),
            next_round_delay: Duration::from_secs(1),
            initial_hand_size: 5,
            helper_cards_per_player: MAX_HELPER_CARDS,
            display_grace: Duration::from_secs(3),
            prepare_grace: Duration::from_secs(1),
            destruction_grace: Duration::from_secs(1),
            resolve_when_all_committed: true,
            seed: None,
        }
    }
}

impl MatchConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if self.round_duration.is_zero() {
            return Err(GameError::InvalidConfig(
                "round_duration must be greater than zero".to_string(),
            ));
        }
        if self.initial_hand_size == 0 || self.initial_hand_size > MAX_HAND_SIZE {
            return Err(GameError::InvalidConfig(format!(
                "initial_hand_size must be between 1 and {MAX_HAND_SIZE}"
            )));
        }
        if self.helper_cards_per_player > MAX_HELPER_CARDS {
            return Err(GameError::InvalidConfig(format!(
                "helper_cards_per_player must be at most {MAX_HELPER_CARDS}"
            )));
        }
        Ok(())
    }

    /// Time from the match being decided to the reset-complete signal.
    pub fn reset_span(&self) -> Duration {
        self.display_grace + self.prepare_grace + self.destruction_grace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = MatchConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.reset_span(), Duration::from_secs(5));
    }

    #[test]
    fn zero_round_or_hand_is_rejected() {
        let cfg = MatchConfig {
            round_duration: Duration::ZERO,
            ..MatchConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(GameError::InvalidConfig(_))));

        let cfg = MatchConfig {
            initial_hand_size: 0,
            ..MatchConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn hand_and_helper_counts_are_capped() {
        let cfg = MatchConfig {
            initial_hand_size: usize::MAX,
            ..MatchConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(GameError::InvalidConfig(_))));

        let cfg = MatchConfig {
            initial_hand_size: MAX_HAND_SIZE,
            helper_cards_per_player: 0,
            ..MatchConfig::default()
        };
        assert!(cfg.validate().is_ok());

        let cfg = MatchConfig {
            helper_cards_per_player: MAX_HELPER_CARDS + 1,
            ..MatchConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
