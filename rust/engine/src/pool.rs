use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::cards::{full_pool, Card};
use crate::errors::GameError;

/// RNG owned by a match. Seeded so a whole match can be replayed.
pub type MatchRng = ChaCha20Rng;

pub fn seeded_rng(seed: u64) -> MatchRng {
    ChaCha20Rng::seed_from_u64(seed)
}

/// Templates that new card instances are drawn from.
///
/// Draws are with replacement: the same template can be dealt any number of
/// times, each draw becoming a distinct entity in the registry.
#[derive(Debug, Clone)]
pub struct CardPool {
    templates: Vec<Card>,
}

impl CardPool {
    pub fn standard() -> Self {
        Self {
            templates: full_pool(),
        }
    }

    pub fn from_templates(templates: Vec<Card>) -> Result<Self, GameError> {
        if templates.is_empty() {
            return Err(GameError::EmptyPool);
        }
        Ok(Self { templates })
    }

    pub fn templates(&self) -> &[Card] {
        &self.templates
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Card {
        // non-empty by construction
        self.templates[rng.random_range(0..self.templates.len())]
    }

    pub fn contains(&self, card: &Card) -> bool {
        self.templates.contains(card)
    }
}

impl Default for CardPool {
    fn default() -> Self {
        Self::standard()
    }
}
