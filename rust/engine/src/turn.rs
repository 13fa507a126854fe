use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::player::{Player, Seat};
use crate::pool::CardPool;
use crate::registry::{CardId, CardRegistry, EntityKind, Zone};

/// Per-seat commit state for the current round.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TurnState {
    pub has_played: bool,
    pub played_card: Option<CardId>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PlayOutcome {
    Accepted,
    RejectedAlreadyPlayed,
}

/// A play made by the round clock on behalf of a player who ran out of time.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ForcedPlay {
    pub card: CardId,
    /// The player had nothing eligible, so the card was created from the pool.
    pub synthesized: bool,
}

/// Tracks, for both seats, whether a card was committed this round and which.
///
/// Commands are handled one at a time by the owning match, so the
/// check-then-set in [`TurnCoordinator::submit_play`] needs no locking.
#[derive(Debug, Clone, Default)]
pub struct TurnCoordinator {
    slots: [TurnState; 2],
}

impl TurnCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commits `card` for `seat`. A second commit in the same round is
    /// refused and leaves the first one in place.
    pub fn submit_play(&mut self, seat: Seat, card: CardId) -> PlayOutcome {
        let slot = &mut self.slots[seat.index()];
        if slot.has_played {
            tracing::debug!(?seat, card = %card, "rejected play: already played this round");
            return PlayOutcome::RejectedAlreadyPlayed;
        }
        slot.has_played = true;
        slot.played_card = Some(card);
        PlayOutcome::Accepted
    }

    pub fn has_played(&self, seat: Seat) -> bool {
        self.slots[seat.index()].has_played
    }

    pub fn current_played_card(&self, seat: Seat) -> Option<CardId> {
        self.slots[seat.index()].played_card
    }

    pub fn state(&self, seat: Seat) -> TurnState {
        self.slots[seat.index()]
    }

    pub fn clear_for_next_round(&mut self, seat: Seat) {
        self.slots[seat.index()] = TurnState::default();
    }

    pub fn reset_all(&mut self) {
        for seat in Seat::ALL {
            self.clear_for_next_round(seat);
        }
    }

    pub fn all_committed(&self) -> bool {
        self.slots.iter().all(|s| s.has_played)
    }
}

/// Plays a card for `seat` when its player has not committed one.
///
/// The card is picked uniformly among the player's battle cards still in
/// their hand zone. With nothing eligible, a fresh card is drawn from the
/// pool and staged directly. Returns `None` when the seat already played.
pub fn force_random_play<R: Rng + ?Sized>(
    turns: &mut TurnCoordinator,
    seat: Seat,
    player: &mut Player,
    registry: &mut CardRegistry,
    pool: &CardPool,
    rng: &mut R,
) -> Option<ForcedPlay> {
    if turns.has_played(seat) {
        return None;
    }

    let eligible: Vec<CardId> = player
        .hand()
        .iter()
        .copied()
        .filter(|id| {
            registry
                .get(*id)
                .map(|e| !e.is_helper() && e.zone == Zone::Hand)
                .unwrap_or(false)
        })
        .collect();

    let forced = match eligible.choose(rng) {
        Some(&card) => ForcedPlay {
            card,
            synthesized: false,
        },
        None => {
            let template = pool.draw(rng);
            let card = registry.spawn(player.id(), EntityKind::Battle(template), Zone::Hand);
            player.give_card(card);
            tracing::warn!(
                player = %player.id(),
                card = %card,
                "no eligible card for forced play, synthesized one from the pool"
            );
            ForcedPlay {
                card,
                synthesized: true,
            }
        }
    };

    registry.move_to(forced.card, Zone::PlayArea);
    match turns.submit_play(seat, forced.card) {
        PlayOutcome::Accepted => Some(forced),
        PlayOutcome::RejectedAlreadyPlayed => None,
    }
}
