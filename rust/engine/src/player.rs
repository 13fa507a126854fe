use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::registry::CardId;

/// Opaque connection handle identifying a player within a match.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(u64);

impl PlayerId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player-{}", self.0)
    }
}

/// One of the two slots at the table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    pub const ALL: [Seat; 2] = [Seat::First, Seat::Second];

    pub fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }
}

/// A seated player: their battle hand and helper cards, both by handle.
/// The entities themselves live in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    id: PlayerId,
    hand: BTreeSet<CardId>,
    helpers: BTreeSet<CardId>,
}

impl Player {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            hand: BTreeSet::new(),
            helpers: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn hand(&self) -> &BTreeSet<CardId> {
        &self.hand
    }

    pub fn helpers(&self) -> &BTreeSet<CardId> {
        &self.helpers
    }

    pub fn give_card(&mut self, card: CardId) {
        self.hand.insert(card);
    }

    pub fn give_helper(&mut self, card: CardId) {
        self.helpers.insert(card);
    }

    pub fn holds(&self, card: CardId) -> bool {
        self.hand.contains(&card)
    }

    /// Drops a handle from hand or helpers. Returns whether it was held.
    pub fn forget_card(&mut self, card: CardId) -> bool {
        self.hand.remove(&card) || self.helpers.remove(&card)
    }

    pub fn has_cards(&self) -> bool {
        !self.hand.is_empty()
    }

    pub fn clear_cards(&mut self) {
        self.hand.clear();
        self.helpers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seats_index_in_table_order() {
        assert_eq!(Seat::First.index(), 0);
        assert_eq!(Seat::Second.index(), 1);
    }

    #[test]
    fn forget_card_checks_both_sets() {
        let mut p = Player::new(PlayerId::new(3));
        p.give_card(CardId::new(1));
        p.give_helper(CardId::new(2));
        assert!(p.forget_card(CardId::new(2)));
        assert!(p.forget_card(CardId::new(1)));
        assert!(!p.forget_card(CardId::new(1)));
        assert!(!p.has_cards());
    }
}
