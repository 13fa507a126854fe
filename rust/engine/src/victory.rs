use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::cards::{Card, Color, Element};
use crate::player::PlayerId;

/// How many times one (element, color) pair may appear in a victory list.
pub const DUPLICATE_VICTORY_CAP: usize = 2;
/// Distinct elements needed for the spread win.
pub const DISTINCT_ELEMENTS_TO_WIN: usize = 4;
/// Victories of a single element needed for the focused win.
pub const SAME_ELEMENT_TO_WIN: usize = 4;
/// Within the focused win, no color may show up more often than this.
pub const MAX_SAME_COLOR_PER_ELEMENT: usize = 2;

/// A recorded round win.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Victory {
    pub element: Element,
    pub color: Color,
}

impl Victory {
    pub fn new(element: Element, color: Color) -> Self {
        Self { element, color }
    }

    pub fn from_card(card: &Card) -> Self {
        Self::new(card.element, card.color)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VictoryRejection {
    DuplicateCap,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RecordOutcome {
    Recorded { has_won: bool },
    Rejected(VictoryRejection),
}

/// True when `victories` satisfy either win clause.
///
/// Spread: at least four distinct elements, duplicates ignored.
/// Focused: one element with four or more victories where no single color
/// appears more than twice among them.
pub fn meets_win_condition(victories: &[Victory]) -> bool {
    let distinct: HashSet<Element> = victories.iter().map(|v| v.element).collect();
    if distinct.len() >= DISTINCT_ELEMENTS_TO_WIN {
        return true;
    }

    distinct.into_iter().any(|element| {
        let mut per_color: HashMap<Color, usize> = HashMap::new();
        let mut total = 0;
        for v in victories.iter().filter(|v| v.element == element) {
            *per_color.entry(v.color).or_default() += 1;
            total += 1;
        }
        total >= SAME_ELEMENT_TO_WIN
            && per_color
                .values()
                .all(|&count| count <= MAX_SAME_COLOR_PER_ELEMENT)
    })
}

/// Victory lists of every player in one match.
#[derive(Debug, Clone, Default)]
pub struct VictoryTracker {
    lists: HashMap<PlayerId, Vec<Victory>>,
}

impl VictoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_if_eligible(&mut self, player: PlayerId, card: &Card) -> RecordOutcome {
        let victory = Victory::from_card(card);
        let list = self.lists.entry(player).or_default();
        let existing = list.iter().filter(|v| **v == victory).count();
        if existing >= DUPLICATE_VICTORY_CAP {
            tracing::info!(
                player = %player,
                element = %victory.element,
                color = %victory.color,
                "victory not recorded: duplicate cap reached"
            );
            return RecordOutcome::Rejected(VictoryRejection::DuplicateCap);
        }
        list.push(victory);
        let has_won = meets_win_condition(list);
        tracing::debug!(player = %player, total = list.len(), has_won, "victory recorded");
        RecordOutcome::Recorded { has_won }
    }

    pub fn has_won(&self, player: PlayerId) -> bool {
        self.lists
            .get(&player)
            .map(|list| meets_win_condition(list))
            .unwrap_or(false)
    }

    pub fn victories(&self, player: PlayerId) -> &[Victory] {
        self.lists.get(&player).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Removes one victory chosen uniformly at random.
    pub fn remove_random<R: Rng + ?Sized>(
        &mut self,
        player: PlayerId,
        rng: &mut R,
    ) -> Option<Victory> {
        let list = self.lists.get_mut(&player)?;
        if list.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..list.len());
        Some(list.remove(idx))
    }

    /// Removes the first victory matching `element` and `color`.
    pub fn remove_specific(&mut self, player: PlayerId, element: Element, color: Color) -> bool {
        let Some(list) = self.lists.get_mut(&player) else {
            return false;
        };
        match list
            .iter()
            .position(|v| v.element == element && v.color == color)
        {
            Some(idx) => {
                list.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Drops a single player's list, used when they disconnect.
    pub fn forget(&mut self, player: PlayerId) {
        self.lists.remove(&player);
    }

    pub fn reset_all(&mut self) {
        self.lists.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::seeded_rng;

    fn card(element: Element, color: Color) -> Card {
        Card::with_level(element, color, 1).unwrap()
    }

    #[test]
    fn third_identical_victory_is_capped() {
        let mut t = VictoryTracker::new();
        let p = PlayerId::new(1);
        let c = card(Element::Tela, Color::Rojo);
        assert!(matches!(
            t.record_if_eligible(p, &c),
            RecordOutcome::Recorded { .. }
        ));
        assert!(matches!(
            t.record_if_eligible(p, &c),
            RecordOutcome::Recorded { .. }
        ));
        assert_eq!(
            t.record_if_eligible(p, &c),
            RecordOutcome::Rejected(VictoryRejection::DuplicateCap)
        );
        assert_eq!(t.victories(p).len(), 2);
    }

    #[test]
    fn cap_is_per_player() {
        let mut t = VictoryTracker::new();
        let c = card(Element::Boton, Color::Morado);
        for _ in 0..2 {
            t.record_if_eligible(PlayerId::new(1), &c);
        }
        assert!(matches!(
            t.record_if_eligible(PlayerId::new(2), &c),
            RecordOutcome::Recorded { has_won: false }
        ));
    }

    #[test]
    fn focused_win_needs_four_of_one_element() {
        let three = [
            Victory::new(Element::Alfiler, Color::Rojo),
            Victory::new(Element::Alfiler, Color::Verde),
            Victory::new(Element::Alfiler, Color::Morado),
        ];
        assert!(!meets_win_condition(&three));
    }

    #[test]
    fn remove_specific_takes_one_entry() {
        let mut t = VictoryTracker::new();
        let p = PlayerId::new(1);
        let c = card(Element::Algodon, Color::Verde);
        t.record_if_eligible(p, &c);
        t.record_if_eligible(p, &c);
        assert!(t.remove_specific(p, Element::Algodon, Color::Verde));
        assert_eq!(t.victories(p).len(), 1);
        assert!(!t.remove_specific(p, Element::Tela, Color::Verde));
        assert!(!t.remove_specific(PlayerId::new(9), Element::Algodon, Color::Verde));
    }

    #[test]
    fn remove_random_on_empty_list_is_noop() {
        let mut t = VictoryTracker::new();
        let mut rng = seeded_rng(5);
        assert_eq!(t.remove_random(PlayerId::new(1), &mut rng), None);
        t.record_if_eligible(PlayerId::new(1), &card(Element::Tela, Color::Rojo));
        assert_eq!(
            t.remove_random(PlayerId::new(1), &mut rng),
            Some(Victory::new(Element::Tela, Color::Rojo))
        );
        assert!(t.victories(PlayerId::new(1)).is_empty());
    }
}
