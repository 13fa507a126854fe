use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::cards::{all_elements, Card, Element};
use crate::errors::GameError;

/// Result of comparing card A against card B.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    WinA,
    WinB,
    Draw,
}

impl BattleOutcome {
    /// The same outcome seen from the other side of the table.
    pub fn flipped(self) -> BattleOutcome {
        match self {
            BattleOutcome::WinA => BattleOutcome::WinB,
            BattleOutcome::WinB => BattleOutcome::WinA,
            BattleOutcome::Draw => BattleOutcome::Draw,
        }
    }
}

/// Boton beats Alfiler, Alfiler beats Tela, Tela beats Algodon, Algodon beats Boton.
const DOMINANCE: [(Element, Element); 4] = [
    (Element::Boton, Element::Alfiler),
    (Element::Alfiler, Element::Tela),
    (Element::Tela, Element::Algodon),
    (Element::Algodon, Element::Boton),
];

pub fn dominance_pairs() -> &'static [(Element, Element)] {
    &DOMINANCE
}

pub fn beats(a: Element, b: Element) -> bool {
    DOMINANCE.contains(&(a, b))
}

/// Compares two played cards.
///
/// Elemental dominance decides first. When neither element dominates the
/// other, the higher star level wins and equal levels draw.
///
/// # Examples
///
/// ```
/// use hilvan_engine::battle::{compare, BattleOutcome};
/// use hilvan_engine::cards::{Card, Color, Element};
///
/// let boton = Card::with_level(Element::Boton, Color::Rojo, 1).unwrap();
/// let alfiler = Card::with_level(Element::Alfiler, Color::Verde, 3).unwrap();
/// assert_eq!(compare(&boton, &alfiler), BattleOutcome::WinA);
/// ```
pub fn compare(a: &Card, b: &Card) -> BattleOutcome {
    if beats(a.element, b.element) {
        return BattleOutcome::WinA;
    }
    if beats(b.element, a.element) {
        return BattleOutcome::WinB;
    }
    match a.star_level.cmp(&b.star_level) {
        std::cmp::Ordering::Greater => BattleOutcome::WinA,
        std::cmp::Ordering::Less => BattleOutcome::WinB,
        std::cmp::Ordering::Equal => BattleOutcome::Draw,
    }
}

/// Checks that a dominance relation is a single 4-cycle over every element.
///
/// Each element must win exactly once and lose exactly once, no element may
/// beat itself, no pair may dominate in both directions, and following the
/// winners from any element must visit all four before returning.
pub fn validate_dominance(pairs: &[(Element, Element)]) -> Result<(), GameError> {
    let elements = all_elements();
    if pairs.len() != elements.len() {
        return Err(GameError::InvalidDominance(format!(
            "expected {} ordered pairs, found {}",
            elements.len(),
            pairs.len()
        )));
    }

    let mut winners = HashSet::new();
    let mut losers = HashSet::new();
    for &(a, b) in pairs {
        if a == b {
            return Err(GameError::InvalidDominance(format!("{a} beats itself")));
        }
        if pairs.contains(&(b, a)) {
            return Err(GameError::InvalidDominance(format!(
                "{a} and {b} dominate each other"
            )));
        }
        if !winners.insert(a) {
            return Err(GameError::InvalidDominance(format!("{a} wins more than once")));
        }
        if !losers.insert(b) {
            return Err(GameError::InvalidDominance(format!("{b} loses more than once")));
        }
    }

    let successor = |from: Element| pairs.iter().find(|(a, _)| *a == from).map(|(_, b)| *b);
    let start = elements[0];
    let mut seen = HashSet::new();
    let mut current = start;
    loop {
        if !seen.insert(current) {
            break;
        }
        current = successor(current).ok_or_else(|| {
            GameError::InvalidDominance(format!("{current} has no element it beats"))
        })?;
    }
    if current != start || seen.len() != elements.len() {
        return Err(GameError::InvalidDominance(
            "relation splits into more than one cycle".to_string(),
        ));
    }
    Ok(())
}
