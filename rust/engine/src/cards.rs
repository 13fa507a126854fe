use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::GameError;

/// One of the four card elements.
/// Elements dominate each other in a fixed cycle, see [`crate::battle`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    /// Button
    Boton,
    /// Pin
    Alfiler,
    /// Fabric
    Tela,
    /// Cotton
    Algodon,
}

/// Card sub-category. Only relevant to the color-capped win condition.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Rojo,
    Verde,
    Morado,
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Element::Boton => "boton",
            Element::Alfiler => "alfiler",
            Element::Tela => "tela",
            Element::Algodon => "algodon",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Color::Rojo => "rojo",
            Color::Verde => "verde",
            Color::Morado => "morado",
        };
        f.write_str(name)
    }
}

/// Power rating from 1 to 3 stars, used as the tie-breaker between cards of
/// the same element.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StarLevel(u8);

impl StarLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 3;

    pub fn new(value: u8) -> Result<Self, GameError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(GameError::InvalidStarLevel(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn all() -> [StarLevel; 3] {
        [StarLevel(1), StarLevel(2), StarLevel(3)]
    }
}

impl TryFrom<u8> for StarLevel {
    type Error = GameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        StarLevel::new(value)
    }
}

impl From<StarLevel> for u8 {
    fn from(level: StarLevel) -> Self {
        level.0
    }
}

/// Immutable template attributes of a battle card.
/// Dealt instances are tracked by handle in [`crate::registry::CardRegistry`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Card {
    pub element: Element,
    pub color: Color,
    pub star_level: StarLevel,
}

impl Card {
    pub fn new(element: Element, color: Color, star_level: StarLevel) -> Self {
        Self {
            element,
            color,
            star_level,
        }
    }

    /// Convenience constructor for callers holding a raw level.
    pub fn with_level(element: Element, color: Color, level: u8) -> Result<Self, GameError> {
        Ok(Self::new(element, color, StarLevel::new(level)?))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}*", self.element, self.color, self.star_level.get())
    }
}

pub fn all_elements() -> [Element; 4] {
    [Element::Boton, Element::Alfiler, Element::Tela, Element::Algodon]
}

pub fn all_colors() -> [Color; 3] {
    [Color::Rojo, Color::Verde, Color::Morado]
}

/// Every element/color/level combination, 36 templates in total.
pub fn full_pool() -> Vec<Card> {
    let mut v = Vec::with_capacity(36);
    for &e in &all_elements() {
        for &c in &all_colors() {
            for level in StarLevel::all() {
                v.push(Card::new(e, c, level));
            }
        }
    }
    v
}
