use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::cards::Card;
use crate::player::PlayerId;

/// Opaque handle of a card entity. Unique for the lifetime of a registry,
/// handles are never reused across rounds or match resets.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(u64);

impl CardId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card-{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "card", rename_all = "snake_case")]
pub enum EntityKind {
    /// A playable card backed by a template.
    Battle(Card),
    /// Auxiliary effect card. Its effects live outside the core.
    Helper,
}

/// Where an entity currently sits on the table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Hand,
    /// Shared play area; a card here is staged for the current round.
    PlayArea,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: CardId,
    pub owner: PlayerId,
    pub kind: EntityKind,
    pub zone: Zone,
}

impl Entity {
    pub fn card(&self) -> Option<Card> {
        match self.kind {
            EntityKind::Battle(card) => Some(card),
            EntityKind::Helper => None,
        }
    }

    pub fn is_helper(&self) -> bool {
        matches!(self.kind, EntityKind::Helper)
    }

    pub fn is_staged(&self) -> bool {
        self.zone == Zone::PlayArea
    }
}

/// Authoritative store of every spawned card entity.
#[derive(Debug, Clone, Default)]
pub struct CardRegistry {
    entities: BTreeMap<CardId, Entity>,
    next_id: u64,
}

impl CardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, owner: PlayerId, kind: EntityKind, zone: Zone) -> CardId {
        self.next_id += 1;
        let id = CardId(self.next_id);
        self.entities.insert(
            id,
            Entity {
                id,
                owner,
                kind,
                zone,
            },
        );
        tracing::trace!(card = %id, owner = %owner, ?zone, "spawned card entity");
        id
    }

    pub fn get(&self, id: CardId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn contains(&self, id: CardId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Moves an entity between zones. Returns false when the handle is gone.
    pub fn move_to(&mut self, id: CardId, zone: Zone) -> bool {
        match self.entities.get_mut(&id) {
            Some(entity) => {
                entity.zone = zone;
                true
            }
            None => false,
        }
    }

    /// Swaps the template behind a battle card. Helpers and missing
    /// handles are left alone.
    pub fn replace_template(&mut self, id: CardId, card: Card) -> bool {
        match self.entities.get_mut(&id) {
            Some(entity) if !entity.is_helper() => {
                entity.kind = EntityKind::Battle(card);
                true
            }
            _ => false,
        }
    }

    pub fn destroy(&mut self, id: CardId) -> Option<Entity> {
        let removed = self.entities.remove(&id);
        if removed.is_some() {
            tracing::trace!(card = %id, "destroyed card entity");
        }
        removed
    }

    /// Destroys every entity matching `pred` and returns their handles.
    pub fn sweep<F>(&mut self, mut pred: F) -> Vec<CardId>
    where
        F: FnMut(&Entity) -> bool,
    {
        let doomed: Vec<CardId> = self
            .entities
            .values()
            .filter(|e| pred(e))
            .map(|e| e.id)
            .collect();
        for id in &doomed {
            self.entities.remove(id);
        }
        doomed
    }

    pub fn owned_by(&self, owner: PlayerId) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values().filter(move |e| e.owner == owner)
    }

    pub fn staged(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values().filter(|e| e.is_staged())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
