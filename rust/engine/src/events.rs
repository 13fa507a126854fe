use serde::{Deserialize, Serialize};

use crate::battle::BattleOutcome;
use crate::cards::{Card, Element};
use crate::player::{PlayerId, Seat};
use crate::registry::{CardId, EntityKind, Zone};
use crate::round::RoundPhase;
use crate::victory::{Victory, VictoryRejection};

/// One-way notification emitted by a match after a state transition.
///
/// Events accumulate in the match outbox and are drained by the host,
/// which broadcasts them to every connected client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    PlayerJoined {
        player: PlayerId,
        seat: Seat,
    },
    PlayerLeft {
        player: PlayerId,
        seat: Seat,
    },
    CardDealt {
        player: PlayerId,
        card: CardId,
        kind: EntityKind,
    },
    GameStarted,
    RoundStarted {
        round: u32,
        duration_ms: u64,
    },
    CardPlayed {
        player: PlayerId,
        card: CardId,
        forced: bool,
    },
    PlayedFlagReset {
        player: PlayerId,
    },
    RoundEnded {
        round: u32,
    },
    CardsRevealed {
        round: u32,
        plays: Vec<RevealedCard>,
    },
    BattleResolved {
        round: u32,
        result: BattleOutcome,
        winner: Option<PlayerId>,
        winning_element: Option<Element>,
    },
    RoundSkipped {
        round: u32,
        reason: String,
    },
    VictoryRecorded {
        player: PlayerId,
        victory: Victory,
        total: usize,
    },
    VictoryRejected {
        player: PlayerId,
        victory: Victory,
        reason: VictoryRejection,
    },
    VictoryRemoved {
        player: PlayerId,
        victory: Victory,
    },
    CardsDestroyed {
        cards: Vec<CardId>,
    },
    CardUpdated {
        card: CardId,
        template: Card,
    },
    GameEnded {
        winner: PlayerId,
    },
    ResetPrepare,
    PresentationReset,
    StateSync {
        snapshot: Box<MatchSnapshot>,
    },
    ResetComplete,
}

impl MatchEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            MatchEvent::PlayerJoined { .. } => "player_joined",
            MatchEvent::PlayerLeft { .. } => "player_left",
            MatchEvent::CardDealt { .. } => "card_dealt",
            MatchEvent::GameStarted => "game_started",
            MatchEvent::RoundStarted { .. } => "round_started",
            MatchEvent::CardPlayed { .. } => "card_played",
            MatchEvent::PlayedFlagReset { .. } => "played_flag_reset",
            MatchEvent::RoundEnded { .. } => "round_ended",
            MatchEvent::CardsRevealed { .. } => "cards_revealed",
            MatchEvent::BattleResolved { .. } => "battle_resolved",
            MatchEvent::RoundSkipped { .. } => "round_skipped",
            MatchEvent::VictoryRecorded { .. } => "victory_recorded",
            MatchEvent::VictoryRejected { .. } => "victory_rejected",
            MatchEvent::VictoryRemoved { .. } => "victory_removed",
            MatchEvent::CardsDestroyed { .. } => "cards_destroyed",
            MatchEvent::CardUpdated { .. } => "card_updated",
            MatchEvent::GameEnded { .. } => "game_ended",
            MatchEvent::ResetPrepare => "reset_prepare",
            MatchEvent::PresentationReset => "presentation_reset",
            MatchEvent::StateSync { .. } => "state_sync",
            MatchEvent::ResetComplete => "reset_complete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedCard {
    pub player: PlayerId,
    pub card: CardId,
    pub template: Card,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardView {
    pub id: CardId,
    pub kind: EntityKind,
    pub zone: Zone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundView {
    pub number: u32,
    pub time_remaining_ms: u64,
    pub phase: RoundPhase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatView {
    pub seat: Seat,
    pub player: PlayerId,
    pub hand: Vec<CardView>,
    pub helpers: Vec<CardView>,
    pub has_played: bool,
    pub played_card: Option<CardId>,
    pub victories: Vec<Victory>,
}

/// Full client-visible state of a match, used for re-synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub started: bool,
    pub ended: bool,
    pub winner: Option<PlayerId>,
    pub resetting: bool,
    pub rounds_played: u32,
    pub round: Option<RoundView>,
    pub seats: Vec<SeatView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let ev = MatchEvent::RoundStarted {
            round: 2,
            duration_ms: 15_000,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "round_started");
        assert_eq!(json["round"], 2);
        assert_eq!(ev.kind(), "round_started");

        let unit = serde_json::to_value(MatchEvent::ResetComplete).unwrap();
        assert_eq!(unit, serde_json::json!({"type": "reset_complete"}));
    }
}
