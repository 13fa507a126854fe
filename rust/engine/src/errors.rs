use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::player::PlayerId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid star level: {0}, expected 1..=3")]
    InvalidStarLevel(u8),
    #[error("Invalid dominance relation: {0}")]
    InvalidDominance(String),
    #[error("Invalid match configuration: {0}")]
    InvalidConfig(String),
    #[error("Card pool is empty")]
    EmptyPool,
    #[error("Both seats are already taken")]
    SeatsFull,
    #[error("Unknown player {0}")]
    UnknownPlayer(PlayerId),
}

/// Why a client command was turned into a no-op.
///
/// Rejections are never surfaced as hard errors; the match state is left
/// untouched and the caller is told what happened.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    UnknownPlayer,
    UnknownCard,
    NotOwner,
    NotPlayable,
    AlreadyPlayed,
    AlreadyStaged,
    AlreadyDealt,
    AlreadyStarted,
    NotStarted,
    RoundNotActive,
    MatchEnded,
    ResetInProgress,
    PlayersNotReady,
    TemplateUnavailable,
}

impl Rejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::UnknownPlayer => "unknown_player",
            Rejection::UnknownCard => "unknown_card",
            Rejection::NotOwner => "not_owner",
            Rejection::NotPlayable => "not_playable",
            Rejection::AlreadyPlayed => "already_played",
            Rejection::AlreadyStaged => "already_staged",
            Rejection::AlreadyDealt => "already_dealt",
            Rejection::AlreadyStarted => "already_started",
            Rejection::NotStarted => "not_started",
            Rejection::RoundNotActive => "round_not_active",
            Rejection::MatchEnded => "match_ended",
            Rejection::ResetInProgress => "reset_in_progress",
            Rejection::PlayersNotReady => "players_not_ready",
            Rejection::TemplateUnavailable => "template_unavailable",
        }
    }

    /// Referenced handle no longer resolves (destroyed card, disconnected player).
    pub fn is_missing_entity(self) -> bool {
        matches!(self, Rejection::UnknownPlayer | Rejection::UnknownCard)
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum CommandOutcome {
    Applied,
    Rejected(Rejection),
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommandOutcome::Applied)
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            CommandOutcome::Applied => None,
            CommandOutcome::Rejected(reason) => Some(*reason),
        }
    }
}
