//! Start barrier and the ordered end-of-match reset.
//!
//! The reset runs as discrete steps on the match scheduler:
//!
//! | offset from `end_match` | steps |
//! |---|---|
//! | display grace | reset turns, clear victories, reset rounds, prepare clients |
//! | + prepare grace | destroy entities |
//! | + destruction grace | reset presentation, re-sync clients, complete |
//!
//! Logical state is always cleared before any entity is destroyed.

use serde::{Deserialize, Serialize};

use crate::errors::{CommandOutcome, Rejection};
use crate::events::MatchEvent;
use crate::game::{Match, MatchStatus};
use crate::player::{Player, PlayerId};
use crate::scheduler::{millis, Task};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetStep {
    ResetTurns,
    ClearVictories,
    ResetRounds,
    PrepareClients,
    DestroyEntities,
    ResetPresentation,
    ResyncClients,
    Complete,
}

impl ResetStep {
    pub const ORDER: [ResetStep; 8] = [
        ResetStep::ResetTurns,
        ResetStep::ClearVictories,
        ResetStep::ResetRounds,
        ResetStep::PrepareClients,
        ResetStep::DestroyEntities,
        ResetStep::ResetPresentation,
        ResetStep::ResyncClients,
        ResetStep::Complete,
    ];
}

impl Match {
    /// A player asks for the match to begin.
    pub fn request_start(&mut self, player: PlayerId) -> CommandOutcome {
        if self.resetting {
            tracing::info!(player = %player, "start refused: reset in progress");
            return CommandOutcome::Rejected(Rejection::ResetInProgress);
        }
        if self.seat_of(player).is_none() {
            tracing::warn!(player = %player, "start requested by unknown player");
            return CommandOutcome::Rejected(Rejection::UnknownPlayer);
        }
        if self.status.started {
            tracing::debug!(player = %player, "start ignored: already started");
            return CommandOutcome::Rejected(Rejection::AlreadyStarted);
        }
        if self.evaluate_start_barrier() {
            CommandOutcome::Applied
        } else {
            CommandOutcome::Rejected(Rejection::PlayersNotReady)
        }
    }

    /// Starts the first round once both seats hold a player with cards.
    /// Safe to call repeatedly; returns whether the match is now started.
    pub fn evaluate_start_barrier(&mut self) -> bool {
        if self.status.started {
            return true;
        }
        if self.resetting {
            return false;
        }
        let ready = self
            .seats
            .iter()
            .all(|seat| seat.as_ref().map(Player::has_cards).unwrap_or(false));
        if !ready {
            tracing::debug!(players = self.player_count(), "start barrier waiting");
            return false;
        }

        self.status = MatchStatus {
            started: true,
            ended: false,
            winner: None,
        };
        tracing::info!(seed = self.seed(), "match started");
        self.emit(MatchEvent::GameStarted);
        self.start_round();
        true
    }

    /// Declares `winner` and schedules the reset sequence. A second call
    /// while the match is ended does nothing and returns false.
    pub fn end_match(&mut self, winner: PlayerId) -> bool {
        if self.status.ended {
            tracing::debug!(winner = %winner, "end_match ignored: already ended");
            return false;
        }
        self.status = MatchStatus {
            started: false,
            ended: true,
            winner: Some(winner),
        };
        self.resetting = true;
        self.rounds.mark_resolving();
        let dropped = self.scheduler.cancel_where(Task::is_round_task);
        let finish = self.config.reset_span();
        tracing::info!(
            winner = %winner,
            cancelled_tasks = dropped,
            reset_ms = millis(finish),
            "match ended"
        );
        self.emit(MatchEvent::GameEnded { winner });

        let logical = self.config.display_grace;
        let destroy = logical + self.config.prepare_grace;
        for step in ResetStep::ORDER {
            let at = match step {
                ResetStep::ResetTurns
                | ResetStep::ClearVictories
                | ResetStep::ResetRounds
                | ResetStep::PrepareClients => logical,
                ResetStep::DestroyEntities => destroy,
                ResetStep::ResetPresentation | ResetStep::ResyncClients | ResetStep::Complete => {
                    finish
                }
            };
            self.scheduler.schedule_after(at, Task::Reset(step));
        }
        true
    }

    /// Runs a single reset step.
    pub fn apply_reset_step(&mut self, step: ResetStep) {
        tracing::info!(?step, "reset step");
        match step {
            ResetStep::ResetTurns => self.turns.reset_all(),
            ResetStep::ClearVictories => self.victories.reset_all(),
            ResetStep::ResetRounds => self.rounds.reset(),
            ResetStep::PrepareClients => self.emit(MatchEvent::ResetPrepare),
            ResetStep::DestroyEntities => self.destroy_match_entities(),
            ResetStep::ResetPresentation => self.emit(MatchEvent::PresentationReset),
            ResetStep::ResyncClients => {
                self.status = MatchStatus::default();
                let snapshot = self.snapshot();
                self.emit(MatchEvent::StateSync {
                    snapshot: Box::new(snapshot),
                });
            }
            ResetStep::Complete => {
                self.resetting = false;
                self.emit(MatchEvent::ResetComplete);
            }
        }
    }

    fn destroy_match_entities(&mut self) {
        let mut destroyed = Vec::new();
        let tracked = std::mem::take(&mut self.tracked);
        for card in tracked {
            match self.registry.destroy(card) {
                Some(_) => destroyed.push(card),
                None => tracing::debug!(card = %card, "tracked card already gone"),
            }
        }

        // fallback pass for anything spawned outside the tracked set
        let leftovers = self.registry.sweep(|_| true);
        if !leftovers.is_empty() {
            tracing::warn!(count = leftovers.len(), "untracked entities removed by sweep");
            destroyed.extend(leftovers);
        }

        for player in self.seats.iter_mut().flatten() {
            player.clear_cards();
        }
        tracing::info!(count = destroyed.len(), "match entities destroyed");
        if !destroyed.is_empty() {
            self.emit(MatchEvent::CardsDestroyed { cards: destroyed });
        }
    }
}
