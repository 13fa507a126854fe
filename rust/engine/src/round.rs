use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::battle::{compare, BattleOutcome};
use crate::cards::Card;
use crate::events::{MatchEvent, RevealedCard};
use crate::game::Match;
use crate::player::{PlayerId, Seat};
use crate::registry::Zone;
use crate::scheduler::{millis, Task};
use crate::turn::force_random_play;
use crate::victory::{RecordOutcome, Victory};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Timer running, plays accepted.
    Active,
    Resolving,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Round {
    pub number: u32,
    pub time_remaining: Duration,
    pub phase: RoundPhase,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RoundTick {
    /// No active round.
    Idle,
    Running,
    Expired(u32),
}

/// Round counter and the countdown of the current round.
#[derive(Debug, Clone, Default)]
pub struct RoundClock {
    current: Option<Round>,
    counter: u32,
}

impl RoundClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Round> {
        self.current.as_ref()
    }

    /// Rounds started since the last reset.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn time_remaining(&self) -> Duration {
        self.current
            .map(|r| r.time_remaining)
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.current,
            Some(Round {
                phase: RoundPhase::Active,
                ..
            })
        )
    }

    /// Replaces the current round with a fresh active one.
    pub fn begin_next(&mut self, duration: Duration) -> u32 {
        self.counter += 1;
        self.current = Some(Round {
            number: self.counter,
            time_remaining: duration,
            phase: RoundPhase::Active,
        });
        self.counter
    }

    pub fn tick(&mut self, dt: Duration) -> RoundTick {
        match self.current.as_mut() {
            Some(round) if round.phase == RoundPhase::Active => {
                round.time_remaining = round.time_remaining.saturating_sub(dt);
                if round.time_remaining.is_zero() {
                    RoundTick::Expired(round.number)
                } else {
                    RoundTick::Running
                }
            }
            _ => RoundTick::Idle,
        }
    }

    /// Moves an active round to resolving. Returns its number, or `None`
    /// when no round was active.
    pub fn mark_resolving(&mut self) -> Option<u32> {
        match self.current.as_mut() {
            Some(round) if round.phase == RoundPhase::Active => {
                round.phase = RoundPhase::Resolving;
                Some(round.number)
            }
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.counter = 0;
    }
}

impl Match {
    /// Opens the next round. Turn state is cleared first, then each seated
    /// player receives one fresh card from round 2 onward.
    pub(crate) fn start_round(&mut self) -> bool {
        if self.status.ended {
            tracing::info!("round start refused: match has ended");
            return false;
        }
        if !self.status.started {
            tracing::debug!("round start refused: match not started");
            return false;
        }

        let number = self.rounds.counter() + 1;
        for seat in Seat::ALL {
            self.turns.clear_for_next_round(seat);
        }
        if number > 1 {
            for seat in Seat::ALL {
                if self.seats[seat.index()].is_some() {
                    self.deal_battle_card(seat);
                }
            }
        }

        let duration = self.config.round_duration;
        let round = self.rounds.begin_next(duration);
        tracing::info!(round, duration_ms = millis(duration), "round started");
        self.emit(MatchEvent::RoundStarted {
            round,
            duration_ms: millis(duration),
        });
        true
    }

    /// Resolves the active round: forces plays for stragglers, reveals both
    /// cards, awards the victory, then either ends the match or schedules
    /// cleanup and the next round.
    pub(crate) fn end_round(&mut self) {
        let Some(round) = self.rounds.mark_resolving() else {
            return;
        };
        tracing::info!(round, "round ended");
        self.emit(MatchEvent::RoundEnded { round });

        self.force_pending_plays();
        self.reveal_plays(round);

        let match_winner = if self.resolve_round(round) {
            self.find_match_winner()
        } else {
            None
        };

        if let Some(winner) = match_winner {
            self.end_match(winner);
            return;
        }

        let cleanup = self.config.cleanup_delay;
        let next = cleanup + self.config.next_round_delay;
        self.scheduler
            .schedule_after(cleanup, Task::CleanupPlayedCards { round });
        self.scheduler.schedule_after(next, Task::StartNextRound);
    }

    fn force_pending_plays(&mut self) {
        let mut forced = Vec::new();
        for seat in Seat::ALL {
            let Some(player) = self.seats[seat.index()].as_mut() else {
                continue;
            };
            if let Some(play) = force_random_play(
                &mut self.turns,
                seat,
                player,
                &mut self.registry,
                &self.pool,
                &mut self.rng,
            ) {
                self.tracked.insert(play.card);
                forced.push((player.id(), play));
            }
        }
        for (player, play) in forced {
            tracing::info!(player = %player, card = %play.card, synthesized = play.synthesized, "forced play on timeout");
            if play.synthesized {
                if let Some(kind) = self.registry.get(play.card).map(|e| e.kind) {
                    self.emit(MatchEvent::CardDealt {
                        player,
                        card: play.card,
                        kind,
                    });
                }
            }
            self.emit(MatchEvent::CardPlayed {
                player,
                card: play.card,
                forced: true,
            });
        }
    }

    fn reveal_plays(&mut self, round: u32) {
        let plays: Vec<RevealedCard> = Seat::ALL
            .iter()
            .filter_map(|&seat| {
                let player = self.player_at(seat)?;
                let card = self.turns.current_played_card(seat)?;
                let template = self.registry.get(card)?.card()?;
                Some(RevealedCard {
                    player,
                    card,
                    template,
                })
            })
            .collect();
        self.emit(MatchEvent::CardsRevealed { round, plays });
    }

    /// Runs the battle and records the victory. Returns false when the round
    /// was skipped.
    fn resolve_round(&mut self, round: u32) -> bool {
        let (Some(first), Some(second)) = (
            self.player_at(Seat::First),
            self.player_at(Seat::Second),
        ) else {
            tracing::error!(round, "cannot resolve round with fewer than two players");
            self.emit(MatchEvent::RoundSkipped {
                round,
                reason: "missing_player".to_string(),
            });
            return false;
        };

        let cards = (
            self.played_template(Seat::First),
            self.played_template(Seat::Second),
        );
        let (Some(a), Some(b)) = cards else {
            tracing::warn!(round, "played card no longer resolves, skipping resolution");
            self.emit(MatchEvent::RoundSkipped {
                round,
                reason: "missing_card".to_string(),
            });
            return false;
        };

        let result = compare(&a, &b);
        let winner = match result {
            BattleOutcome::WinA => Some((first, a)),
            BattleOutcome::WinB => Some((second, b)),
            BattleOutcome::Draw => None,
        };
        tracing::info!(round, first = %a, second = %b, ?result, "battle resolved");
        self.emit(MatchEvent::BattleResolved {
            round,
            result,
            winner: winner.map(|(p, _)| p),
            winning_element: winner.map(|(_, card)| card.element),
        });

        if let Some((player, card)) = winner {
            let victory = Victory::from_card(&card);
            match self.victories.record_if_eligible(player, &card) {
                RecordOutcome::Recorded { .. } => {
                    let total = self.victories.victories(player).len();
                    self.emit(MatchEvent::VictoryRecorded {
                        player,
                        victory,
                        total,
                    });
                }
                RecordOutcome::Rejected(reason) => {
                    self.emit(MatchEvent::VictoryRejected {
                        player,
                        victory,
                        reason,
                    });
                }
            }
        }
        true
    }

    fn played_template(&self, seat: Seat) -> Option<Card> {
        let id = self.turns.current_played_card(seat)?;
        self.registry.get(id)?.card()
    }

    fn find_match_winner(&self) -> Option<PlayerId> {
        Seat::ALL
            .iter()
            .filter_map(|&seat| self.player_at(seat))
            .find(|&p| self.victories.has_won(p))
    }

    /// Destroys the cards committed in the last round.
    pub(crate) fn cleanup_played_cards(&mut self, round: u32) {
        let mut destroyed = Vec::new();
        for seat in Seat::ALL {
            let Some(card) = self.turns.current_played_card(seat) else {
                continue;
            };
            match self.registry.destroy(card) {
                Some(entity) => {
                    if let Some(owner) = self.seat_of(entity.owner) {
                        if let Some(player) = self.seats[owner.index()].as_mut() {
                            player.forget_card(card);
                        }
                    }
                    self.tracked.remove(&card);
                    destroyed.push(card);
                }
                None => {
                    tracing::warn!(round, card = %card, "played card already destroyed");
                }
            }
        }
        // anything else left staged is stale
        let stray = self.registry.sweep(|e| e.zone == Zone::PlayArea);
        for card in &stray {
            tracing::warn!(round, card = %card, "removing stray staged card");
            self.tracked.remove(card);
            for player in self.seats.iter_mut().flatten() {
                player.forget_card(*card);
            }
        }
        destroyed.extend(stray);

        if !destroyed.is_empty() {
            tracing::debug!(round, count = destroyed.len(), "played cards destroyed");
            self.emit(MatchEvent::CardsDestroyed { cards: destroyed });
        }
    }
}
