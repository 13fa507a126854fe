use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::battle::{dominance_pairs, validate_dominance};
use crate::cards::{Card, Color, Element};
use crate::config::MatchConfig;
use crate::errors::{CommandOutcome, GameError, Rejection};
use crate::events::{CardView, MatchEvent, MatchSnapshot, RoundView, SeatView};
use crate::player::{Player, PlayerId, Seat};
use crate::pool::{seeded_rng, CardPool, MatchRng};
use crate::registry::{CardId, CardRegistry, EntityKind, Zone};
use crate::round::{RoundClock, RoundPhase, RoundTick};
use crate::scheduler::{millis, Scheduler, Task};
use crate::turn::{PlayOutcome, TurnCoordinator};
use crate::victory::{Victory, VictoryTracker};

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MatchStatus {
    pub started: bool,
    pub ended: bool,
    pub winner: Option<PlayerId>,
}

/// One two-player match: the seats, every game component, and the outbox of
/// notifications produced by state transitions.
///
/// A `Match` never reads a clock. The host drives it with [`Match::tick`]
/// and hands it commands one at a time.
///
/// # Examples
///
/// ```
/// use hilvan_engine::config::MatchConfig;
/// use hilvan_engine::game::Match;
///
/// let mut m = Match::new(MatchConfig::default().with_seed(7)).unwrap();
/// let (alice, _) = m.add_player().unwrap();
/// let (bob, _) = m.add_player().unwrap();
/// m.deal_cards(alice);
/// m.deal_cards(bob);
/// assert!(m.status().started);
/// assert_eq!(m.round().map(|r| r.number), Some(1));
/// ```
#[derive(Debug)]
pub struct Match {
    pub(crate) config: MatchConfig,
    pub(crate) seats: [Option<Player>; 2],
    pub(crate) registry: CardRegistry,
    /// Every entity this match spawned and has not yet destroyed.
    pub(crate) tracked: BTreeSet<CardId>,
    pub(crate) pool: CardPool,
    pub(crate) rng: MatchRng,
    pub(crate) turns: TurnCoordinator,
    pub(crate) victories: VictoryTracker,
    pub(crate) rounds: RoundClock,
    pub(crate) scheduler: Scheduler,
    pub(crate) status: MatchStatus,
    pub(crate) resetting: bool,
    outbox: Vec<MatchEvent>,
    next_player_id: u64,
    seed: u64,
}

impl Match {
    pub fn new(config: MatchConfig) -> Result<Self, GameError> {
        Self::with_pool(config, CardPool::standard())
    }

    pub fn with_pool(config: MatchConfig, pool: CardPool) -> Result<Self, GameError> {
        config.validate()?;
        validate_dominance(dominance_pairs())?;
        let seed = config.seed.unwrap_or_else(rand::random);
        tracing::debug!(seed, templates = pool.templates().len(), "match created");
        Ok(Self {
            config,
            seats: [None, None],
            registry: CardRegistry::new(),
            tracked: BTreeSet::new(),
            pool,
            rng: seeded_rng(seed),
            turns: TurnCoordinator::new(),
            victories: VictoryTracker::new(),
            rounds: RoundClock::new(),
            scheduler: Scheduler::new(),
            status: MatchStatus::default(),
            resetting: false,
            outbox: Vec::new(),
            next_player_id: 0,
            seed,
        })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn is_resetting(&self) -> bool {
        self.resetting
    }

    pub fn round(&self) -> Option<&crate::round::Round> {
        self.rounds.current()
    }

    pub fn time_remaining(&self) -> Duration {
        self.rounds.time_remaining()
    }

    pub fn registry(&self) -> &CardRegistry {
        &self.registry
    }

    pub fn turns(&self) -> &TurnCoordinator {
        &self.turns
    }

    pub fn victory_tracker(&self) -> &VictoryTracker {
        &self.victories
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn player(&self, seat: Seat) -> Option<&Player> {
        self.seats[seat.index()].as_ref()
    }

    pub fn player_at(&self, seat: Seat) -> Option<PlayerId> {
        self.player(seat).map(Player::id)
    }

    pub fn seat_of(&self, id: PlayerId) -> Option<Seat> {
        Seat::ALL
            .into_iter()
            .find(|seat| self.player_at(*seat) == Some(id))
    }

    pub fn player_count(&self) -> usize {
        self.seats.iter().flatten().count()
    }

    /// The card currently committed by `player`, for auxiliary effects.
    pub fn current_played_card(&self, player: PlayerId) -> Option<CardId> {
        self.seat_of(player)
            .and_then(|seat| self.turns.current_played_card(seat))
    }

    pub(crate) fn emit(&mut self, event: MatchEvent) {
        tracing::trace!(kind = event.kind(), "event queued");
        self.outbox.push(event);
    }

    /// Takes every notification produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<MatchEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Seats a new connection in the first free slot.
    pub fn add_player(&mut self) -> Result<(PlayerId, Seat), GameError> {
        let seat = Seat::ALL
            .into_iter()
            .find(|seat| self.seats[seat.index()].is_none())
            .ok_or(GameError::SeatsFull)?;
        self.next_player_id += 1;
        let id = PlayerId::new(self.next_player_id);
        self.seats[seat.index()] = Some(Player::new(id));
        tracing::info!(player = %id, ?seat, "player joined");
        self.emit(MatchEvent::PlayerJoined { player: id, seat });
        Ok((id, seat))
    }

    /// Vacates the player's seat and destroys everything they owned.
    /// A running round keeps ticking; its resolution will be skipped.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<Seat, GameError> {
        let seat = self.seat_of(id).ok_or(GameError::UnknownPlayer(id))?;
        self.seats[seat.index()] = None;
        self.turns.clear_for_next_round(seat);
        self.victories.forget(id);

        let destroyed = self.registry.sweep(|e| e.owner == id);
        for card in &destroyed {
            self.tracked.remove(card);
        }
        tracing::info!(player = %id, ?seat, destroyed = destroyed.len(), "player left");
        self.emit(MatchEvent::PlayerLeft { player: id, seat });
        if !destroyed.is_empty() {
            self.emit(MatchEvent::CardsDestroyed { cards: destroyed });
        }
        Ok(seat)
    }

    /// Spawns one battle card from the pool into the seat's hand.
    pub(crate) fn deal_battle_card(&mut self, seat: Seat) -> Option<CardId> {
        let template = self.pool.draw(&mut self.rng);
        self.spawn_for(seat, EntityKind::Battle(template))
    }

    fn spawn_for(&mut self, seat: Seat, kind: EntityKind) -> Option<CardId> {
        let player = self.seats[seat.index()].as_mut()?;
        let owner = player.id();
        let card = self.registry.spawn(owner, kind, Zone::Hand);
        match kind {
            EntityKind::Battle(_) => player.give_card(card),
            EntityKind::Helper => player.give_helper(card),
        }
        self.tracked.insert(card);
        self.emit(MatchEvent::CardDealt {
            player: owner,
            card,
            kind,
        });
        Some(card)
    }

    /// Initial deal for a player with an empty hand, followed by a start
    /// barrier check on their behalf.
    pub fn deal_cards(&mut self, player: PlayerId) -> CommandOutcome {
        if self.resetting {
            return self.reject(player, "deal", Rejection::ResetInProgress);
        }
        let Some(seat) = self.seat_of(player) else {
            return self.reject(player, "deal", Rejection::UnknownPlayer);
        };
        if self.status.ended {
            return self.reject(player, "deal", Rejection::MatchEnded);
        }
        if self.player(seat).map(Player::has_cards).unwrap_or(false) {
            return self.reject(player, "deal", Rejection::AlreadyDealt);
        }

        for _ in 0..self.config.initial_hand_size {
            self.deal_battle_card(seat);
        }
        for _ in 0..self.config.helper_cards_per_player {
            self.spawn_for(seat, EntityKind::Helper);
        }
        tracing::info!(
            player = %player,
            cards = self.config.initial_hand_size,
            helpers = self.config.helper_cards_per_player,
            "initial cards dealt"
        );

        if !self.status.started {
            self.evaluate_start_barrier();
        }
        CommandOutcome::Applied
    }

    /// Commits a card for the current round.
    pub fn submit_play(&mut self, player: PlayerId, card: CardId) -> CommandOutcome {
        if self.status.ended || self.resetting {
            return self.reject(player, "play", Rejection::MatchEnded);
        }
        let Some(seat) = self.seat_of(player) else {
            return self.reject(player, "play", Rejection::UnknownPlayer);
        };
        if !self.status.started {
            return self.reject(player, "play", Rejection::NotStarted);
        }
        if !self.rounds.is_active() {
            return self.reject(player, "play", Rejection::RoundNotActive);
        }
        let Some(entity) = self.registry.get(card) else {
            return self.reject(player, "play", Rejection::UnknownCard);
        };
        if entity.owner != player {
            return self.reject(player, "play", Rejection::NotOwner);
        }
        if entity.is_helper() {
            return self.reject(player, "play", Rejection::NotPlayable);
        }
        if entity.is_staged() {
            return self.reject(player, "play", Rejection::AlreadyStaged);
        }
        if self.turns.submit_play(seat, card) == PlayOutcome::RejectedAlreadyPlayed {
            return self.reject(player, "play", Rejection::AlreadyPlayed);
        }

        self.registry.move_to(card, Zone::PlayArea);
        tracing::info!(player = %player, card = %card, "card played");
        self.emit(MatchEvent::CardPlayed {
            player,
            card,
            forced: false,
        });

        if self.config.resolve_when_all_committed
            && self.player_count() == 2
            && self.turns.all_committed()
        {
            tracing::debug!("both players committed, resolving early");
            self.end_round();
        }
        CommandOutcome::Applied
    }

    /// Administrative reset of one player's turn flag. A staged card goes
    /// back to the hand so it can be played again.
    pub fn reset_played_flag(&mut self, player: PlayerId) -> CommandOutcome {
        if self.resetting {
            return self.reject(player, "reset_flag", Rejection::ResetInProgress);
        }
        let Some(seat) = self.seat_of(player) else {
            return self.reject(player, "reset_flag", Rejection::UnknownPlayer);
        };
        if matches!(self.round().map(|r| r.phase), Some(RoundPhase::Resolving)) {
            return self.reject(player, "reset_flag", Rejection::RoundNotActive);
        }

        if let Some(card) = self.turns.current_played_card(seat) {
            if !self.registry.move_to(card, Zone::Hand) {
                tracing::warn!(player = %player, card = %card, "played card already gone");
            }
        }
        self.turns.clear_for_next_round(seat);
        tracing::info!(player = %player, "played flag reset");
        self.emit(MatchEvent::PlayedFlagReset { player });
        CommandOutcome::Applied
    }

    /// Replaces the template behind a dealt battle card, for level-up and
    /// element-change effects.
    pub fn replace_card_template(&mut self, card: CardId, template: Card) -> CommandOutcome {
        if !self.pool.contains(&template) {
            tracing::info!(card = %card, %template, "template not in pool");
            return CommandOutcome::Rejected(Rejection::TemplateUnavailable);
        }
        let Some(entity) = self.registry.get(card) else {
            tracing::warn!(card = %card, "cannot update template: card not found");
            return CommandOutcome::Rejected(Rejection::UnknownCard);
        };
        if entity.is_helper() {
            return CommandOutcome::Rejected(Rejection::NotPlayable);
        }
        self.registry.replace_template(card, template);
        tracing::debug!(card = %card, %template, "card template replaced");
        self.emit(MatchEvent::CardUpdated { card, template });
        CommandOutcome::Applied
    }

    pub fn remove_random_victory(&mut self, player: PlayerId) -> Option<Victory> {
        let removed = self.victories.remove_random(player, &mut self.rng)?;
        self.emit(MatchEvent::VictoryRemoved {
            player,
            victory: removed,
        });
        Some(removed)
    }

    pub fn remove_specific_victory(
        &mut self,
        player: PlayerId,
        element: Element,
        color: Color,
    ) -> bool {
        if !self.victories.remove_specific(player, element, color) {
            return false;
        }
        self.emit(MatchEvent::VictoryRemoved {
            player,
            victory: Victory::new(element, color),
        });
        true
    }

    fn reject(&self, player: PlayerId, command: &str, reason: Rejection) -> CommandOutcome {
        if reason.is_missing_entity() {
            tracing::warn!(player = %player, command, %reason, "command rejected");
        } else {
            tracing::info!(player = %player, command, %reason, "command rejected");
        }
        CommandOutcome::Rejected(reason)
    }

    /// Advances the match clock by `dt`: the round timer first, then every
    /// scheduled task that has come due.
    pub fn tick(&mut self, dt: Duration) {
        self.scheduler.advance(dt);
        match self.rounds.tick(dt) {
            RoundTick::Expired(round) => {
                tracing::debug!(round, "round timer expired");
                self.end_round();
            }
            RoundTick::Running | RoundTick::Idle => {}
        }
        while let Some(task) = self.scheduler.pop_due() {
            self.run_task(task);
        }
    }

    fn run_task(&mut self, task: Task) {
        tracing::trace!(?task, "running task");
        match task {
            Task::CleanupPlayedCards { round } => self.cleanup_played_cards(round),
            Task::StartNextRound => {
                self.start_round();
            }
            Task::Reset(step) => self.apply_reset_step(step),
        }
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        let view = |id: &CardId| {
            self.registry.get(*id).map(|e| CardView {
                id: e.id,
                kind: e.kind,
                zone: e.zone,
            })
        };
        let seats = Seat::ALL
            .into_iter()
            .filter_map(|seat| {
                let player = self.player(seat)?;
                let turn = self.turns.state(seat);
                Some(SeatView {
                    seat,
                    player: player.id(),
                    hand: player.hand().iter().filter_map(view).collect(),
                    helpers: player.helpers().iter().filter_map(view).collect(),
                    has_played: turn.has_played,
                    played_card: turn.played_card,
                    victories: self.victories.victories(player.id()).to_vec(),
                })
            })
            .collect();
        MatchSnapshot {
            started: self.status.started,
            ended: self.status.ended,
            winner: self.status.winner,
            resetting: self.resetting,
            rounds_played: self.rounds.counter(),
            round: self.rounds.current().map(|r| RoundView {
                number: r.number,
                time_remaining_ms: millis(r.time_remaining),
                phase: r.phase,
            }),
            seats,
        }
    }
}
