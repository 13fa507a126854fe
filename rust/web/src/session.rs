use chrono::{DateTime, Utc};
use hilvan_engine::config::MatchConfig;
use hilvan_engine::errors::{CommandOutcome, GameError};
use hilvan_engine::events::{MatchEvent, MatchSnapshot};
use hilvan_engine::game::Match;
use hilvan_engine::player::{PlayerId, Seat};
use hilvan_engine::registry::CardId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

use crate::config::MatchSettings;
use crate::events::{EventBus, GameEvent};
use crate::metrics::MetricsCollector;

pub type SessionId = String;

const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// A command sent by a seated connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Deal,
    Start,
    Play { card_id: CardId },
    ResetFlag,
}

impl PlayerCommand {
    pub fn name(&self) -> &'static str {
        match self {
            PlayerCommand::Deal => "deal",
            PlayerCommand::Start => "start",
            PlayerCommand::Play { .. } => "play",
            PlayerCommand::ResetFlag => "reset_flag",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JoinResponse {
    pub session_id: SessionId,
    pub player_id: PlayerId,
    pub seat: Seat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatInfo {
    pub seat: Seat,
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub created_at: String,
    pub seed: u64,
    pub started: bool,
    pub ended: bool,
    pub resetting: bool,
    pub players: Vec<SeatInfo>,
    pub config: MatchSettings,
}

/// One hosted match and its event sequence counter.
pub struct MatchSession {
    id: SessionId,
    game: Mutex<Match>,
    seq: AtomicU64,
    created_at: DateTime<Utc>,
    last_active: Mutex<Instant>,
}

impl std::fmt::Debug for MatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchSession")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("seq", &self.seq.load(Ordering::Relaxed))
            .finish()
    }
}

impl MatchSession {
    fn new(id: SessionId, game: Match) -> Self {
        Self {
            id,
            game: Mutex::new(game),
            seq: AtomicU64::new(0),
            created_at: Utc::now(),
            last_active: Mutex::new(Instant::now()),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    fn lock(&self) -> Result<MutexGuard<'_, Match>, SessionError> {
        self.game.lock().map_err(|_| SessionError::StoragePoisoned)
    }

    fn touch(&self) {
        if let Ok(mut guard) = self.last_active.lock() {
            *guard = Instant::now();
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        match self.last_active.lock() {
            Ok(last) => last.elapsed() >= ttl,
            Err(_) => false,
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::AcqRel) + 1
    }
}

#[derive(Debug)]
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, Arc<MatchSession>>>,
    event_bus: Arc<EventBus>,
    metrics: MetricsCollector,
    session_ttl: Duration,
    defaults: MatchConfig,
}

impl SessionManager {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self::with_ttl(event_bus, DEFAULT_SESSION_TTL)
    }

    pub fn with_ttl(event_bus: Arc<EventBus>, ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            event_bus,
            metrics: MetricsCollector::new(),
            session_ttl: ttl,
            defaults: MatchConfig::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: MatchConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn defaults(&self) -> &MatchConfig {
        &self.defaults
    }

    /// Creates a match. `config` falls back to the manager defaults.
    pub fn create_session(&self, config: Option<MatchConfig>) -> Result<SessionId, SessionError> {
        let config = config.unwrap_or_else(|| self.defaults.clone());
        let game = Match::new(config)?;
        let id = Uuid::new_v4().to_string();

        tracing::info!(session_id = %id, seed = game.seed(), "creating match session");

        let session = Arc::new(MatchSession::new(id.clone(), game));
        {
            let mut guard = self
                .sessions
                .write()
                .map_err(|_| SessionError::StoragePoisoned)?;
            guard.insert(id.clone(), session);
        }
        self.metrics.increment_active_sessions();
        Ok(id)
    }

    pub fn get_session(&self, id: &SessionId) -> Result<Arc<MatchSession>, SessionError> {
        let guard = self
            .sessions
            .read()
            .map_err(|_| SessionError::StoragePoisoned)?;
        guard
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    /// Looks up a session for a client request, expiring it when idle too long.
    fn live_session(&self, id: &SessionId) -> Result<Arc<MatchSession>, SessionError> {
        let session = self.get_session(id)?;
        if session.is_expired(self.session_ttl) {
            self.expire_session(id, "expired due to inactivity")?;
            return Err(SessionError::Expired(id.clone()));
        }
        session.touch();
        Ok(session)
    }

    pub fn info(&self, id: &SessionId) -> Result<SessionInfo, SessionError> {
        let session = self.live_session(id)?;
        let game = session.lock()?;
        let status = game.status();
        let players = Seat::ALL
            .into_iter()
            .filter_map(|seat| {
                game.player_at(seat)
                    .map(|player_id| SeatInfo { seat, player_id })
            })
            .collect();
        Ok(SessionInfo {
            session_id: id.clone(),
            created_at: session.created_at.to_rfc3339(),
            seed: game.seed(),
            started: status.started,
            ended: status.ended,
            resetting: game.is_resetting(),
            players,
            config: MatchSettings::from(game.config()),
        })
    }

    pub fn state(&self, id: &SessionId) -> Result<MatchSnapshot, SessionError> {
        let session = self.live_session(id)?;
        let game = session.lock()?;
        Ok(game.snapshot())
    }

    pub fn join(&self, id: &SessionId) -> Result<JoinResponse, SessionError> {
        let session = self.live_session(id)?;
        let mut game = session.lock()?;
        let (player_id, seat) = game.add_player().map_err(|e| match e {
            GameError::SeatsFull => SessionError::SeatsFull(id.clone()),
            other => SessionError::Engine(other),
        })?;
        self.publish(&session, &mut game);
        Ok(JoinResponse {
            session_id: id.clone(),
            player_id,
            seat,
        })
    }

    pub fn leave(&self, id: &SessionId, player: PlayerId) -> Result<(), SessionError> {
        let session = self.live_session(id)?;
        let mut game = session.lock()?;
        game.remove_player(player).map_err(|_| SessionError::PlayerNotFound {
            session_id: id.clone(),
            player_id: player,
        })?;
        self.publish(&session, &mut game);
        Ok(())
    }

    /// Runs a player command. Engine rejections come back as an outcome,
    /// not as an error.
    pub fn command(
        &self,
        id: &SessionId,
        player: PlayerId,
        command: PlayerCommand,
    ) -> Result<CommandOutcome, SessionError> {
        let session = self.live_session(id)?;
        let mut game = session.lock()?;
        if game.seat_of(player).is_none() {
            return Err(SessionError::PlayerNotFound {
                session_id: id.clone(),
                player_id: player,
            });
        }

        let outcome = match command {
            PlayerCommand::Deal => game.deal_cards(player),
            PlayerCommand::Start => game.request_start(player),
            PlayerCommand::Play { card_id } => game.submit_play(player, card_id),
            PlayerCommand::ResetFlag => game.reset_played_flag(player),
        };
        match outcome.rejection() {
            Some(reason) => tracing::info!(
                session_id = %id,
                player = %player,
                command = command.name(),
                %reason,
                "command rejected"
            ),
            None => tracing::debug!(
                session_id = %id,
                player = %player,
                command = command.name(),
                "command applied"
            ),
        }
        self.metrics.record_command(outcome.is_applied());
        self.publish(&session, &mut game);
        Ok(outcome)
    }

    /// Advances every match by `dt` and broadcasts what happened.
    pub fn tick_all(&self, dt: Duration) {
        let sessions: Vec<Arc<MatchSession>> = match self.sessions.read() {
            Ok(guard) => guard.values().cloned().collect(),
            Err(_) => {
                tracing::error!("session storage poisoned, skipping tick");
                return;
            }
        };
        for session in sessions {
            match session.lock() {
                Ok(mut game) => {
                    game.tick(dt);
                    self.publish(&session, &mut game);
                }
                Err(_) => {
                    tracing::error!(session_id = %session.id(), "match lock poisoned, closing session");
                    self.event_bus.broadcast(
                        &session.id,
                        GameEvent::Error {
                            session_id: session.id.clone(),
                            message: "match state is unrecoverable".to_string(),
                        },
                    );
                    if let Err(err) = self.remove_session(&session.id, "match_failed") {
                        tracing::error!(session_id = %session.id(), error = %err, "failed to remove session");
                    }
                }
            }
        }
    }

    /// Drains the match outbox onto the event bus. Runs under the match lock
    /// so sequence numbers follow outbox order.
    fn publish(&self, session: &MatchSession, game: &mut Match) {
        for event in game.drain_events() {
            match &event {
                MatchEvent::BattleResolved { .. } | MatchEvent::RoundSkipped { .. } => {
                    self.metrics.record_round_resolved()
                }
                MatchEvent::GameEnded { .. } => self.metrics.record_match_completed(),
                _ => {}
            }
            let envelope = GameEvent::Match {
                session_id: session.id.clone(),
                seq: session.next_seq(),
                ts: Utc::now().to_rfc3339(),
                event,
            };
            self.event_bus.broadcast(&session.id, envelope);
            self.metrics.record_event_broadcast();
        }
    }

    pub fn delete_session(&self, id: &SessionId) -> Result<(), SessionError> {
        if self.remove_session(id, "terminated_by_request")?.is_some() {
            Ok(())
        } else {
            Err(SessionError::NotFound(id.clone()))
        }
    }

    /// Removes every session idle for longer than the TTL. Returns how many
    /// were removed.
    pub fn cleanup_expired_sessions(&self) -> usize {
        let mut expired = Vec::new();
        {
            let mut guard = match self.sessions.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.retain(|id, session| {
                if session.is_expired(self.session_ttl) {
                    expired.push(id.clone());
                    false
                } else {
                    true
                }
            });
        }

        for id in &expired {
            tracing::info!(session_id = %id, "session expired");
            self.close_subscribers(id, "expired");
            self.metrics.decrement_active_sessions();
        }
        expired.len()
    }

    pub fn active_sessions(&self) -> Vec<SessionId> {
        match self.sessions.read() {
            Ok(guard) => guard.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    fn expire_session(&self, id: &SessionId, reason: &str) -> Result<(), SessionError> {
        self.remove_session(id, reason).map(|_| ())
    }

    fn remove_session(
        &self,
        id: &SessionId,
        reason: &str,
    ) -> Result<Option<Arc<MatchSession>>, SessionError> {
        let removed = match self.sessions.write() {
            Ok(mut guard) => guard.remove(id),
            Err(_) => return Err(SessionError::StoragePoisoned),
        };
        if removed.is_some() {
            tracing::info!(session_id = %id, reason, "session closed");
            self.close_subscribers(id, reason);
            self.metrics.decrement_active_sessions();
        }
        Ok(removed)
    }

    fn close_subscribers(&self, id: &SessionId, reason: &str) {
        self.event_bus.broadcast(
            id,
            GameEvent::SessionClosed {
                session_id: id.clone(),
                reason: reason.to_string(),
            },
        );
        self.event_bus.drop_session(id);
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),
    #[error("Session expired: {0}")]
    Expired(SessionId),
    #[error("Player {player_id} is not seated in session {session_id}")]
    PlayerNotFound {
        session_id: SessionId,
        player_id: PlayerId,
    },
    #[error("Both seats are taken in session {0}")]
    SeatsFull(SessionId),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Match error: {0}")]
    Engine(#[from] GameError),
    #[error("Session storage poisoned")]
    StoragePoisoned,
}

impl crate::errors::IntoErrorResponse for SessionError {
    fn status_code(&self) -> warp::http::StatusCode {
        use warp::http::StatusCode;
        match self {
            SessionError::NotFound(_) | SessionError::PlayerNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            SessionError::Expired(_) => StatusCode::GONE,
            SessionError::SeatsFull(_) => StatusCode::CONFLICT,
            SessionError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            SessionError::Engine(GameError::InvalidConfig(_)) => StatusCode::BAD_REQUEST,
            SessionError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SessionError::StoragePoisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SessionError::NotFound(_) => "session_not_found",
            SessionError::Expired(_) => "session_expired",
            SessionError::PlayerNotFound { .. } => "player_not_found",
            SessionError::SeatsFull(_) => "seats_full",
            SessionError::InvalidRequest(_) => "invalid_request",
            SessionError::Engine(GameError::InvalidConfig(_)) => "invalid_config",
            SessionError::Engine(_) => "engine_error",
            SessionError::StoragePoisoned => "session_storage_error",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            SessionError::NotFound(id) | SessionError::SeatsFull(id) => {
                Some(serde_json::json!({ "session_id": id }))
            }
            SessionError::Expired(id) => Some(serde_json::json!({
                "session_id": id,
                "reason": "Session expired due to inactivity"
            })),
            SessionError::PlayerNotFound {
                session_id,
                player_id,
            } => Some(serde_json::json!({
                "session_id": session_id,
                "player_id": player_id,
            })),
            _ => None,
        }
    }

    fn severity(&self) -> crate::errors::ErrorSeverity {
        use crate::errors::ErrorSeverity;
        match self {
            SessionError::StoragePoisoned => ErrorSeverity::Critical,
            SessionError::Engine(GameError::InvalidConfig(_)) => ErrorSeverity::Client,
            SessionError::Engine(_) => ErrorSeverity::Server,
            _ => ErrorSeverity::Client,
        }
    }
}
