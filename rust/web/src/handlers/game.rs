use crate::errors::IntoErrorResponse;
use crate::session::{SessionError, SessionId, SessionManager};
use hilvan_engine::config::MatchConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

/// Optional overrides applied on top of the server's match defaults.
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    pub seed: Option<u64>,
    pub round_secs: Option<u64>,
    pub initial_hand_size: Option<usize>,
    pub resolve_when_all_committed: Option<bool>,
}

impl CreateSessionRequest {
    pub fn into_config(self, defaults: &MatchConfig) -> MatchConfig {
        let mut config = defaults.clone();
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(secs) = self.round_secs {
            config.round_duration = Duration::from_secs(secs);
        }
        if let Some(size) = self.initial_hand_size {
            config.initial_hand_size = size;
        }
        if let Some(early) = self.resolve_when_all_committed {
            config.resolve_when_all_committed = early;
        }
        config
    }
}

/// Creates a match session.
///
/// `POST /api/sessions` with an optional JSON body of overrides
/// (`seed`, `round_secs`, `initial_hand_size`, `resolve_when_all_committed`).
/// Answers `201 Created` with the session info, or `400` when the resulting
/// configuration is invalid.
pub async fn create_session(
    sessions: Arc<SessionManager>,
    request: CreateSessionRequest,
) -> Response {
    let config = request.into_config(sessions.defaults());
    let created = sessions
        .create_session(Some(config))
        .and_then(|id| sessions.info(&id));
    match created {
        Ok(info) => success_response(StatusCode::CREATED, info),
        Err(err) => session_error(err),
    }
}

/// `GET /api/sessions/{sid}`: seats, status and effective configuration.
pub async fn get_session(sessions: Arc<SessionManager>, session_id: SessionId) -> Response {
    match sessions.info(&session_id) {
        Ok(info) => success_response(StatusCode::OK, info),
        Err(err) => session_error(err),
    }
}

/// `GET /api/sessions/{sid}/state`: full snapshot for re-synchronization.
pub async fn get_session_state(sessions: Arc<SessionManager>, session_id: SessionId) -> Response {
    match sessions.state(&session_id) {
        Ok(state) => success_response(StatusCode::OK, state),
        Err(err) => session_error(err),
    }
}

pub async fn delete_session(sessions: Arc<SessionManager>, session_id: SessionId) -> Response {
    match sessions.delete_session(&session_id) {
        Ok(()) => reply::with_status(warp::reply(), StatusCode::NO_CONTENT).into_response(),
        Err(err) => session_error(err),
    }
}

pub(crate) fn success_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    reply::with_status(reply::json(&body), status).into_response()
}

pub(crate) fn session_error(err: SessionError) -> Response {
    err.into_http_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_given_fields() {
        let defaults = MatchConfig::default();
        let request = CreateSessionRequest {
            seed: Some(9),
            round_secs: Some(30),
            ..Default::default()
        };
        let config = request.into_config(&defaults);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.round_duration, Duration::from_secs(30));
        assert_eq!(config.initial_hand_size, defaults.initial_hand_size);
        assert!(config.resolve_when_all_committed);
    }
}
