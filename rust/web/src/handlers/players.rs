//! Seat management and player commands.
//!
//! Every command path carries the sending connection's player handle. An
//! engine rejection is a normal answer here: it comes back as
//! `202 Accepted` with `{"outcome":"rejected","reason":...}` so clients
//! reconcile through the event stream.
use crate::handlers::game::{session_error, success_response};
use crate::session::{PlayerCommand, SessionId, SessionManager};
use hilvan_engine::errors::CommandOutcome;
use hilvan_engine::player::PlayerId;
use hilvan_engine::registry::CardId;
use serde::Deserialize;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    pub card_id: CardId,
}

/// `POST /api/sessions/{sid}/players`: takes the first free seat.
pub async fn join(sessions: Arc<SessionManager>, session_id: SessionId) -> Response {
    match sessions.join(&session_id) {
        Ok(joined) => success_response(StatusCode::CREATED, joined),
        Err(err) => session_error(err),
    }
}

/// `DELETE /api/sessions/{sid}/players/{pid}`: disconnect.
pub async fn leave(sessions: Arc<SessionManager>, session_id: SessionId, player: u64) -> Response {
    match sessions.leave(&session_id, PlayerId::new(player)) {
        Ok(()) => reply::with_status(warp::reply(), StatusCode::NO_CONTENT).into_response(),
        Err(err) => session_error(err),
    }
}

pub async fn command(
    sessions: Arc<SessionManager>,
    session_id: SessionId,
    player: u64,
    command: PlayerCommand,
) -> Response {
    match sessions.command(&session_id, PlayerId::new(player), command) {
        Ok(outcome) => outcome_response(outcome),
        Err(err) => session_error(err),
    }
}

pub(crate) fn outcome_response(outcome: CommandOutcome) -> Response {
    let status = if outcome.is_applied() {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    success_response(status, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hilvan_engine::errors::Rejection;

    #[test]
    fn rejections_are_accepted_not_errors() {
        let response = outcome_response(CommandOutcome::Rejected(Rejection::AlreadyPlayed));
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            outcome_response(CommandOutcome::Applied).status(),
            StatusCode::OK
        );
    }

    #[test]
    fn play_request_takes_raw_card_number() {
        let request: PlayRequest = serde_json::from_str(r#"{"card_id": 12}"#).unwrap();
        assert_eq!(request.card_id, CardId::new(12));
    }
}
