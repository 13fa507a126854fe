use crate::errors::IntoErrorResponse;
use crate::events::{EventBus, EventSubscription, GameEvent};
use crate::session::{SessionId, SessionManager};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use warp::http;
use warp::reply::{self, Response};
use warp::sse;
use warp::Reply;

/// `GET /api/sessions/{sid}/events`: server-sent stream of [`GameEvent`]s.
pub async fn stream_events(
    session_id: SessionId,
    sessions: Arc<SessionManager>,
    event_bus: Arc<EventBus>,
) -> Response {
    if let Err(err) = sessions.get_session(&session_id) {
        return err.into_http_response();
    }

    let subscription = event_bus.subscribe(session_id);
    tracing::debug!(session_id = %subscription.session_id(), "sse subscriber attached");
    let stream = subscription_stream(subscription);
    let keep_alive = sse::keep_alive()
        .interval(Duration::from_secs(15))
        .text(":keep-alive\n");

    let reply = sse::reply(keep_alive.stream(stream));
    reply::with_header(reply, http::header::CACHE_CONTROL, "no-cache").into_response()
}

fn subscription_stream(
    mut subscription: EventSubscription,
) -> impl tokio_stream::Stream<Item = Result<sse::Event, Infallible>> {
    // the subscription must outlive the stream so it unsubscribes on disconnect
    let (_, placeholder_rx) = mpsc::channel(1);
    let receiver = std::mem::replace(&mut subscription.receiver, placeholder_rx);
    let subscription = Arc::new(subscription);

    ReceiverStream::new(receiver).map(move |event| {
        let _held = Arc::clone(&subscription);
        Ok(render_event(event))
    })
}

pub(crate) fn render_event(event: GameEvent) -> sse::Event {
    let name = event.name();
    let base = match &event {
        GameEvent::Match { seq, .. } => sse::Event::default().id(seq.to_string()),
        _ => sse::Event::default(),
    };
    match serde_json::to_string(&event) {
        Ok(json) => base.event(name).data(json),
        Err(err) => {
            tracing::error!(event = name, error = %err, "failed to serialize game event");
            let fallback = serde_json::json!({
                "kind": "error",
                "message": format!("failed to serialize game event: {err}")
            })
            .to_string();
            sse::Event::default().event("error").data(fallback)
        }
    }
}
