use hilvan_engine::events::MatchEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;

use crate::session::SessionId;

pub const DEFAULT_CHANNEL_BUFFER: usize = 1000;

pub type EventSender = mpsc::Sender<GameEvent>;
pub type EventReceiver = mpsc::Receiver<GameEvent>;

/// Envelope broadcast to every subscriber of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameEvent {
    /// A notification produced by the match.
    Match {
        session_id: SessionId,
        /// Per-session sequence number, starting at 1.
        seq: u64,
        /// RFC 3339 time the event left the server.
        ts: String,
        event: MatchEvent,
    },
    SessionClosed {
        session_id: SessionId,
        reason: String,
    },
    Error {
        session_id: SessionId,
        message: String,
    },
}

impl GameEvent {
    /// Name used as the SSE `event:` field.
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::Match { event, .. } => event.kind(),
            GameEvent::SessionClosed { .. } => "session_closed",
            GameEvent::Error { .. } => "error",
        }
    }
}

pub struct EventSubscription {
    bus: EventBus,
    session_id: SessionId,
    subscriber_id: usize,
    pub receiver: EventReceiver,
}

impl EventSubscription {
    pub fn receiver(&mut self) -> &mut EventReceiver {
        &mut self.receiver
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.session_id, self.subscriber_id);
    }
}

/// Fan-out of session events to SSE subscribers.
///
/// Each subscriber gets a bounded channel; a subscriber whose channel is
/// full or closed is dropped rather than slowing the broadcaster.
#[derive(Debug, Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

#[derive(Debug)]
struct EventBusInner {
    subscribers: RwLock<HashMap<SessionId, Vec<(usize, EventSender)>>>,
    next_id: AtomicUsize,
    buffer: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_buffer(DEFAULT_CHANNEL_BUFFER)
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            inner: Arc::new(EventBusInner {
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicUsize::new(0),
                buffer: buffer.max(1),
            }),
        }
    }

    pub fn subscribe(&self, session_id: SessionId) -> EventSubscription {
        let (subscriber_id, receiver) = self.subscribe_raw(session_id.clone());
        EventSubscription {
            bus: self.clone(),
            session_id,
            subscriber_id,
            receiver,
        }
    }

    fn subscribe_raw(&self, session_id: SessionId) -> (usize, EventReceiver) {
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        let id = self.inner.next_id.fetch_add(1, Ordering::AcqRel);
        let mut guard = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.entry(session_id.clone()).or_default().push((id, tx));

        tracing::info!(
            session_id = %session_id,
            subscriber_id = id,
            "client subscribed to match events"
        );
        (id, rx)
    }

    /// Sends `event` to every subscriber of the session and returns how
    /// many received it.
    pub fn broadcast(&self, session_id: &SessionId, event: GameEvent) -> usize {
        tracing::trace!(session_id = %session_id, event = event.name(), "broadcasting");

        let subscribers = {
            let guard = self
                .inner
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            guard.get(session_id).cloned()
        };
        let Some(list) = subscribers else {
            return 0;
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, sender) in list {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        session_id = %session_id,
                        subscriber_id = id,
                        error = %e,
                        "dropping subscriber that cannot keep up"
                    );
                    failed.push(id);
                }
            }
        }
        if !failed.is_empty() {
            self.remove_subscribers(session_id, &failed);
        }
        delivered
    }

    pub fn unsubscribe(&self, session_id: &SessionId, subscriber_id: usize) {
        self.remove_subscribers(session_id, &[subscriber_id]);
    }

    pub fn drop_session(&self, session_id: &SessionId) {
        let mut guard = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.remove(session_id);
    }

    pub fn subscriber_count(&self) -> usize {
        let guard = self
            .inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        guard.values().map(Vec::len).sum()
    }

    fn remove_subscribers(&self, session_id: &SessionId, ids: &[usize]) {
        let mut guard = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = guard.get_mut(session_id) {
            list.retain(|(id, _)| !ids.contains(id));
            if list.is_empty() {
                guard.remove(session_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed(session: &str) -> GameEvent {
        GameEvent::SessionClosed {
            session_id: session.to_string(),
            reason: "test".into(),
        }
    }

    #[test]
    fn subscription_drop_unsubscribes() {
        let bus = EventBus::new();
        {
            let _sub = bus.subscribe("s".to_string());
            assert_eq!(bus.subscriber_count(), 1);
        }
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn broadcast_is_scoped_to_session() {
        let bus = EventBus::new();
        let mut mine = bus.subscribe("a".to_string());
        let mut other = bus.subscribe("b".to_string());

        assert_eq!(bus.broadcast(&"a".to_string(), closed("a")), 1);
        assert_eq!(mine.receiver.try_recv().unwrap(), closed("a"));
        assert!(other.receiver().try_recv().is_err());
    }

    #[test]
    fn full_subscriber_is_pruned() {
        let bus = EventBus::with_buffer(1);
        let session = "s".to_string();
        let _slow = bus.subscribe(session.clone());
        assert_eq!(bus.broadcast(&session, closed("s")), 1);
        assert_eq!(bus.broadcast(&session, closed("s")), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn match_events_are_named_after_inner_kind() {
        let ev = GameEvent::Match {
            session_id: "s".into(),
            seq: 1,
            ts: "2026-01-01T00:00:00Z".into(),
            event: MatchEvent::GameStarted,
        };
        assert_eq!(ev.name(), "game_started");
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["kind"], "match");
        assert_eq!(json["event"]["type"], "game_started");
    }
}
