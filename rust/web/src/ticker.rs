//! Background task that drives every hosted match clock.
//!
//! The engine never reads a clock itself. This loop measures real elapsed
//! time between ticks and feeds it to [`SessionManager::tick_all`], and
//! periodically evicts idle sessions.

use hilvan_engine::scheduler::millis;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::session::SessionManager;

#[derive(Debug, Clone, Copy)]
pub struct TickerSettings {
    pub tick_interval: Duration,
    pub cleanup_interval: Duration,
}

pub fn spawn_ticker(
    sessions: Arc<SessionManager>,
    settings: TickerSettings,
    mut shutdown: oneshot::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = time::interval(settings.tick_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cleanup = time::interval(settings.cleanup_interval);
        cleanup.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick of an interval completes immediately
        cleanup.tick().await;

        let mut last = Instant::now();
        tracing::info!(
            tick_ms = millis(settings.tick_interval),
            cleanup_secs = settings.cleanup_interval.as_secs(),
            "match ticker started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticks.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last);
                    last = now;
                    tracing::trace!(dt_ms = millis(dt), "ticking matches");
                    sessions.tick_all(dt);
                }
                _ = cleanup.tick() => {
                    let removed = sessions.cleanup_expired_sessions();
                    if removed > 0 {
                        tracing::info!(removed, "evicted idle sessions");
                    }
                    sessions.metrics().log_metrics();
                }
            }
        }

        tracing::info!("match ticker stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use hilvan_engine::config::MatchConfig;

    #[tokio::test(start_paused = true)]
    async fn ticker_advances_match_clocks() {
        let sessions = Arc::new(
            SessionManager::new(Arc::new(EventBus::new()))
                .with_defaults(MatchConfig::default().with_seed(1)),
        );
        let id = sessions.create_session(None).unwrap();
        let a = sessions.join(&id).unwrap().player_id;
        let b = sessions.join(&id).unwrap().player_id;
        sessions
            .command(&id, a, crate::session::PlayerCommand::Deal)
            .unwrap();
        sessions
            .command(&id, b, crate::session::PlayerCommand::Deal)
            .unwrap();
        let before = sessions.state(&id).unwrap().round.unwrap().time_remaining_ms;

        let (tx, rx) = oneshot::channel();
        let handle = spawn_ticker(
            Arc::clone(&sessions),
            TickerSettings {
                tick_interval: Duration::from_millis(100),
                cleanup_interval: Duration::from_secs(60),
            },
            rx,
        );
        time::sleep(Duration::from_secs(2)).await;
        tx.send(()).unwrap();
        handle.await.unwrap();

        let after = sessions.state(&id).unwrap().round.unwrap().time_remaining_ms;
        assert!(after < before);
    }
}
