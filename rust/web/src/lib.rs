//! HTTP host for hilvan matches.
//!
//! Each session owns one [`hilvan_engine::game::Match`]. A background ticker
//! feeds real elapsed time to every match, and whatever the matches emit is
//! fanned out to server-sent event subscribers.
pub mod config;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod session;
pub mod ticker;

pub use config::{ConfigError, MatchSettings, ServerSettings, SettingsResolved, ValueSource};
pub use errors::{ErrorResponse, ErrorSeverity, IntoErrorResponse};
pub use events::{EventBus, EventSubscription, GameEvent};
pub use logging::{init_logging, init_test_logging, LogEntry, LogFormat, TestLogSubscriber};
pub use metrics::{MetricsCollector, MetricsSnapshot, RequestTimer};
pub use middleware::{log_response, with_request_logging};
pub use server::{routes, AppContext, ServerError, ServerHandle, WebServer};
pub use session::{
    JoinResponse, MatchSession, PlayerCommand, SeatInfo, SessionError, SessionId, SessionInfo,
    SessionManager,
};
pub use ticker::{spawn_ticker, TickerSettings};
