pub mod game;
pub mod health;
pub mod players;
pub mod sse;

pub use game::{
    create_session, delete_session, get_session, get_session_state, CreateSessionRequest,
};
pub use health::{health, metrics};
pub use players::{command, join, leave, PlayRequest};
pub use sse::stream_events;
