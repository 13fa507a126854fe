//! # hilvan-engine: Card Battle Match Core
//!
//! The authoritative game logic of a real-time, two-player card battle.
//! Decides when rounds start and end, which plays are legal, who wins each
//! round and the match, and how a finished match is torn down and restarted.
//!
//! The engine performs no I/O and never reads a clock. A host feeds it
//! commands one at a time and advances it with [`game::Match::tick`]; every
//! state transition leaves a [`events::MatchEvent`] in the match outbox.
//!
//! ## Core Modules
//!
//! - [`cards`] - Elements, colors, star levels and card templates
//! - [`battle`] - Elemental dominance cycle and card comparison
//! - [`pool`] - Seeded card pool used for dealing
//! - [`registry`] - Card entity handles, owners and zones
//! - [`player`] - Player handles and the two seats
//! - [`turn`] - One commit per player per round, forced plays on timeout
//! - [`victory`] - Recorded wins and the two win clauses
//! - [`round`] - Round timer and the resolution pipeline
//! - [`scheduler`] - Delayed tasks on the match clock
//! - [`lifecycle`] - Start barrier and the end-of-match reset sequence
//! - [`game`] - The `Match` aggregate and its command surface
//! - [`events`] - Notifications and snapshots sent to clients
//! - [`config`] - Match timings and sizes
//! - [`errors`] - Hard errors and command rejections
//!
//! ## Quick Start
//!
//! ```rust
//! use hilvan_engine::battle::{compare, BattleOutcome};
//! use hilvan_engine::cards::{Card, Color, Element};
//!
//! let tela = Card::with_level(Element::Tela, Color::Rojo, 2).unwrap();
//! let stronger = Card::with_level(Element::Tela, Color::Verde, 3).unwrap();
//! assert_eq!(compare(&tela, &stronger), BattleOutcome::WinB);
//! ```
//!
//! ## Driving a Match
//!
//! ```rust
//! use std::time::Duration;
//! use hilvan_engine::config::MatchConfig;
//! use hilvan_engine::game::Match;
//!
//! let mut m = Match::new(MatchConfig::default().with_seed(42)).unwrap();
//! let (a, _) = m.add_player().unwrap();
//! let (b, _) = m.add_player().unwrap();
//! m.deal_cards(a);
//! m.deal_cards(b);
//!
//! // nobody plays: the timer runs out and both plays are forced
//! m.tick(Duration::from_secs(15));
//! assert!(m.turns().all_committed());
//! for event in m.drain_events() {
//!     println!("{}", event.kind());
//! }
//! ```

pub mod battle;
pub mod cards;
pub mod config;
pub mod errors;
pub mod events;
pub mod game;
pub mod lifecycle;
pub mod player;
pub mod pool;
pub mod registry;
pub mod round;
pub mod scheduler;
pub mod turn;
pub mod victory;
