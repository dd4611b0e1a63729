//! Real-time match synchronization engine for a two-player
//! rock/paper/scissors client.
//!
//! Keeps a local view of in-progress matches consistent with the
//! server-authoritative state through per-match push subscriptions plus
//! on-demand reconciliation fetches. The engine tolerates out-of-order
//! event delivery, duplicates and dropped connections, and exposes:
//! - the pure turn predicate (`can_play`) and status derivation
//! - optimistic move submission with rollback
//! - read-only snapshot subscriptions for the presentation layer

pub mod api;
pub mod config;
pub mod engine;
pub mod game;
pub mod store;
pub mod sync;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use engine::{MatchEngine, SubmitError};
pub use game::{
    Commitment, MatchSnapshot, MatchWinner, Move, PendingMove, PlayerRef, Role, Turn, TurnStatus,
    TurnWinner,
};
