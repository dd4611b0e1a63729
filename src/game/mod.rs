//! Match domain model and turn derivation

pub mod cursor;
pub mod snapshot;

pub use cursor::{active_turn, can_play, turn_status, ActiveTurn, Role, TurnStatus};
pub use snapshot::{
    Commitment, MatchSnapshot, MatchWinner, Move, PendingMove, PlayerRef, Turn, TurnWinner,
};
