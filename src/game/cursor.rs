//! Turn cursor: pure derivation of the active turn and play predicate
//!
//! Everything here is a pure function of `(snapshot, role, pending move)`.
//! The presentation layer calls these on every render; they never touch the
//! network or the store.

use super::snapshot::{Commitment, MatchSnapshot, PendingMove};

/// Which seat the local player occupies in a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player1,
    Player2,
}

/// Enumerated turn state shown to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    WaitingForOpponentJoin,
    MatchOver,
    WaitingForOpponentMove,
    YourTurn,
    OpponentTurn,
}

/// The turn a move submitted right now would target.
///
/// When the last stored turn is already resolved the cursor materializes an
/// empty placeholder at the next index; the server will create the real turn
/// on first submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveTurn {
    pub index: u32,
    pub player1: Commitment,
    pub player2: Commitment,
}

/// Determine the active turn, if the match has progressed far enough to
/// have one. `None` until a second player joins.
pub fn active_turn(snapshot: &MatchSnapshot) -> Option<ActiveTurn> {
    if let Some(last) = snapshot.last_turn() {
        if last.is_resolved() {
            Some(ActiveTurn {
                index: snapshot.next_turn_index(),
                player1: Commitment::Unset,
                player2: Commitment::Unset,
            })
        } else {
            Some(ActiveTurn {
                index: snapshot.turns.len() as u32,
                player1: last.player1,
                player2: last.player2,
            })
        }
    } else if snapshot.player2.is_some() {
        Some(ActiveTurn {
            index: 1,
            player1: Commitment::Unset,
            player2: Commitment::Unset,
        })
    } else {
        None
    }
}

/// Whether the local player may submit a move right now.
///
/// Player 1 always commits first on a fresh turn; player 2 may only commit
/// once player 1 has. Resolution itself compares the two committed values
/// without ordering bias, server-side.
pub fn can_play(snapshot: &MatchSnapshot, role: Role, pending: Option<&PendingMove>) -> bool {
    if pending.is_some() {
        return false;
    }
    if snapshot.player2.is_none() || snapshot.is_over() {
        return false;
    }
    let Some(active) = active_turn(snapshot) else {
        return false;
    };
    match role {
        Role::Player1 => active.player1.is_unset(),
        Role::Player2 => active.player2.is_unset() && active.player1.is_set(),
    }
}

/// Enumerated status for the local player's view of the match
pub fn turn_status(snapshot: &MatchSnapshot, role: Role, pending: Option<&PendingMove>) -> TurnStatus {
    if snapshot.player2.is_none() {
        return TurnStatus::WaitingForOpponentJoin;
    }
    if snapshot.is_over() {
        return TurnStatus::MatchOver;
    }
    if pending.is_some() {
        return TurnStatus::WaitingForOpponentMove;
    }
    if can_play(snapshot, role, pending) {
        TurnStatus::YourTurn
    } else {
        TurnStatus::OpponentTurn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::snapshot::{MatchWinner, Move, PlayerRef, Turn, TurnWinner};
    use chrono::Utc;
    use uuid::Uuid;

    fn player(name: &str) -> PlayerRef {
        PlayerRef {
            id: Uuid::new_v4(),
            username: name.into(),
        }
    }

    fn two_player_match() -> MatchSnapshot {
        MatchSnapshot {
            id: Uuid::new_v4(),
            player1: player("alice"),
            player2: Some(player("bob")),
            turns: Vec::new(),
            winner: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn no_active_turn_before_opponent_joins() {
        let mut snapshot = two_player_match();
        snapshot.player2 = None;
        assert_eq!(active_turn(&snapshot), None);
        assert!(!can_play(&snapshot, Role::Player1, None));
        assert_eq!(
            turn_status(&snapshot, Role::Player1, None),
            TurnStatus::WaitingForOpponentJoin
        );
    }

    #[test]
    fn first_turn_materializes_once_both_players_present() {
        let snapshot = two_player_match();
        let active = active_turn(&snapshot).unwrap();
        assert_eq!(active.index, 1);
        assert!(can_play(&snapshot, Role::Player1, None));
        assert!(!can_play(&snapshot, Role::Player2, None));
        assert_eq!(turn_status(&snapshot, Role::Player1, None), TurnStatus::YourTurn);
        assert_eq!(
            turn_status(&snapshot, Role::Player2, None),
            TurnStatus::OpponentTurn
        );
    }

    #[test]
    fn player2_may_move_once_player1_has_committed() {
        let mut snapshot = two_player_match();
        snapshot.turns.push(Turn {
            index: 1,
            player1: Commitment::Revealed(Move::Rock),
            player2: Commitment::Unset,
            winner: None,
        });
        assert!(!can_play(&snapshot, Role::Player1, None));
        assert!(can_play(&snapshot, Role::Player2, None));
    }

    #[test]
    fn hidden_commitment_counts_as_committed_for_ordering() {
        let mut snapshot = two_player_match();
        snapshot.turns.push(Turn {
            index: 1,
            player1: Commitment::Hidden,
            player2: Commitment::Unset,
            winner: None,
        });
        assert!(!can_play(&snapshot, Role::Player1, None));
        assert!(can_play(&snapshot, Role::Player2, None));
    }

    #[test]
    fn resolved_last_turn_advances_active_index() {
        let mut snapshot = two_player_match();
        snapshot.turns.push(Turn {
            index: 1,
            player1: Commitment::Revealed(Move::Rock),
            player2: Commitment::Revealed(Move::Scissors),
            winner: Some(TurnWinner::Player1),
        });
        let active = active_turn(&snapshot).unwrap();
        assert_eq!(active.index, 2);
        assert_eq!(active.player1, Commitment::Unset);
        assert!(can_play(&snapshot, Role::Player1, None));
    }

    #[test]
    fn pending_move_blocks_play_regardless_of_snapshot() {
        let snapshot = two_player_match();
        let pending = PendingMove {
            turn_index: 1,
            mv: Move::Rock,
        };
        assert!(!can_play(&snapshot, Role::Player1, Some(&pending)));
        assert_eq!(
            turn_status(&snapshot, Role::Player1, Some(&pending)),
            TurnStatus::WaitingForOpponentMove
        );
    }

    #[test]
    fn finished_match_blocks_play() {
        let mut snapshot = two_player_match();
        snapshot.winner = Some(MatchWinner::Player("alice".into()));
        assert!(!can_play(&snapshot, Role::Player1, None));
        assert!(!can_play(&snapshot, Role::Player2, None));
        assert_eq!(turn_status(&snapshot, Role::Player1, None), TurnStatus::MatchOver);
    }

    #[test]
    fn drawn_match_is_over_for_both_seats() {
        let mut snapshot = two_player_match();
        snapshot.winner = Some(MatchWinner::Draw);
        assert_eq!(turn_status(&snapshot, Role::Player2, None), TurnStatus::MatchOver);
    }
}
