//! Match snapshot domain types
//!
//! A snapshot is the locally held copy of one match's authoritative state.
//! Turns are append-only and 1-indexed to match server turn numbering:
//! once applied locally the sequence is never reordered or truncated.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three playable moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

/// A player's move commitment for one turn.
///
/// `Hidden` marks a move the remote player has submitted but the server has
/// not yet revealed to this client. It is a dedicated sentinel so it can
/// never be confused with a real move value or with an empty slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Commitment {
    #[default]
    Unset,
    Hidden,
    Revealed(Move),
}

impl Commitment {
    /// Whether a move has been committed, hidden or revealed
    pub fn is_set(&self) -> bool {
        !matches!(self, Commitment::Unset)
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Commitment::Unset)
    }

    /// The committed move, if revealed
    pub fn revealed(&self) -> Option<Move> {
        match self {
            Commitment::Revealed(mv) => Some(*mv),
            _ => None,
        }
    }
}

// The server sends a commitment as a lowercase move string, or omits the
// field entirely for an empty slot. `Hidden` only ever originates from a
// local patch but still round-trips for diagnostics.
impl Serialize for Commitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Commitment::Unset => serializer.serialize_none(),
            Commitment::Hidden => serializer.serialize_str("hidden"),
            Commitment::Revealed(mv) => mv.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Commitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref() {
            None => Ok(Commitment::Unset),
            Some("hidden") => Ok(Commitment::Hidden),
            Some("rock") => Ok(Commitment::Revealed(Move::Rock)),
            Some("paper") => Ok(Commitment::Revealed(Move::Paper)),
            Some("scissors") => Ok(Commitment::Revealed(Move::Scissors)),
            Some(other) => Err(de::Error::unknown_variant(
                other,
                &["rock", "paper", "scissors", "hidden"],
            )),
        }
    }
}

/// Winner of a single turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnWinner {
    Player1,
    Player2,
    Draw,
}

/// One round within a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// 1-based positional index, matching server turn numbering
    #[serde(rename = "id")]
    pub index: u32,
    #[serde(rename = "user1", default)]
    pub player1: Commitment,
    #[serde(rename = "user2", default)]
    pub player2: Commitment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<TurnWinner>,
}

impl Turn {
    /// A fresh turn with no commitments
    pub fn empty(index: u32) -> Self {
        Self {
            index,
            player1: Commitment::Unset,
            player2: Commitment::Unset,
            winner: None,
        }
    }

    /// A turn is resolved once it has a winner or both seats have committed
    pub fn is_resolved(&self) -> bool {
        self.winner.is_some() || (self.player1.is_set() && self.player2.is_set())
    }
}

/// Reference to a player identity as known to the match server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
}

/// Match-level outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchWinner {
    Player(String),
    Draw,
}

// Wire shape is `{"username": "..."}` where the server uses the literal
// username "draw" to mark a drawn match.
impl Serialize for MatchWinner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            username: &'a str,
        }
        let username = match self {
            MatchWinner::Player(name) => name.as_str(),
            MatchWinner::Draw => "draw",
        };
        Wire { username }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MatchWinner {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Wire {
            username: String,
        }
        let wire = Wire::deserialize(deserializer)?;
        if wire.username == "draw" {
            Ok(MatchWinner::Draw)
        } else {
            Ok(MatchWinner::Player(wire.username))
        }
    }
}

/// Locally held copy of one match's authoritative state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "user1")]
    pub player1: PlayerRef,
    /// Absent until a second player joins
    #[serde(rename = "user2", default)]
    pub player2: Option<PlayerRef>,
    #[serde(default)]
    pub turns: Vec<Turn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<MatchWinner>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl MatchSnapshot {
    /// Look up a turn by its 1-based index
    pub fn turn(&self, index: u32) -> Option<&Turn> {
        if index == 0 {
            return None;
        }
        self.turns.get(index as usize - 1)
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Index the next appended turn would take
    pub fn next_turn_index(&self) -> u32 {
        self.turns.len() as u32 + 1
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }
}

/// At most one outstanding client-submitted move per match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMove {
    /// The turn the submission targets
    pub turn_index: u32,
    pub mv: Move,
}
