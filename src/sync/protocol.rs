//! Push feed wire protocol
//!
//! Each feed delivery is one JSON event `{type, matchId, payload}` or an
//! ordered array of them. The six event kinds mirror the server's feed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::game::{PlayerRef, TurnWinner};

/// Decoded push event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchEvent {
    Player1Join {
        #[serde(rename = "matchId")]
        match_id: Uuid,
        payload: JoinPayload,
    },
    Player2Join {
        #[serde(rename = "matchId")]
        match_id: Uuid,
        payload: JoinPayload,
    },
    NewTurn {
        #[serde(rename = "matchId")]
        match_id: Uuid,
        #[serde(default)]
        payload: NewTurnPayload,
    },
    Player1Moved {
        #[serde(rename = "matchId")]
        match_id: Uuid,
    },
    Player2Moved {
        #[serde(rename = "matchId")]
        match_id: Uuid,
    },
    TurnEnded {
        #[serde(rename = "matchId")]
        match_id: Uuid,
        payload: TurnEndedPayload,
    },
    MatchEnded {
        #[serde(rename = "matchId")]
        match_id: Uuid,
        payload: MatchEndedPayload,
    },
}

impl MatchEvent {
    pub fn match_id(&self) -> Uuid {
        match self {
            MatchEvent::Player1Join { match_id, .. }
            | MatchEvent::Player2Join { match_id, .. }
            | MatchEvent::NewTurn { match_id, .. }
            | MatchEvent::Player1Moved { match_id }
            | MatchEvent::Player2Moved { match_id }
            | MatchEvent::TurnEnded { match_id, .. }
            | MatchEvent::MatchEnded { match_id, .. } => *match_id,
        }
    }

    /// Event kind label for logging
    pub fn kind(&self) -> &'static str {
        match self {
            MatchEvent::Player1Join { .. } => "PLAYER1_JOIN",
            MatchEvent::Player2Join { .. } => "PLAYER2_JOIN",
            MatchEvent::NewTurn { .. } => "NEW_TURN",
            MatchEvent::Player1Moved { .. } => "PLAYER1_MOVED",
            MatchEvent::Player2Moved { .. } => "PLAYER2_MOVED",
            MatchEvent::TurnEnded { .. } => "TURN_ENDED",
            MatchEvent::MatchEnded { .. } => "MATCH_ENDED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinPayload {
    pub user: PlayerRef,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewTurnPayload {
    /// Index of the newly opened turn, when the server includes it
    #[serde(default)]
    pub turn: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnEndedPayload {
    pub winner: TurnWinner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEndedPayload {
    /// Winner username, or the "draw" sentinel
    pub winner: String,
}

/// Normalize one raw payload into an ordered event sequence.
///
/// A delivery is a single event or an ordered batch. Elements are decoded
/// one by one; an event of a kind this client does not know is skipped
/// without taking its siblings down with it. `Err` means the payload was
/// not valid JSON at all.
pub fn decode_delivery(raw: &str) -> Result<Vec<MatchEvent>, serde_json::Error> {
    let value: Value = serde_json::from_str(raw)?;
    let elements = match value {
        Value::Array(items) => items,
        single => vec![single],
    };

    let mut events = Vec::with_capacity(elements.len());
    for element in elements {
        match serde_json::from_value::<MatchEvent>(element) {
            Ok(event) => events.push(event),
            Err(e) => warn!(error = %e, "unrecognized event in delivery skipped"),
        }
    }
    Ok(events)
}
