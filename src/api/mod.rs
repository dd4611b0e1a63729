//! Request/response surface of the authoritative match server

mod client;

pub use client::HttpMatchApi;

use async_trait::async_trait;
use uuid::Uuid;

use crate::game::{MatchSnapshot, Move};

/// Seam over the authoritative match server. The production implementation
/// is [`HttpMatchApi`]; tests substitute scripted fakes.
#[async_trait]
pub trait MatchServer: Send + Sync {
    /// Fetch the full authoritative snapshot for one match
    async fn fetch_match(&self, match_id: Uuid) -> Result<MatchSnapshot, ApiError>;

    /// Submit a move for the given turn. The server owns legality; a refusal
    /// comes back as [`ApiError::Rejected`] with a machine-checkable reason.
    async fn submit_move(&self, match_id: Uuid, turn_index: u32, mv: Move)
        -> Result<(), ApiError>;

    /// Create a new match with the local player in seat 1
    async fn create_match(&self) -> Result<MatchSnapshot, ApiError>;

    /// Join an open match as player 2
    async fn join_match(&self, match_id: Uuid) -> Result<MatchSnapshot, ApiError>;

    /// List every match visible to the local player
    async fn list_matches(&self) -> Result<Vec<MatchSnapshot>, ApiError>;
}

/// Match server errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(reqwest::Error),

    #[error("Move rejected: {0}")]
    Rejected(RejectReason),
}

/// Machine-checkable reasons the server refuses a move
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("not your turn")]
    NotYourTurn,

    #[error("turn already resolved")]
    TurnAlreadyResolved,

    #[error("match is over")]
    MatchOver,

    #[error("{0}")]
    Other(String),
}
