//! Shared test fixtures: scripted match server and push feed fakes

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::api::{ApiError, MatchServer, RejectReason};
use crate::game::{Commitment, MatchSnapshot, Move, PlayerRef, Turn, TurnWinner};
use crate::sync::feed::{EventFeed, FeedConnector, FeedError};

pub fn player(name: &str) -> PlayerRef {
    PlayerRef {
        id: Uuid::new_v4(),
        username: name.into(),
    }
}

/// A match with both seats filled and no turns yet
pub fn joined_snapshot() -> MatchSnapshot {
    MatchSnapshot {
        id: Uuid::new_v4(),
        player1: player("alice"),
        player2: Some(player("bob")),
        turns: Vec::new(),
        winner: None,
        created_at: Utc::now(),
    }
}

pub fn turn(
    index: u32,
    player1: Commitment,
    player2: Commitment,
    winner: Option<TurnWinner>,
) -> Turn {
    Turn {
        index,
        player1,
        player2,
        winner,
    }
}

/// One scripted fetch response: delay before answering, then the snapshot
struct FetchScript {
    delay: Duration,
    snapshot: MatchSnapshot,
}

/// Scripted [`MatchServer`] recording every call.
///
/// Fetches answer from the script queue first, then from the default
/// snapshot; with neither configured they fail, which exercises the
/// keep-last-good-snapshot path.
#[derive(Default)]
pub struct MockMatchServer {
    fetch_scripts: Mutex<VecDeque<FetchScript>>,
    default_snapshot: Mutex<Option<MatchSnapshot>>,
    create_result: Mutex<Option<MatchSnapshot>>,
    list_result: Mutex<Vec<MatchSnapshot>>,
    reject_submit: Mutex<Option<RejectReason>>,
    fetches: AtomicUsize,
    submits: Mutex<Vec<(Uuid, u32, Move)>>,
}

impl MockMatchServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot returned by unscripted fetches
    pub fn set_snapshot(&self, snapshot: MatchSnapshot) {
        *self.default_snapshot.lock() = Some(snapshot);
    }

    /// Queue one fetch response with an artificial completion delay
    pub fn script_fetch(&self, delay: Duration, snapshot: MatchSnapshot) {
        self.fetch_scripts
            .lock()
            .push_back(FetchScript { delay, snapshot });
    }

    pub fn set_create_result(&self, snapshot: MatchSnapshot) {
        *self.create_result.lock() = Some(snapshot);
    }

    pub fn set_list(&self, matches: Vec<MatchSnapshot>) {
        *self.list_result.lock() = matches;
    }

    /// Refuse the next move submission with the given reason
    pub fn reject_next_submit(&self, reason: RejectReason) {
        *self.reject_submit.lock() = Some(reason);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn submit_count(&self) -> usize {
        self.submits.lock().len()
    }

    pub fn submits(&self) -> Vec<(Uuid, u32, Move)> {
        self.submits.lock().clone()
    }
}

#[async_trait]
impl MatchServer for MockMatchServer {
    async fn fetch_match(&self, match_id: Uuid) -> Result<MatchSnapshot, ApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let script = self.fetch_scripts.lock().pop_front();
        if let Some(script) = script {
            tokio::time::sleep(script.delay).await;
            return Ok(script.snapshot);
        }
        match self.default_snapshot.lock().clone() {
            Some(snapshot) => Ok(snapshot),
            None => Err(ApiError::Api {
                status: 404,
                body: format!("match {} not found", match_id),
            }),
        }
    }

    async fn submit_move(
        &self,
        match_id: Uuid,
        turn_index: u32,
        mv: Move,
    ) -> Result<(), ApiError> {
        self.submits.lock().push((match_id, turn_index, mv));
        if let Some(reason) = self.reject_submit.lock().take() {
            return Err(ApiError::Rejected(reason));
        }
        Ok(())
    }

    async fn create_match(&self) -> Result<MatchSnapshot, ApiError> {
        self.create_result.lock().clone().ok_or(ApiError::Api {
            status: 500,
            body: "no create result scripted".into(),
        })
    }

    async fn join_match(&self, match_id: Uuid) -> Result<MatchSnapshot, ApiError> {
        self.default_snapshot.lock().clone().ok_or(ApiError::Api {
            status: 404,
            body: format!("match {} not found", match_id),
        })
    }

    async fn list_matches(&self) -> Result<Vec<MatchSnapshot>, ApiError> {
        Ok(self.list_result.lock().clone())
    }
}

/// Items a scripted feed yields in order
pub enum FeedItem {
    Payload(String),
    Error(String),
    /// Park forever; keeps the channel open without delivering anything
    Hang,
}

/// Connector handing out one scripted feed per connection attempt.
/// Once the scripts run out, further connects get a hanging feed.
pub struct ScriptedConnector {
    scripts: Mutex<VecDeque<Vec<FeedItem>>>,
    connects: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new(scripts: Vec<Vec<FeedItem>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            connects: AtomicUsize::new(0),
        }
    }

    /// A connector whose every feed stays open and silent
    pub fn hanging() -> Self {
        Self::new(Vec::new())
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedConnector for ScriptedConnector {
    async fn connect(&self, _match_id: Uuid) -> Result<Box<dyn EventFeed>, FeedError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let items = self
            .scripts
            .lock()
            .pop_front()
            .unwrap_or_else(|| vec![FeedItem::Hang]);
        Ok(Box::new(ScriptedFeed {
            items: items.into_iter().collect(),
        }))
    }
}

struct ScriptedFeed {
    items: VecDeque<FeedItem>,
}

#[async_trait]
impl EventFeed for ScriptedFeed {
    async fn next_payload(&mut self) -> Option<Result<String, FeedError>> {
        match self.items.pop_front() {
            Some(FeedItem::Payload(raw)) => Some(Ok(raw)),
            Some(FeedItem::Error(message)) => Some(Err(FeedError::Stream(message))),
            Some(FeedItem::Hang) | None => std::future::pending().await,
        }
    }
}
