//! Event reconciler - applies push events to the local store and schedules
//! authoritative fetches
//!
//! Each event gets at most a cheap optimistic patch; the authoritative
//! snapshot always comes from a fetch. Fetches carry per-match sequence
//! numbers so a slow read can never overwrite a newer one, and the delayed
//! "settle" fetch after turn/match transitions closes the window where the
//! server emits an event before its own write is readable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::MatchServer;
use crate::game::{Commitment, Role, Turn};
use crate::store::{MatchStore, PendingMoves};

use super::protocol::MatchEvent;

/// Per-match fetch bookkeeping
struct FetchState {
    /// Next sequence number handed to a fetch
    next_seq: AtomicU64,
    /// Highest applied sequence and when the last applied fetch completed
    applied: Mutex<Applied>,
    /// In-flight debounced fetch; superseded by the next forced fetch
    debounce: Mutex<Option<JoinHandle<()>>>,
    /// Scheduled settle fetches, aborted on unsubscribe
    settles: Mutex<Vec<JoinHandle<()>>>,
}

#[derive(Default)]
struct Applied {
    seq: u64,
    completed_at: Option<Instant>,
}

impl FetchState {
    fn new() -> Self {
        Self {
            // Sequence 0 is below every issued fetch, so the first applied
            // fetch always wins over the default.
            next_seq: AtomicU64::new(1),
            applied: Mutex::new(Applied::default()),
            debounce: Mutex::new(None),
            settles: Mutex::new(Vec::new()),
        }
    }
}

/// Applies decoded events to the match store
pub struct Reconciler {
    server: Arc<dyn MatchServer>,
    store: Arc<MatchStore>,
    pending: Arc<PendingMoves>,
    states: DashMap<Uuid, Arc<FetchState>>,
    debounce_window: Duration,
    settle_delay: Duration,
}

impl Reconciler {
    pub fn new(
        server: Arc<dyn MatchServer>,
        store: Arc<MatchStore>,
        pending: Arc<PendingMoves>,
        debounce_window: Duration,
        settle_delay: Duration,
    ) -> Self {
        Self {
            server,
            store,
            pending,
            states: DashMap::new(),
            debounce_window,
            settle_delay,
        }
    }

    /// Apply one decoded event: optimistic local patch where the event
    /// carries enough information, authoritative fetch for the rest.
    pub async fn apply(self: &Arc<Self>, event: MatchEvent) {
        let match_id = event.match_id();
        debug!(match_id = %match_id, kind = event.kind(), "applying push event");

        match event {
            // The local snapshot is stale for seat assignments; only the
            // authoritative read knows the joined player's full state.
            MatchEvent::Player1Join { .. } | MatchEvent::Player2Join { .. } => {
                self.forced_fetch(match_id).await;
            }

            MatchEvent::NewTurn { .. } => {
                self.store.patch(match_id, |snapshot| {
                    let index = snapshot.next_turn_index();
                    snapshot.turns.push(Turn::empty(index));
                });
                self.forced_fetch(match_id).await;
                self.schedule_settle_fetch(match_id);
            }

            MatchEvent::Player1Moved { .. } => {
                self.patch_hidden(match_id, Role::Player1);
                self.debounced_fetch(match_id);
            }

            MatchEvent::Player2Moved { .. } => {
                self.patch_hidden(match_id, Role::Player2);
                self.debounced_fetch(match_id);
            }

            MatchEvent::TurnEnded { payload, .. } => {
                self.store.patch(match_id, |snapshot| {
                    if let Some(turn) = snapshot.turns.last_mut() {
                        turn.winner = Some(payload.winner);
                    }
                });
                self.forced_fetch(match_id).await;
                self.schedule_settle_fetch(match_id);
            }

            // The winner lives on the match document, not a turn; nothing
            // to patch locally.
            MatchEvent::MatchEnded { .. } => {
                self.forced_fetch(match_id).await;
                self.schedule_settle_fetch(match_id);
            }
        }
    }

    /// Mark a seat on the current turn as committed-but-unrevealed
    fn patch_hidden(&self, match_id: Uuid, seat: Role) {
        self.store.patch(match_id, |snapshot| {
            if let Some(turn) = snapshot.turns.last_mut() {
                let slot = match seat {
                    Role::Player1 => &mut turn.player1,
                    Role::Player2 => &mut turn.player2,
                };
                // Never downgrade an already-revealed move.
                if slot.is_unset() {
                    *slot = Commitment::Hidden;
                }
            }
        });
    }

    /// Authoritative read that unconditionally replaces the local snapshot.
    /// Supersedes any in-flight debounced fetch for the same match.
    pub async fn forced_fetch(self: &Arc<Self>, match_id: Uuid) {
        let state = self.state(match_id);
        if let Some(task) = state.debounce.lock().take() {
            task.abort();
        }
        let seq = state.next_seq.fetch_add(1, Ordering::Relaxed);
        self.run_fetch(match_id, seq, state).await;
    }

    /// Authoritative read that is skipped when a recent one already
    /// completed, and that a forced fetch may supersede.
    fn debounced_fetch(self: &Arc<Self>, match_id: Uuid) {
        let state = self.state(match_id);
        if let Some(completed_at) = state.applied.lock().completed_at {
            if completed_at.elapsed() < self.debounce_window {
                debug!(match_id = %match_id, "debounced fetch skipped, recent authoritative read");
                return;
            }
        }

        let seq = state.next_seq.fetch_add(1, Ordering::Relaxed);
        let this = Arc::clone(self);
        let task_state = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            this.run_fetch(match_id, seq, task_state).await;
        });

        let mut slot = state.debounce.lock();
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    /// The second, delayed fetch after a turn/match transition. The push
    /// event announces that a transition occurred; the authoritative store
    /// may not reflect it yet at emission time.
    fn schedule_settle_fetch(self: &Arc<Self>, match_id: Uuid) {
        let state = self.state(match_id);
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(this.settle_delay).await;
            this.forced_fetch(match_id).await;
        });

        let mut settles = state.settles.lock();
        settles.retain(|task| !task.is_finished());
        settles.push(handle);
    }

    async fn run_fetch(&self, match_id: Uuid, seq: u64, state: Arc<FetchState>) {
        match self.server.fetch_match(match_id).await {
            Ok(snapshot) => {
                let mut applied = state.applied.lock();
                if seq < applied.seq {
                    debug!(
                        match_id = %match_id,
                        seq,
                        applied_seq = applied.seq,
                        "stale fetch result discarded"
                    );
                    return;
                }
                applied.seq = seq;
                applied.completed_at = Some(Instant::now());
                // Store mutation happens under the applied lock so a slower
                // lower-sequence result can never interleave its upsert.
                self.pending.clear_if_resolved(&snapshot);
                self.store.upsert(snapshot);
            }
            Err(e) => {
                // Keep the last good snapshot; a later event or reconnect
                // triggers another read.
                warn!(match_id = %match_id, error = %e, "authoritative fetch failed");
            }
        }
    }

    /// Abort every scheduled fetch targeting a match. Called on unsubscribe.
    pub fn cancel(&self, match_id: Uuid) {
        if let Some((_, state)) = self.states.remove(&match_id) {
            if let Some(task) = state.debounce.lock().take() {
                task.abort();
            }
            for task in state.settles.lock().drain(..) {
                task.abort();
            }
        }
    }

    fn state(&self, match_id: Uuid) -> Arc<FetchState> {
        self.states
            .entry(match_id)
            .or_insert_with(|| Arc::new(FetchState::new()))
            .clone()
    }
}
