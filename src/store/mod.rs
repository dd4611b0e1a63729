//! Process-local match collection store
//!
//! The store exclusively owns all match snapshots. Only the reconciler and
//! the submission flow mutate it; every other component reads copies or
//! watches for changes. Mutation is synchronous - locks are never held
//! across await points.

use std::collections::HashMap;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::watch;
use uuid::Uuid;

use crate::game::{MatchSnapshot, PendingMove};

#[derive(Default)]
struct Inner {
    entries: HashMap<Uuid, MatchSnapshot>,
    /// Insertion order, preserved for listing consumers
    order: Vec<Uuid>,
}

/// Mapping from match id to snapshot, with per-match change notification
#[derive(Default)]
pub struct MatchStore {
    inner: RwLock<Inner>,
    watchers: DashMap<Uuid, watch::Sender<Option<MatchSnapshot>>>,
}

impl MatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace (or insert) a match snapshot wholesale
    pub fn upsert(&self, snapshot: MatchSnapshot) {
        let id = snapshot.id;
        {
            let mut inner = self.inner.write();
            if inner.entries.insert(id, snapshot).is_none() {
                inner.order.push(id);
            }
        }
        self.notify(id);
    }

    /// Apply a local optimistic mutation to a stored snapshot.
    /// Returns false when the match is not known locally.
    pub fn patch<F>(&self, match_id: Uuid, mutate: F) -> bool
    where
        F: FnOnce(&mut MatchSnapshot),
    {
        let patched = {
            let mut inner = self.inner.write();
            match inner.entries.get_mut(&match_id) {
                Some(snapshot) => {
                    mutate(snapshot);
                    true
                }
                None => false,
            }
        };
        if patched {
            self.notify(match_id);
        }
        patched
    }

    pub fn get(&self, match_id: Uuid) -> Option<MatchSnapshot> {
        self.inner.read().entries.get(&match_id).cloned()
    }

    pub fn contains(&self, match_id: Uuid) -> bool {
        self.inner.read().entries.contains_key(&match_id)
    }

    /// All known snapshots in insertion order
    pub fn list(&self) -> Vec<MatchSnapshot> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.entries.get(id).cloned())
            .collect()
    }

    /// Read-only subscription to snapshot changes for one match id
    pub fn watch(&self, match_id: Uuid) -> watch::Receiver<Option<MatchSnapshot>> {
        self.watchers
            .entry(match_id)
            .or_insert_with(|| watch::channel(self.get(match_id)).0)
            .subscribe()
    }

    fn notify(&self, match_id: Uuid) {
        if let Some(tx) = self.watchers.get(&match_id) {
            let _ = tx.send(self.get(match_id));
        }
    }
}

/// Registry of optimistic local moves, at most one per match
#[derive(Default)]
pub struct PendingMoves {
    inner: DashMap<Uuid, PendingMove>,
}

impl PendingMoves {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, match_id: Uuid, pending: PendingMove) {
        self.inner.insert(match_id, pending);
    }

    pub fn get(&self, match_id: Uuid) -> Option<PendingMove> {
        self.inner.get(&match_id).map(|p| *p)
    }

    pub fn clear(&self, match_id: Uuid) {
        self.inner.remove(&match_id);
    }

    /// Drop a pending move whose target turn the given authoritative
    /// snapshot shows as resolved or advanced past.
    pub fn clear_if_resolved(&self, snapshot: &MatchSnapshot) {
        let Some(pending) = self.get(snapshot.id) else {
            return;
        };
        let advanced = snapshot.turns.len() as u32 > pending.turn_index;
        let resolved = snapshot
            .turn(pending.turn_index)
            .map(|t| t.is_resolved())
            .unwrap_or(false);
        if advanced || resolved || snapshot.is_over() {
            self.inner.remove(&snapshot.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Commitment, Move, PlayerRef, Turn, TurnWinner};
    use chrono::Utc;

    fn snapshot(id: Uuid) -> MatchSnapshot {
        MatchSnapshot {
            id,
            player1: PlayerRef {
                id: Uuid::new_v4(),
                username: "alice".into(),
            },
            player2: None,
            turns: Vec::new(),
            winner: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn list_preserves_insertion_order_across_upserts() {
        let store = MatchStore::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store.upsert(snapshot(a));
        store.upsert(snapshot(b));
        store.upsert(snapshot(c));
        // Replacing an existing entry must not move it
        store.upsert(snapshot(a));

        let order: Vec<Uuid> = store.list().iter().map(|s| s.id).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn patch_on_unknown_match_is_a_no_op() {
        let store = MatchStore::new();
        assert!(!store.patch(Uuid::new_v4(), |s| s.turns.push(Turn::empty(1))));
    }

    #[tokio::test]
    async fn watch_observes_upserts_and_patches() {
        let store = MatchStore::new();
        let id = Uuid::new_v4();
        let mut rx = store.watch(id);
        assert!(rx.borrow().is_none());

        store.upsert(snapshot(id));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().id, id);

        store.patch(id, |s| s.turns.push(Turn::empty(1)));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().turns.len(), 1);
    }

    #[test]
    fn pending_move_cleared_when_target_turn_resolves() {
        let pending = PendingMoves::new();
        let id = Uuid::new_v4();
        pending.set(
            id,
            PendingMove {
                turn_index: 1,
                mv: Move::Rock,
            },
        );

        // Unresolved target turn keeps the pending move
        let mut snap = snapshot(id);
        snap.turns.push(Turn {
            index: 1,
            player1: Commitment::Revealed(Move::Rock),
            player2: Commitment::Unset,
            winner: None,
        });
        pending.clear_if_resolved(&snap);
        assert!(pending.get(id).is_some());

        snap.turns[0].winner = Some(TurnWinner::Player1);
        pending.clear_if_resolved(&snap);
        assert!(pending.get(id).is_none());
    }

    #[test]
    fn pending_move_cleared_when_turns_advance_past_target() {
        let pending = PendingMoves::new();
        let id = Uuid::new_v4();
        pending.set(
            id,
            PendingMove {
                turn_index: 1,
                mv: Move::Paper,
            },
        );

        let mut snap = snapshot(id);
        snap.turns.push(Turn::empty(1));
        snap.turns.push(Turn::empty(2));
        pending.clear_if_resolved(&snap);
        assert!(pending.get(id).is_none());
    }
}
