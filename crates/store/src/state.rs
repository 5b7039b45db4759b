//! The shared state store: sessions, assignments, waiting queue, drafts, and
//! outstanding notification handles, behind one lock.
//!
//! Invariants enforced here rather than by callers:
//! - the assignment relation is a partial matching (no party is paired twice);
//! - the waiting queue and the assignment domain are disjoint;
//! - at most one live draft per client.
//!
//! Pickup is the one genuinely racy operation (two operators selecting the
//! same waiting client); it re-validates queue membership and assignment
//! state inside the write critical section, so the first committer wins and
//! the loser gets a definite outcome (std `RwLock`, never held across an
//! await point).

use std::{
    collections::HashMap,
    sync::RwLock,
    time::SystemTime,
};

use tracing::warn;

use festa_common::types::{ClientId, MessageHandle, OperatorId};

use crate::{
    draft::{DraftStatus, OrderDraft},
    session::SessionMode,
};

/// A client waiting for an operator, with the topic it arrived under.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub client: ClientId,
    pub topic: String,
    pub name: Option<String>,
    pub enqueued_at: SystemTime,
}

/// Outcome of an operator attempting to pick up a waiting client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickupOutcome {
    Connected,
    /// The operator already holds this exact client.
    AlreadyYours,
    /// The operator holds a different client and must end that chat first.
    OperatorBusy(ClientId),
    /// The target left the queue (picked up elsewhere or cancelled).
    NotWaiting,
    /// The target is already assigned to another operator.
    AssignedElsewhere(OperatorId),
}

/// What a full client reset actually tore down.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResetOutcome {
    pub was_in_chat: Option<OperatorId>,
    pub had_draft: bool,
    pub was_waiting: bool,
}

/// Result of one reconciliation sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Assignments dropped because the client session no longer mirrored them.
    pub dropped: Vec<(OperatorId, ClientId)>,
    /// Sessions reset because their assignment was gone.
    pub reset: Vec<ClientId>,
    /// Notification handles discarded for clients no longer waiting.
    pub dropped_notices: usize,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.reset.is_empty() && self.dropped_notices == 0
    }
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<i64, SessionMode>,
    by_operator: HashMap<OperatorId, ClientId>,
    by_client: HashMap<ClientId, OperatorId>,
    queue: Vec<QueueEntry>,
    drafts: HashMap<ClientId, OrderDraft>,
    notices: HashMap<ClientId, Vec<(OperatorId, MessageHandle)>>,
}

/// Process-wide live state. Cheap to share (`Arc<StateStore>`).
#[derive(Default)]
pub struct StateStore {
    inner: RwLock<Inner>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    // ── Sessions ────────────────────────────────────────────────────────────

    /// Current mode for a party; `Idle` when never seen.
    pub fn session(&self, chat_id: i64) -> SessionMode {
        self.read()
            .sessions
            .get(&chat_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_session(&self, chat_id: i64, mode: SessionMode) {
        self.write().sessions.insert(chat_id, mode);
    }

    // ── Drafts ──────────────────────────────────────────────────────────────

    pub fn draft(&self, client: ClientId) -> Option<OrderDraft> {
        self.read().drafts.get(&client).cloned()
    }

    /// Whether the client has a draft that is still collecting input.
    pub fn has_live_draft(&self, client: ClientId) -> bool {
        self.read()
            .drafts
            .get(&client)
            .is_some_and(|d| d.status != DraftStatus::Sent)
    }

    /// Install a new draft. Refused when any draft (live or sent) exists:
    /// single-draft-per-client.
    pub fn insert_draft(&self, client: ClientId, draft: OrderDraft) -> bool {
        let mut inner = self.write();
        if inner.drafts.contains_key(&client) {
            return false;
        }
        inner.drafts.insert(client, draft);
        inner.sessions.insert(client.0, SessionMode::OrderCollecting);
        true
    }

    /// Mutate the draft in place under the lock; returns the closure result,
    /// or `None` when there is no draft.
    pub fn with_draft<T>(
        &self,
        client: ClientId,
        f: impl FnOnce(&mut OrderDraft) -> T,
    ) -> Option<T> {
        let mut inner = self.write();
        inner.drafts.get_mut(&client).map(f)
    }

    pub fn remove_draft(&self, client: ClientId) -> Option<OrderDraft> {
        self.write().drafts.remove(&client)
    }

    // ── Waiting queue ───────────────────────────────────────────────────────

    /// Enqueue a client. Refused while the client is assigned (the queue and
    /// the assignment domain stay disjoint) and deduplicated on re-request.
    pub fn enqueue(&self, client: ClientId, topic: impl Into<String>, name: Option<String>) -> bool {
        let mut inner = self.write();
        if inner.by_client.contains_key(&client) {
            warn!(%client, "refusing to enqueue an assigned client");
            return false;
        }
        if inner.queue.iter().any(|e| e.client == client) {
            return false;
        }
        inner.queue.push(QueueEntry {
            client,
            topic: topic.into(),
            name,
            enqueued_at: SystemTime::now(),
        });
        true
    }

    pub fn is_waiting(&self, client: ClientId) -> bool {
        self.read().queue.iter().any(|e| e.client == client)
    }

    pub fn waiting(&self) -> Vec<QueueEntry> {
        self.read().queue.clone()
    }

    // ── Assignments ─────────────────────────────────────────────────────────

    pub fn client_of(&self, op: OperatorId) -> Option<ClientId> {
        self.read().by_operator.get(&op).copied()
    }

    pub fn operator_of(&self, client: ClientId) -> Option<OperatorId> {
        self.read().by_client.get(&client).copied()
    }

    /// Operators from `all` that currently hold no assignment.
    pub fn unassigned_operators(&self, all: &[OperatorId]) -> Vec<OperatorId> {
        let inner = self.read();
        all.iter()
            .copied()
            .filter(|op| !inner.by_operator.contains_key(op))
            .collect()
    }

    pub fn assignments(&self) -> Vec<(OperatorId, ClientId)> {
        self.read()
            .by_operator
            .iter()
            .map(|(op, client)| (*op, *client))
            .collect()
    }

    /// Attempt to connect `op` to `client`. All validation happens inside the
    /// write lock, immediately before commit: the first of two racing
    /// operators wins and the second sees `NotWaiting`.
    pub fn pickup(&self, op: OperatorId, client: ClientId) -> PickupOutcome {
        let mut inner = self.write();

        match inner.by_operator.get(&op) {
            Some(current) if *current == client => return PickupOutcome::AlreadyYours,
            Some(current) => return PickupOutcome::OperatorBusy(*current),
            None => {},
        }

        let Some(pos) = inner.queue.iter().position(|e| e.client == client) else {
            return match inner.by_client.get(&client) {
                Some(other) => PickupOutcome::AssignedElsewhere(*other),
                None => PickupOutcome::NotWaiting,
            };
        };

        if let Some(other) = inner.by_client.get(&client) {
            // Queue/assignment disjointness should make this unreachable, but
            // the check is part of the commit validation.
            return PickupOutcome::AssignedElsewhere(*other);
        }

        inner.queue.remove(pos);
        inner.by_operator.insert(op, client);
        inner.by_client.insert(client, op);
        inner
            .sessions
            .insert(client.0, SessionMode::InManagerChat(op));
        PickupOutcome::Connected
    }

    /// Tear down the operator's current chat. Returns the released client.
    pub fn end_chat_by_operator(&self, op: OperatorId) -> Option<ClientId> {
        let mut inner = self.write();
        let client = inner.by_operator.remove(&op)?;
        inner.by_client.remove(&client);
        inner.sessions.insert(client.0, SessionMode::Idle);
        inner.drafts.remove(&client);
        Some(client)
    }

    /// Full client-side reset ("home", chat end, self-heal): session to
    /// `Idle`, draft discarded, queue entry and assignment removed.
    pub fn reset_client(&self, client: ClientId) -> ResetOutcome {
        let mut inner = self.write();
        let mut outcome = ResetOutcome::default();

        if let Some(op) = inner.by_client.remove(&client) {
            inner.by_operator.remove(&op);
            outcome.was_in_chat = Some(op);
        }
        if let Some(pos) = inner.queue.iter().position(|e| e.client == client) {
            inner.queue.remove(pos);
            outcome.was_waiting = true;
        }
        outcome.had_draft = inner.drafts.remove(&client).is_some();
        inner.sessions.insert(client.0, SessionMode::Idle);
        outcome
    }

    // ── Notification registry ───────────────────────────────────────────────

    pub fn record_notice(&self, client: ClientId, op: OperatorId, handle: MessageHandle) {
        self.write()
            .notices
            .entry(client)
            .or_default()
            .push((op, handle));
    }

    /// Remove and return all outstanding notices for `client`, for retraction.
    pub fn take_notices(&self, client: ClientId) -> Vec<(OperatorId, MessageHandle)> {
        self.write().notices.remove(&client).unwrap_or_default()
    }

    // ── Reconciliation ──────────────────────────────────────────────────────

    /// Heal divergence between the assignment table and session modes:
    /// an assignment whose client session does not point back at the operator
    /// is dropped; an `InManagerChat` session without a matching assignment
    /// is reset to `Idle`.
    pub fn sweep(&self) -> SweepReport {
        let mut inner = self.write();
        let mut report = SweepReport::default();

        let stale: Vec<(OperatorId, ClientId)> = inner
            .by_operator
            .iter()
            .filter(|(op, client)| {
                inner
                    .sessions
                    .get(&client.0)
                    .and_then(SessionMode::in_chat_with)
                    != Some(**op)
            })
            .map(|(op, client)| (*op, *client))
            .collect();
        for (op, client) in stale {
            inner.by_operator.remove(&op);
            inner.by_client.remove(&client);
            report.dropped.push((op, client));
        }

        let orphaned: Vec<i64> = inner
            .sessions
            .iter()
            .filter_map(|(chat_id, mode)| {
                let op = mode.in_chat_with()?;
                (inner.by_operator.get(&op) != Some(&ClientId(*chat_id))).then_some(*chat_id)
            })
            .collect();
        for chat_id in orphaned {
            inner.sessions.insert(chat_id, SessionMode::Idle);
            report.reset.push(ClientId(chat_id));
        }

        // Notices only matter while the client is still waiting; anything
        // else is leftover from a retraction that never happened.
        let Inner { notices, queue, .. } = &mut *inner;
        let before = notices.len();
        notices.retain(|client, _| queue.iter().any(|e| e.client == *client));
        report.dropped_notices = before - notices.len();

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OP1: OperatorId = OperatorId(100);
    const OP2: OperatorId = OperatorId(200);
    const C1: ClientId = ClientId(1);
    const C2: ClientId = ClientId(2);

    #[test]
    fn pickup_happy_path() {
        let store = StateStore::new();
        store.enqueue(C1, "order", None);

        assert_eq!(store.pickup(OP1, C1), PickupOutcome::Connected);
        assert_eq!(store.client_of(OP1), Some(C1));
        assert_eq!(store.operator_of(C1), Some(OP1));
        assert!(!store.is_waiting(C1));
        assert_eq!(store.session(C1.0), SessionMode::InManagerChat(OP1));
    }

    #[test]
    fn second_operator_loses_the_race() {
        let store = StateStore::new();
        store.enqueue(C1, "order", None);

        assert_eq!(store.pickup(OP1, C1), PickupOutcome::Connected);
        // The loser re-validates and finds the client assigned elsewhere.
        assert_eq!(store.pickup(OP2, C1), PickupOutcome::AssignedElsewhere(OP1));
    }

    #[test]
    fn pickup_rejects_busy_operator() {
        let store = StateStore::new();
        store.enqueue(C1, "order", None);
        store.enqueue(C2, "order", None);
        store.pickup(OP1, C1);

        assert_eq!(store.pickup(OP1, C2), PickupOutcome::OperatorBusy(C1));
        assert_eq!(store.pickup(OP1, C1), PickupOutcome::AlreadyYours);
        // C2 is untouched and still available.
        assert!(store.is_waiting(C2));
    }

    #[test]
    fn pickup_of_cancelled_client_is_not_waiting() {
        let store = StateStore::new();
        store.enqueue(C1, "order", None);
        store.reset_client(C1);

        assert_eq!(store.pickup(OP1, C1), PickupOutcome::NotWaiting);
    }

    #[test]
    fn assignment_is_a_partial_matching() {
        let store = StateStore::new();
        store.enqueue(C1, "order", None);
        store.enqueue(C2, "order", None);
        store.pickup(OP1, C1);
        store.pickup(OP2, C2);

        // No operator or client appears twice.
        let pairs = store.assignments();
        assert_eq!(pairs.len(), 2);
        let mut ops: Vec<_> = pairs.iter().map(|(op, _)| *op).collect();
        let mut clients: Vec<_> = pairs.iter().map(|(_, c)| *c).collect();
        ops.sort();
        ops.dedup();
        clients.sort();
        clients.dedup();
        assert_eq!(ops.len(), 2);
        assert_eq!(clients.len(), 2);
    }

    #[test]
    fn queue_and_assignment_domain_stay_disjoint() {
        let store = StateStore::new();
        store.enqueue(C1, "order", None);
        store.pickup(OP1, C1);

        // Re-enqueueing an assigned client is refused.
        assert!(!store.enqueue(C1, "order", None));
        assert!(!store.is_waiting(C1));
    }

    #[test]
    fn enqueue_deduplicates() {
        let store = StateStore::new();
        assert!(store.enqueue(C1, "order", None));
        assert!(!store.enqueue(C1, "urgent", None));
        assert_eq!(store.waiting().len(), 1);
    }

    #[test]
    fn end_chat_releases_both_sides() {
        let store = StateStore::new();
        store.enqueue(C1, "order", None);
        store.pickup(OP1, C1);

        assert_eq!(store.end_chat_by_operator(OP1), Some(C1));
        assert_eq!(store.client_of(OP1), None);
        assert_eq!(store.operator_of(C1), None);
        assert_eq!(store.session(C1.0), SessionMode::Idle);
    }

    #[test]
    fn reset_client_tears_down_everything() {
        let store = StateStore::new();
        store.insert_draft(C1, OrderDraft::from_text("5 balloons"));
        store.enqueue(C1, "order", None);

        let outcome = store.reset_client(C1);
        assert!(outcome.had_draft);
        assert!(outcome.was_waiting);
        assert_eq!(outcome.was_in_chat, None);
        assert_eq!(store.session(C1.0), SessionMode::Idle);
        assert!(store.draft(C1).is_none());
    }

    #[test]
    fn single_draft_per_client() {
        let store = StateStore::new();
        assert!(store.insert_draft(C1, OrderDraft::from_text("first")));
        assert!(!store.insert_draft(C1, OrderDraft::from_text("second")));
        assert_eq!(store.draft(C1).unwrap().primary, "first");
    }

    #[test]
    fn notices_are_taken_once() {
        let store = StateStore::new();
        store.record_notice(C1, OP1, MessageHandle(10));
        store.record_notice(C1, OP2, MessageHandle(11));

        let taken = store.take_notices(C1);
        assert_eq!(taken.len(), 2);
        assert!(store.take_notices(C1).is_empty());
    }

    #[test]
    fn sweep_drops_assignment_without_mirroring_session() {
        let store = StateStore::new();
        store.enqueue(C1, "order", None);
        store.pickup(OP1, C1);
        // Simulate a partial failure: session was reset but the assignment
        // survived.
        store.set_session(C1.0, SessionMode::Idle);

        let report = store.sweep();
        assert_eq!(report.dropped, vec![(OP1, C1)]);
        assert_eq!(store.client_of(OP1), None);
    }

    #[test]
    fn sweep_resets_orphaned_chat_session() {
        let store = StateStore::new();
        // Session says "in chat" but no assignment exists.
        store.set_session(C1.0, SessionMode::InManagerChat(OP1));

        let report = store.sweep();
        assert_eq!(report.reset, vec![C1]);
        assert_eq!(store.session(C1.0), SessionMode::Idle);
    }

    #[test]
    fn sweep_drops_notices_of_departed_clients() {
        let store = StateStore::new();
        store.enqueue(C1, "order", None);
        store.record_notice(C1, OP1, MessageHandle(10));
        store.record_notice(C2, OP1, MessageHandle(11));

        let report = store.sweep();
        // C2 never waited; its notice is stale. C1's survives.
        assert_eq!(report.dropped_notices, 1);
        assert_eq!(store.take_notices(C1).len(), 1);
    }

    #[test]
    fn sweep_on_consistent_state_is_clean() {
        let store = StateStore::new();
        store.enqueue(C1, "order", None);
        store.pickup(OP1, C1);

        assert!(store.sweep().is_clean());
        assert_eq!(store.client_of(OP1), Some(C1));
    }
}
