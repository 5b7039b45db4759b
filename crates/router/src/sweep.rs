//! Periodic background tasks: the reconciliation sweep that heals divergent
//! session/assignment state, and the best-effort full-state snapshot.

use std::{sync::Arc, time::Duration};

use {
    serde::{Deserialize, Serialize},
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use {festa_persistence::Database, festa_store::StateStore};

/// Run the reconciliation sweep every `interval` until cancelled.
pub fn spawn_reconciliation(
    store: Arc<StateStore>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {},
            }
            let report = store.sweep();
            if report.is_clean() {
                debug!("reconciliation sweep: consistent");
            } else {
                info!(
                    dropped = report.dropped.len(),
                    reset = report.reset.len(),
                    "reconciliation sweep healed divergent state"
                );
            }
        }
    })
}

/// What the periodic snapshot writes to cold storage. Informational only;
/// never read back into live state.
#[derive(Debug, Serialize, Deserialize)]
pub struct LiveStateSnapshot {
    pub waiting: Vec<i64>,
    pub assignments: Vec<(i64, i64)>,
    pub taken_at: i64,
}

/// Write a full-state snapshot every `interval` until cancelled.
pub fn spawn_snapshot(
    db: Database,
    store: Arc<StateStore>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {},
            }
            let snapshot = LiveStateSnapshot {
                waiting: store.waiting().iter().map(|e| e.client.0).collect(),
                assignments: store
                    .assignments()
                    .iter()
                    .map(|(op, client)| (op.0, client.0))
                    .collect(),
                taken_at: std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs() as i64,
            };
            if let Err(e) = db.save_snapshot("live_state", &snapshot).await {
                warn!(error = %e, "state snapshot failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use festa_common::types::{ClientId, OperatorId};
    use festa_store::SessionMode;

    use super::*;

    #[tokio::test]
    async fn sweep_task_heals_and_stops_on_cancel() {
        let store = Arc::new(StateStore::new());
        // Orphaned chat session with no assignment behind it.
        store.set_session(5, SessionMode::InManagerChat(OperatorId(100)));

        let cancel = CancellationToken::new();
        let handle = spawn_reconciliation(
            Arc::clone(&store),
            Duration::from_millis(10),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.session(5), SessionMode::Idle);

        cancel.cancel();
        handle.await.expect("sweep task joins");
    }

    #[tokio::test]
    async fn snapshot_task_writes_state() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let store = Arc::new(StateStore::new());
        store.enqueue(ClientId(7), "order", None);

        let cancel = CancellationToken::new();
        let handle = spawn_snapshot(
            db.clone(),
            Arc::clone(&store),
            Duration::from_millis(10),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        cancel.cancel();
        handle.await.expect("snapshot task joins");

        let snapshot: LiveStateSnapshot = db
            .load_snapshot("live_state")
            .await
            .unwrap()
            .expect("snapshot written");
        assert_eq!(snapshot.waiting, vec![7]);
        assert!(snapshot.assignments.is_empty());
    }
}
