//! Deferred work keyed by `(owner, kind)` with atomic cancel-and-reschedule,
//! so a session reset can drop every pending timer for a client in one call.
//!
//! Callbacks must re-check freshness against the state store before acting:
//! the owning session may have been reset between scheduling and firing.

use std::{
    collections::HashMap,
    future::Future,
    sync::Mutex,
    time::Duration,
};

use tokio::task::JoinHandle;

/// Kinds of per-client deferred work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    AutoFinalize,
}

/// Externally owned scheduler for per-party timers.
#[derive(Default)]
pub struct TimerSet {
    tasks: Mutex<HashMap<(i64, TimerKind), JoinHandle<()>>>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `work` to run after `delay`, cancelling any pending timer
    /// under the same key first.
    pub fn arm<F>(&self, owner: i64, kind: TimerKind, delay: Duration, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            work.await;
        });
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = tasks.insert((owner, kind), handle) {
            previous.abort();
        }
    }

    pub fn cancel(&self, owner: i64, kind: TimerKind) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = tasks.remove(&(owner, kind)) {
            handle.abort();
        }
    }

    /// Cancel every pending timer for `owner`.
    pub fn cancel_all(&self, owner: i64) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|(task_owner, _), handle| {
            if *task_owner == owner {
                handle.abort();
                false
            } else {
                true
            }
        });
    }

    /// Whether a timer under this key is scheduled and not yet fired.
    pub fn is_armed(&self, owner: i64, kind: TimerKind) -> bool {
        let tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks
            .get(&(owner, kind))
            .is_some_and(|handle| !handle.is_finished())
    }
}
