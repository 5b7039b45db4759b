//! Bounded rolling conversation history per client, TTL-expired.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

/// One remembered exchange line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// "user" or "assistant".
    pub role: &'static str,
    pub text: String,
}

struct Timestamped {
    at: Instant,
    entry: HistoryEntry,
}

/// Per-client rolling buffer: at most `max_len` entries, each expiring after
/// `ttl`. Also answers "when was this client last active".
pub struct HistoryBuffer {
    buffers: Mutex<HashMap<i64, Vec<Timestamped>>>,
    max_len: usize,
    ttl: Duration,
}

impl HistoryBuffer {
    pub fn new(max_len: usize, ttl: Duration) -> Self {
        Self {
            buffers: Mutex::new(HashMap::new()),
            max_len,
            ttl,
        }
    }

    pub fn push(&self, client: i64, role: &'static str, text: impl Into<String>) {
        let mut buffers = self.buffers.lock().unwrap_or_else(|e| e.into_inner());
        let buf = buffers.entry(client).or_default();
        buf.push(Timestamped {
            at: Instant::now(),
            entry: HistoryEntry {
                role,
                text: text.into(),
            },
        });
        if buf.len() > self.max_len {
            let excess = buf.len() - self.max_len;
            buf.drain(..excess);
        }
    }

    /// The live (non-expired) window, oldest first.
    pub fn window(&self, client: i64) -> Vec<HistoryEntry> {
        let now = Instant::now();
        let mut buffers = self.buffers.lock().unwrap_or_else(|e| e.into_inner());
        let Some(buf) = buffers.get_mut(&client) else {
            return Vec::new();
        };
        buf.retain(|t| now.duration_since(t.at) < self.ttl);
        buf.iter().map(|t| t.entry.clone()).collect()
    }

    /// How long ago the client last said anything, if remembered.
    pub fn idle_for(&self, client: i64) -> Option<Duration> {
        let buffers = self.buffers.lock().unwrap_or_else(|e| e.into_inner());
        buffers
            .get(&client)
            .and_then(|buf| buf.last())
            .map(|t| t.at.elapsed())
    }

    pub fn clear(&self, client: i64) {
        self.buffers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&client);
    }
}
