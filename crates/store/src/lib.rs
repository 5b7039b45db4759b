//! Process-wide live state: per-client sessions, order drafts, the
//! operator↔client assignment table, the waiting queue, outstanding
//! notification handles, the per-sender rate limiter, and the keyed timer
//! set.
//!
//! All mutation is synchronous behind std locks and never held across an
//! await point; cross-task races are resolved by re-validating inside the
//! mutating critical section rather than by async locking.

pub mod draft;
pub mod rate_limit;
pub mod session;
pub mod state;
pub mod timers;

pub use {
    draft::{ClarifyOutcome, DraftOrigin, DraftStatus, OrderDraft},
    rate_limit::{RateDecision, RateLimiter},
    session::{BroadcastState, BroadcastStep, ProfileStep, SessionMode},
    state::{PickupOutcome, QueueEntry, ResetOutcome, StateStore, SweepReport},
    timers::{TimerKind, TimerSet},
};
