//! Order aggregation: intent/completeness classification over customer text
//! and the per-client draft state machine that turns multi-turn input into
//! one operator-facing summary.

pub mod aggregator;
pub mod classify;
pub mod lexicon;

pub use {
    aggregator::OrderAggregator,
    classify::{Completeness, Intent, Signal},
};
