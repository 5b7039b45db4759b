//! Keyword and pattern tables for the text classifiers, kept as data so the
//! heuristics stay pure functions over them.
//!
//! Note the deliberate overlap: pickup/location terms appear both in the FAQ
//! patterns and in the location-signal terms. Which one wins depends on
//! whether an order draft is already open: the router feeds draft-holding
//! clients to the aggregator before any FAQ handling.

use {once_cell::sync::Lazy, regex::Regex};

/// Action verbs that signal purchase intent.
pub const ORDER_VERBS: &[&str] = &[
    "order", "buy", "want", "need", "book", "arrange", "get me", "send me", "deliver",
];

/// Product nouns sold by the storefront.
pub const ITEM_NOUNS: &[&str] = &[
    "balloon", "balloons", "bouquet", "set", "box", "number", "figure", "garland", "arch",
    "photozone", "photo zone", "candle", "candles", "diffuser", "helium", "foil", "latex",
    "confetti",
];

/// Number words counted as a quantity signal alongside digits.
pub const QUANTITY_WORDS: &[&str] = &[
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "dozen",
    "couple", "pair", "few",
];

/// FAQ-question patterns. Strictly higher priority than order intent when no
/// draft is open.
pub const FAQ_PATTERNS: &[&str] = &[
    "how much",
    "how long",
    "how many days",
    "what is the price",
    "what's the price",
    "price list",
    "do you deliver",
    "do you have",
    "do you work",
    "can i pay",
    "how do i pay",
    "payment",
    "when are you open",
    "opening hours",
    "working hours",
    "what time",
    "where are you",
    "where is the store",
    "is pickup",
    "pickup available",
    "pickup possible",
];

/// Terms counted as a delivery/pickup location signal.
pub const LOCATION_TERMS: &[&str] = &[
    "deliver to",
    "delivery to",
    "address",
    "street",
    "avenue",
    "district",
    "pickup",
    "pick up",
    "collect",
    "to the door",
];

/// Terms counted as a date/time signal (besides the digit patterns below).
pub const SCHEDULE_TERMS: &[&str] = &[
    "today",
    "tomorrow",
    "tonight",
    "morning",
    "afternoon",
    "evening",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
    "weekend",
];

/// Gratitude phrases: answered with a canned acknowledgment before any
/// state-machine logic runs.
pub const GRATITUDE: &[&str] = &["thank", "thanks", "thx", "appreciate", "you're the best"];

/// Greeting words; the responder greets back when one is present or the
/// client has been away long enough.
pub const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    "greetings",
];

/// Explicit "finalize the draft now" phrases.
pub const SEND_WORDS: &[&str] = &["send", "send it", "submit", "done", "that's all", "that is all"];

/// Bare number, counted as a quantity signal.
pub static QUANTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+\b").unwrap_or_else(|e| panic!("quantity regex: {e}")));

/// Clock time like `14:30`, `9.00`, or `7 pm`.
pub static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d{1,2}[:.]\d{2}\b|\b\d{1,2}\s?(am|pm)\b")
        .unwrap_or_else(|e| panic!("time regex: {e}"))
});

/// Calendar date like `15.03` or `15.03.2026`.
pub static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{1,2}\.\d{1,2}(\.\d{2,4})?\b").unwrap_or_else(|e| panic!("date regex: {e}"))
});
