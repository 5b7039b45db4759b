//! Pure text classifiers over the lexicon tables.

use crate::lexicon;

/// Coarse intent of a free-text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Matches an FAQ-question pattern. Takes strict precedence: a message
    /// matching both FAQ and order patterns is FAQ.
    Faq,
    Order,
    Other,
}

/// One of the four completeness signals of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Quantity,
    ProductType,
    Schedule,
    Location,
}

impl Signal {
    pub const ALL: [Signal; 4] = [
        Signal::Quantity,
        Signal::ProductType,
        Signal::Schedule,
        Signal::Location,
    ];

    /// User-facing label used when enumerating missing signals.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Quantity => "how many you need",
            Self::ProductType => "which product",
            Self::Schedule => "the date or time",
            Self::Location => "delivery or pickup",
        }
    }
}

/// Which completeness signals a text carries and which are missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completeness {
    pub present: Vec<Signal>,
    pub missing: Vec<Signal>,
}

impl Completeness {
    /// Two or more signals make a draft ready for hand-off.
    pub fn is_ready(&self) -> bool {
        self.present.len() >= 2
    }
}

fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| text.contains(t))
}

/// Classify coarse intent. FAQ patterns win over order patterns.
pub fn intent(text: &str) -> Intent {
    let text = text.to_lowercase();
    if contains_any(&text, lexicon::FAQ_PATTERNS) {
        return Intent::Faq;
    }
    if order_signals(&text) {
        return Intent::Order;
    }
    Intent::Other
}

pub fn is_order_intent(text: &str) -> bool {
    intent(text) == Intent::Order
}

/// Order intent: an action verb or a quantity, next to a product noun.
fn order_signals(lower: &str) -> bool {
    let has_noun = contains_any(lower, lexicon::ITEM_NOUNS);
    if !has_noun {
        return false;
    }
    contains_any(lower, lexicon::ORDER_VERBS)
        || lexicon::QUANTITY_RE.is_match(lower)
        || contains_any(lower, lexicon::QUANTITY_WORDS)
}

/// Count which of the four order signals are present.
pub fn completeness(text: &str) -> Completeness {
    let lower = text.to_lowercase();
    let has = |signal: &Signal| match signal {
        Signal::Quantity => {
            lexicon::QUANTITY_RE.is_match(&lower) || contains_any(&lower, lexicon::QUANTITY_WORDS)
        },
        Signal::ProductType => contains_any(&lower, lexicon::ITEM_NOUNS),
        Signal::Schedule => {
            contains_any(&lower, lexicon::SCHEDULE_TERMS)
                || lexicon::TIME_RE.is_match(&lower)
                || lexicon::DATE_RE.is_match(&lower)
        },
        Signal::Location => contains_any(&lower, lexicon::LOCATION_TERMS),
    };

    let (present, missing) = Signal::ALL.into_iter().partition::<Vec<_>, _>(|s| has(s));
    Completeness { present, missing }
}

/// Gratitude interrupt: fixed priority, short-circuits everything else.
pub fn is_gratitude(text: &str) -> bool {
    contains_any(&text.to_lowercase(), lexicon::GRATITUDE)
}

pub fn is_greeting(text: &str) -> bool {
    contains_any(&text.to_lowercase(), lexicon::GREETINGS)
}

/// Explicit "send now" while a draft is collecting.
pub fn is_send_command(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    lexicon::SEND_WORDS.iter().any(|w| lower == *w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_intent_from_quantity_and_noun() {
        assert_eq!(intent("5 latex balloons, tomorrow"), Intent::Order);
        assert_eq!(intent("I want a bouquet for a birthday"), Intent::Order);
    }

    #[test]
    fn faq_wins_over_order_intent() {
        // Matches both an order pattern (quantity + noun) and an FAQ pattern.
        assert_eq!(intent("how much are 5 latex balloons?"), Intent::Faq);
        assert_eq!(intent("do you deliver balloon sets?"), Intent::Faq);
    }

    #[test]
    fn plain_chat_is_other() {
        assert_eq!(intent("my daughter turns seven soon"), Intent::Other);
    }

    #[test]
    fn completeness_two_signals_is_ready() {
        let report = completeness("5 latex balloons, tomorrow");
        assert!(report.is_ready());
        assert!(report.present.contains(&Signal::Quantity));
        assert!(report.present.contains(&Signal::ProductType));
        assert!(report.present.contains(&Signal::Schedule));
        assert_eq!(report.missing, vec![Signal::Location]);
    }

    #[test]
    fn completeness_single_signal_is_collecting() {
        let report = completeness("balloons please");
        assert!(!report.is_ready());
        assert_eq!(report.present, vec![Signal::ProductType]);
        assert_eq!(report.missing.len(), 3);
    }

    #[test]
    fn completeness_detects_location_and_time() {
        let report = completeness("deliver to Metrolohichna street at 14:30");
        assert!(report.present.contains(&Signal::Location));
        assert!(report.present.contains(&Signal::Schedule));
    }

    #[test]
    fn pickup_term_is_both_faq_and_location() {
        // The overlap the router resolves by context: bare FAQ question…
        assert_eq!(intent("is pickup available?"), Intent::Faq);
        // …but the same term counts as a location signal inside a draft.
        assert!(
            completeness("pickup, tomorrow morning")
                .present
                .contains(&Signal::Location)
        );
    }

    #[test]
    fn gratitude_and_greetings() {
        assert!(is_gratitude("thanks a lot!"));
        assert!(!is_gratitude("5 balloons"));
        assert!(is_greeting("hello there"));
    }

    #[test]
    fn send_command_is_exact() {
        assert!(is_send_command("send"));
        assert!(is_send_command("  Done "));
        assert!(!is_send_command("send me balloons"));
    }
}
