//! Identifiers and inbound event types shared between the router and the
//! transport adapter.

use serde::{Deserialize, Serialize};

/// A customer chat, identified by its transport chat ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub i64);

/// A human operator, identified by its transport chat ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperatorId(pub i64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for OperatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Callback action payloads shared between the router and the aggregator.
pub mod actions {
    /// Return to the main menu, abandoning whatever was in progress.
    pub const HOME: &str = "home";
    /// Finalize the current order draft now.
    pub const SEND_ORDER: &str = "order:send";
    /// Prefix for operator pickup buttons; the client ID follows.
    pub const PICKUP_PREFIX: &str = "pickup:";
}

/// Handle to a previously sent message, used for later edit or retraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle(pub i32);

/// Content of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    Image {
        /// Transport file reference, relayable without downloading.
        file_id: String,
        caption: Option<String>,
    },
}

impl MessageContent {
    /// The textual part of the content, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::Image { caption, .. } => caption.as_deref(),
        }
    }
}

/// A regular inbound message from a party.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub chat_id: i64,
    /// Display name as reported by the transport, for greetings and logs.
    pub sender_name: Option<String>,
    pub content: MessageContent,
}

/// An inline-button press.
#[derive(Debug, Clone)]
pub struct ButtonPress {
    pub chat_id: i64,
    pub sender_name: Option<String>,
    /// Opaque callback ID the transport needs to dismiss the spinner.
    pub callback_id: String,
    /// Handle of the message the button was attached to.
    pub message: Option<MessageHandle>,
    /// The button's action payload.
    pub action: String,
}

/// One inbound unit of conversation, as delivered by the transport.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Message(InboundMessage),
    Button(ButtonPress),
}

impl InboundEvent {
    pub fn chat_id(&self) -> i64 {
        match self {
            Self::Message(m) => m.chat_id,
            Self::Button(b) => b.chat_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_text_for_image_is_caption() {
        let img = MessageContent::Image {
            file_id: "f1".into(),
            caption: Some("five pink ones".into()),
        };
        assert_eq!(img.text(), Some("five pink ones"));

        let bare = MessageContent::Image {
            file_id: "f2".into(),
            caption: None,
        };
        assert_eq!(bare.text(), None);
    }
}
