//! Transport seam.
//!
//! The router and aggregator only talk to the chat platform through this
//! trait, so handlers are testable with a recording mock and the platform
//! adapter stays in its own crate.

use {anyhow::Result, async_trait::async_trait};

use crate::types::MessageHandle;

/// A button on an outbound keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    /// Sends its `action` payload back as a button press.
    Action { label: String, action: String },
    /// Opens a URL.
    Url { label: String, url: String },
}

impl Button {
    pub fn action(label: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Action {
            label: label.into(),
            action: action.into(),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Url {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// Whether the keyboard is attached to the message or replaces the reply
/// keyboard under the input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardKind {
    Inline,
    Reply,
}

/// An outbound keyboard: rows of buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyboard {
    pub kind: KeyboardKind,
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn inline(rows: Vec<Vec<Button>>) -> Self {
        Self {
            kind: KeyboardKind::Inline,
            rows,
        }
    }

    /// A reply keyboard built from plain labels, one row per inner slice.
    pub fn reply(rows: &[&[&str]]) -> Self {
        Self {
            kind: KeyboardKind::Reply,
            rows: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|label| Button::action(*label, *label))
                        .collect()
                })
                .collect(),
        }
    }
}

/// Outbound side of the chat transport.
///
/// Delivery is at-least-once and per-party ordered; callers that fan out
/// best-effort must swallow individual send failures themselves.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(
        &self,
        to: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageHandle>;

    async fn send_image(
        &self,
        to: i64,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<MessageHandle>;

    async fn edit_text(
        &self,
        to: i64,
        message: MessageHandle,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()>;

    async fn delete_message(&self, to: i64, message: MessageHandle) -> Result<()>;

    /// Acknowledge a button press, optionally with a toast text.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}
