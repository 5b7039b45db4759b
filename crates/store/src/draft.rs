//! The order draft: one per client, accumulating a customer's purchase
//! request until it is handed off to an operator.

use std::time::SystemTime;

/// Draft lifecycle. Status only ever moves forward; `Sent` is terminal until
/// an explicit session reset discards the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DraftStatus {
    Collecting,
    Ready,
    Sent,
}

/// What kind of input opened the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftOrigin {
    Text,
    Image { file_id: String },
}

#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub status: DraftStatus,
    pub origin: DraftOrigin,
    /// The opening text, or the image caption once one exists.
    pub primary: String,
    pub clarifications: Vec<String>,
    /// Display name captured when the draft opened, for the operator notice.
    pub client_name: Option<String>,
    pub created_at: SystemTime,
    /// Set on `Sent`; stays true until the session is reset.
    pub locked: bool,
}

/// Result of appending a clarification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarifyOutcome {
    Added,
    /// Image draft already has its caption; the client should press "send".
    CaptionAlreadySet,
    /// The draft is sent and locked.
    Locked,
}

impl OrderDraft {
    pub fn from_text(primary: impl Into<String>) -> Self {
        Self {
            status: DraftStatus::Collecting,
            origin: DraftOrigin::Text,
            primary: primary.into(),
            clarifications: Vec::new(),
            client_name: None,
            created_at: SystemTime::now(),
            locked: false,
        }
    }

    pub fn from_image(file_id: impl Into<String>, caption: Option<String>) -> Self {
        Self {
            status: DraftStatus::Collecting,
            origin: DraftOrigin::Image {
                file_id: file_id.into(),
            },
            primary: caption.unwrap_or_default(),
            clarifications: Vec::new(),
            client_name: None,
            created_at: SystemTime::now(),
            locked: false,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self.origin, DraftOrigin::Image { .. })
    }

    /// Advance the status. Regressions are ignored: status is monotonic.
    pub fn advance(&mut self, to: DraftStatus) {
        if to > self.status {
            self.status = to;
        }
    }

    /// Append a clarification, honoring the image-caption rule: a captionless
    /// image accepts exactly one clarification as its caption.
    pub fn clarify(&mut self, text: impl Into<String>) -> ClarifyOutcome {
        if self.status == DraftStatus::Sent {
            return ClarifyOutcome::Locked;
        }
        if self.is_image() {
            if self.primary.is_empty() {
                self.primary = text.into();
                return ClarifyOutcome::Added;
            }
            return ClarifyOutcome::CaptionAlreadySet;
        }
        self.clarifications.push(text.into());
        ClarifyOutcome::Added
    }

    /// Operator-facing summary: primary content plus joined clarifications.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        match &self.origin {
            DraftOrigin::Text => out.push_str(&self.primary),
            DraftOrigin::Image { .. } => {
                out.push_str("[photo]");
                if !self.primary.is_empty() {
                    out.push(' ');
                    out.push_str(&self.primary);
                }
            },
        }
        for c in &self.clarifications {
            out.push_str("\n+ ");
            out.push_str(c);
        }
        out
    }
}
