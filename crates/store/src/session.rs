//! Session modes as a sum type: each variant carries only the fields that
//! mode needs, so no handler ever reads a field another mode left behind.

use festa_common::types::OperatorId;

/// Step of the client profile wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStep {
    Name,
    Phone,
    Birthday,
}

/// Step of the operator broadcast-authoring wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastStep {
    Title,
    Body,
    EndDate,
}

/// Collected broadcast fields while the wizard is in progress.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BroadcastState {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// A party's transient interaction mode. Exactly one per party.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionMode {
    #[default]
    Idle,
    Menu,
    AwaitingSearch,
    ProfileWizard(ProfileStep),
    /// Operator is entering a history-search query.
    AwaitingHistorySearch,
    /// Operator is authoring a broadcast.
    BroadcastWizard(BroadcastStep, BroadcastState),
    /// Client is in a live chat with the given operator.
    InManagerChat(OperatorId),
    /// Client has a live order draft being collected.
    OrderCollecting,
}

impl SessionMode {
    pub fn in_chat_with(&self) -> Option<OperatorId> {
        match self {
            Self::InManagerChat(op) => Some(*op),
            _ => None,
        }
    }
}
