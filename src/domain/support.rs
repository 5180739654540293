use super::ids::ChatId;
use serde::Serialize;

/// Where a customer stands with the support desk.
///
/// A customer is in exactly one of these states at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SupportState {
    Idle,
    Queued,
    InSession { admin: ChatId },
}

/// Result of a support-desk transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportOutcome {
    Queued { position: usize },
    AlreadyQueued,
    AlreadyInSession,
    Claimed { customer: ChatId, admin: ChatId },
    /// Someone else claimed first, or the customer left the queue.
    NoLongerValid,
    Ended { customer: ChatId, admin: ChatId },
    NotInSession,
}
