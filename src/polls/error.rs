//! Poll error types

use thiserror::Error;

/// Reasons a poll operation was rejected.
///
/// Every variant is recoverable and is reported back to the caller as a
/// structured failure; none of them leave the poll state modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("No active poll")]
    NoActivePoll,

    #[error("Invalid option")]
    InvalidOption(String),

    #[error("Please wait {remaining_secs} seconds before voting again")]
    OnCooldown { remaining_secs: u64 },

    #[error("A poll needs at least 2 non-empty options (got {found})")]
    NotEnoughOptions { found: usize },

    #[error("Duplicate option: {0}")]
    DuplicateOption(String),
}

impl PollError {
    /// Seconds the caller should wait before retrying, if any.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            PollError::OnCooldown { remaining_secs } => Some(*remaining_secs),
            _ => None,
        }
    }
}
