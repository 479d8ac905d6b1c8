//! Error types for the messaging core.

use parley_core::ThreadId;

use crate::session::state::SessionState;
use crate::types::EntryKey;

/// Errors surfaced by gateway calls and session operations.
///
/// `Clone` so the session can keep the last error next to the data it
/// failed to refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// The gateway rejected the call or did not answer in time.
    #[error("network failure: {0}")]
    NetworkFailure(String),
    /// The referenced thread no longer resolves.
    #[error("thread not found: {0}")]
    NotFound(ThreadId),
    /// Rejected before anything was sent.
    #[error("validation failed: {0}")]
    ValidationFailure(String),
    #[error("no conversation entry for {0}")]
    UnknownEntry(EntryKey),
    #[error("no conversation selected")]
    NoActiveEntry,
    #[error("conversation session is closed")]
    SessionClosed,
    #[error("invalid session transition: {from} -> {to}")]
    InvalidTransition { from: SessionState, to: SessionState },
}

impl ChatError {
    /// Whether repeating the triggering action can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChatError::NetworkFailure(_) | ChatError::NotFound(_))
    }

    pub(crate) fn timed_out(operation: &str, timeout: std::time::Duration) -> Self {
        ChatError::NetworkFailure(format!(
            "{} timed out after {} ms",
            operation,
            timeout.as_millis()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::TenantId;
    use std::time::Duration;

    #[test]
    fn test_chat_error_display() {
        let err = ChatError::NetworkFailure("connection reset".to_string());
        assert_eq!(err.to_string(), "network failure: connection reset");

        let err = ChatError::NotFound(ThreadId(55));
        assert_eq!(err.to_string(), "thread not found: 55");

        let err = ChatError::ValidationFailure("message cannot be empty".to_string());
        assert_eq!(err.to_string(), "validation failed: message cannot be empty");

        let err = ChatError::UnknownEntry(EntryKey::Placeholder(TenantId(3)));
        assert_eq!(err.to_string(), "no conversation entry for placeholder:3");

        let err = ChatError::NoActiveEntry;
        assert_eq!(err.to_string(), "no conversation selected");

        let err = ChatError::SessionClosed;
        assert_eq!(err.to_string(), "conversation session is closed");

        let err = ChatError::InvalidTransition {
            from: SessionState::Idle,
            to: SessionState::Sending,
        };
        assert_eq!(err.to_string(), "invalid session transition: Idle -> Sending");
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ChatError::NetworkFailure("x".into()).is_retryable());
        assert!(ChatError::NotFound(ThreadId(1)).is_retryable());
        assert!(!ChatError::ValidationFailure("x".into()).is_retryable());
        assert!(!ChatError::NoActiveEntry.is_retryable());
    }

    #[test]
    fn test_timed_out_maps_to_network_failure() {
        let err = ChatError::timed_out("fetch_thread", Duration::from_millis(250));
        assert!(matches!(err, ChatError::NetworkFailure(_)));
        assert_eq!(
            err.to_string(),
            "network failure: fetch_thread timed out after 250 ms"
        );
    }
}
