//! Conversation session states and their allowed transitions.
//!
//! - Idle -> Loading (persisted thread selected, messages not populated)
//! - Idle -> Ready (placeholder or already-populated thread selected)
//! - Loading -> Ready / Error (gateway answered)
//! - Ready -> Sending (submit)
//! - Sending -> Ready (send finished, successfully or not)
//! - Error -> Loading (retry)
//!
//! Selecting another entry is allowed from every non-idle state and lands in
//! Loading or Ready. Closing the hosting view resets to Idle from anywhere.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Life-cycle state of the active conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Nothing selected.
    Idle,
    /// Waiting for the gateway to return the selected thread.
    Loading,
    /// Messages are displayed and input is accepted.
    Ready,
    /// A message is on its way to the gateway.
    Sending,
    /// The last load failed; whatever was shown before is still shown.
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Loading => write!(f, "Loading"),
            SessionState::Ready => write!(f, "Ready"),
            SessionState::Sending => write!(f, "Sending"),
            SessionState::Error => write!(f, "Error"),
        }
    }
}

impl SessionState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, target),
            (Idle, Loading)
                | (Idle, Ready)
                | (Loading, Ready)
                | (Loading, Error)
                | (Ready, Sending)
                | (Sending, Ready)
                | (Error, Loading)
                // Re-selection while something else is shown or pending
                | (Loading, Loading)
                | (Ready, Loading)
                | (Ready, Ready)
                | (Sending, Loading)
                | (Error, Ready)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    const ALL: [SessionState; 5] = [Idle, Loading, Ready, Sending, Error];

    #[test]
    fn test_state_display() {
        assert_eq!(Idle.to_string(), "Idle");
        assert_eq!(Loading.to_string(), "Loading");
        assert_eq!(Ready.to_string(), "Ready");
        assert_eq!(Sending.to_string(), "Sending");
        assert_eq!(Error.to_string(), "Error");
    }

    #[test]
    fn test_forward_path() {
        assert!(Idle.can_transition_to(&Loading));
        assert!(Loading.can_transition_to(&Ready));
        assert!(Ready.can_transition_to(&Sending));
        assert!(Sending.can_transition_to(&Ready));
    }

    #[test]
    fn test_placeholder_skips_loading() {
        assert!(Idle.can_transition_to(&Ready));
        assert!(Error.can_transition_to(&Ready));
    }

    #[test]
    fn test_failure_and_retry() {
        assert!(Loading.can_transition_to(&Error));
        assert!(Error.can_transition_to(&Loading));
    }

    #[test]
    fn test_invalid_transitions() {
        // Cannot send without a displayed conversation
        assert!(!Idle.can_transition_to(&Sending));
        assert!(!Loading.can_transition_to(&Sending));
        assert!(!Error.can_transition_to(&Sending));
        // At most one send at a time
        assert!(!Sending.can_transition_to(&Sending));
        // Sends never end in Error; the error rides along with Ready
        assert!(!Sending.can_transition_to(&Error));
        // Idle is only reached by reset
        for state in ALL {
            assert!(!state.can_transition_to(&Idle));
        }
    }

    #[test]
    fn test_all_valid_transitions_count() {
        let mut valid_count = 0;
        for from in &ALL {
            for to in &ALL {
                if from.can_transition_to(to) {
                    valid_count += 1;
                }
            }
        }
        assert_eq!(valid_count, 12, "Expected exactly 12 valid transitions");
    }
}
