//! Lifecycle states of a submitted URL
//!
//! A URL moves `Queued -> InFlight -> {Processed, Error}` and never leaves a
//! terminal state.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Admitted, waiting for its domain slot
    Queued,

    /// Holding its domain slot, request in progress
    InFlight,

    /// A processor ran to completion
    Processed,

    /// The fetch failed after all retries
    Error,
}

impl TaskState {
    /// Returns true if no further processing will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Error)
    }

    /// Returns true if the URL still lives in the processing map
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::InFlight)
                | (Self::InFlight, Self::Processed)
                | (Self::InFlight, Self::Error)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InFlight => "in_flight",
            Self::Processed => "processed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
