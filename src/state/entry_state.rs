//! Lifecycle states for one admitted posting
//!
//! A worker moves its own posting forward through these states exactly once;
//! there is no path back to `Pending`. The one exception is a canonical claim:
//! when another posting's detail page resolves to this id, the frontier marks
//! it `Processed` from whatever state it is in.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    // ===== Active States =====
    /// Admitted from a listing page, waiting for a pool slot
    Pending,

    /// A worker holds a slot and is fetching the detail page
    Fetching,

    // ===== Terminal States =====
    /// A record for this id was appended
    Processed,

    /// Detail fetch failed; the posting is not retried this run
    Failed,
}

impl EntryState {
    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Processed)
    }

    /// Returns true if a worker may move its posting from `self` to `next`
    pub fn can_transition_to(&self, next: EntryState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetching)
                | (Self::Fetching, Self::Processed)
                | (Self::Fetching, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
