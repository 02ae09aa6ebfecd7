//! Session lifecycle.
//!
//! ```text
//! ┌─────────┐  ┌──────────────┐  ┌───────────┐  ┌──────────────────────┐  ┌───────────┐
//! │ Created │─▶│ Registration │─▶│  Voting   │─▶│  SharesCollection    │─▶│ Completed │
//! │ (cache) │  │    Open      │  │   Open    │  │       Open           │  │           │
//! └─────────┘  └──────────────┘  └───────────┘  └──────────────────────┘  └───────────┘
//!                    now < reg_end    < voting_end        < shares_end        ≥ shares_end
//!
//!   any non-terminal ──abort (owner)──▶ Aborted (sticky)
//! ```
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    Created,
    RegistrationOpen,
    VotingOpen,
    SharesCollectionOpen,
    Completed,
    Aborted,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Aborted)
    }
}

/// The three ordered window boundaries of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub registration_end: Timestamp,
    pub voting_end: Timestamp,
    pub shares_collection_end: Timestamp,
}

impl Schedule {
    pub fn new(
        registration_end: Timestamp,
        voting_end: Timestamp,
        shares_collection_end: Timestamp,
    ) -> Result<Self> {
        if !(registration_end < voting_end && voting_end < shares_collection_end) {
            return Err(LedgerError::InvalidParameters(format!(
                "windows must be ordered: {} < {} < {}",
                registration_end, voting_end, shares_collection_end
            )));
        }
        Ok(Self {
            registration_end,
            voting_end,
            shares_collection_end,
        })
    }

    /// Time-derived status. Never returns `Created` or `Aborted`.
    pub fn status_at(&self, now: Timestamp) -> SessionStatus {
        if now < self.registration_end {
            SessionStatus::RegistrationOpen
        } else if now < self.voting_end {
            SessionStatus::VotingOpen
        } else if now < self.shares_collection_end {
            SessionStatus::SharesCollectionOpen
        } else {
            SessionStatus::Completed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> Schedule {
        Schedule::new(100, 200, 300).unwrap()
    }

    #[test]
    fn boundaries_belong_to_the_next_phase() {
        let s = schedule();
        assert_eq!(s.status_at(0), SessionStatus::RegistrationOpen);
        assert_eq!(s.status_at(99), SessionStatus::RegistrationOpen);
        assert_eq!(s.status_at(100), SessionStatus::VotingOpen);
        assert_eq!(s.status_at(199), SessionStatus::VotingOpen);
        assert_eq!(s.status_at(200), SessionStatus::SharesCollectionOpen);
        assert_eq!(s.status_at(300), SessionStatus::Completed);
        assert_eq!(s.status_at(u64::MAX), SessionStatus::Completed);
    }

    #[test]
    fn status_is_non_decreasing_in_time() {
        let s = schedule();
        let mut last = SessionStatus::Created;
        for now in 0..=400 {
            let status = s.status_at(now);
            assert!(status >= last, "status went back at t={}", now);
            last = status;
        }
    }

    #[test]
    fn unordered_windows_are_rejected() {
        assert!(Schedule::new(100, 100, 300).is_err());
        assert!(Schedule::new(100, 300, 200).is_err());
        assert!(Schedule::new(300, 200, 100).is_err());
    }
}
