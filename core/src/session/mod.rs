pub mod status;
pub mod vote_session;

pub use status::{Schedule, SessionStatus};
pub use vote_session::{SessionInfo, VoteSession};

use chronoshare_address::Address;

use crate::{Amount, SessionId, Timestamp};

/// What a registry may ask of its linked session.
///
/// The session is the single source of truth for timing; the registry gates
/// registration, reward calculation and deposit claims through this view and
/// never keeps its own copy of the schedule.
pub trait SessionGate {
    fn address(&self) -> Address;

    fn session_id(&self) -> SessionId;

    /// Registry this session was deployed against.
    fn registry(&self) -> Address;

    /// Live status, recomputed from `now`.
    fn status_at(&self, now: Timestamp) -> SessionStatus;

    fn required_deposit(&self) -> Amount;

    fn is_aborted(&self) -> bool;

    fn is_registration_open(&self, now: Timestamp) -> bool {
        self.status_at(now) == SessionStatus::RegistrationOpen
    }

    fn is_reward_calculation_period_active(&self, now: Timestamp) -> bool {
        self.status_at(now) == SessionStatus::Completed
    }

    fn is_deposit_claim_period_active(&self, now: Timestamp) -> bool {
        self.status_at(now) == SessionStatus::Completed
    }
}
