//! Chronoshare Core
//!
//! Coordination engine for timed-release vote sessions.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Ledger host                             │
//! │   caller + value + now ──▶ Transaction (working copy) ──▶ commit │
//! │                                                                  │
//! │  SessionDirectory ──creates──▶ (VoteSession, ParticipantRegistry)│
//! │                                                                  │
//! │  VoteSession ──record shares / calculate rewards──▶ Registry     │
//! │  Registry ──phase + deposit queries (SessionGate)──▶ VoteSession │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every call either commits all of its effects (state, value transfers,
//! events) or none of them.

pub mod directory;
pub mod error;
pub mod ledger;
pub mod registry;
pub mod session;
pub mod storage;

pub use directory::{DeployedPair, SessionDirectory, SessionParams};
pub use error::{ErrorKind, LedgerError, Result};
pub use ledger::{
    Call, CallContext, Clock, DirectoryCall, Event, EventRecord, Ledger, ManualClock, Outcome,
    RegistryCall, SessionCall, SharedLedger, SystemClock,
};
pub use registry::{ParticipantInfo, ParticipantRegistry, RewardBreakdown};
pub use session::{Schedule, SessionGate, SessionInfo, SessionStatus, VoteSession};
pub use storage::{MemStore, RocksDbStore, StateStore};

pub use chronoshare_address::Address;
pub use chronoshare_ballot::{DecryptionShare, DecryptionValue, EncryptedVote, VoteSubmission};

/// Native ledger value unit.
pub type Amount = u64;
/// Unix seconds.
pub type Timestamp = u64;
pub type SessionId = u64;

#[cfg(test)]
mod tests;
