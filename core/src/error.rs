//! Ledger error taxonomy.
//!
//! Every failed call aborts the whole operation; the host discards the
//! working state, so no variant ever carries partial results.
use chronoshare_address::Address;
use thiserror::Error;

use crate::session::SessionStatus;
use crate::{Amount, SessionId};

/// Coarse classification of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PhaseViolation,
    Authorization,
    Duplicate,
    ValueMismatch,
    PreconditionUnmet,
    Storage,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    #[error("No component deployed at {0}")]
    ContractNotFound(Address),

    #[error("Participant {participant} not registered in session {session_id}")]
    ParticipantNotFound {
        session_id: SessionId,
        participant: Address,
    },

    #[error("Vote index {0} out of range")]
    VoteNotFound(u64),

    #[error("{operation} not allowed while session is {status:?}")]
    PhaseViolation {
        operation: &'static str,
        status: SessionStatus,
    },

    #[error("Session {0} is not linked to this registry")]
    NotLinked(SessionId),

    #[error("{caller} is not authorized to call {operation}")]
    Unauthorized {
        operation: &'static str,
        caller: Address,
    },

    #[error("{0} is not a registered participant")]
    NotRegistered(Address),

    #[error("{0} is not a registered holder")]
    NotHolder(Address),

    #[error("{0} is already registered")]
    AlreadyRegistered(Address),

    #[error("{0} has already voted")]
    AlreadyVoted(Address),

    #[error("{0} has already submitted")]
    AlreadySubmitted(Address),

    #[error("{0} has already claimed")]
    AlreadyClaimed(Address),

    #[error("Rewards already calculated for session {0}")]
    AlreadyCalculated(SessionId),

    #[error("Reward calculation already triggered")]
    AlreadyTriggered,

    #[error("Session {0} is already linked")]
    AlreadyLinked(SessionId),

    #[error("Deposit mismatch: expected {expected}, got {got}")]
    DepositMismatch { expected: Amount, got: Amount },

    #[error("Attached value must be positive")]
    ZeroValue,

    #[error("{operation} does not accept value, got {got}")]
    UnexpectedValue {
        operation: &'static str,
        got: Amount,
    },

    #[error("Insufficient funds: balance {balance}, needed {needed}")]
    InsufficientFunds { balance: Amount, needed: Amount },

    #[error("Reward pool is empty")]
    EmptyRewardPool,

    #[error("No holder submitted shares")]
    NoEligibleHolders,

    #[error("{0} has not submitted shares")]
    SharesNotSubmitted(Address),

    #[error("Nothing to claim")]
    NothingToClaim,

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        use LedgerError::*;
        match self {
            SessionNotFound(_) | ContractNotFound(_) | ParticipantNotFound { .. }
            | VoteNotFound(_) => ErrorKind::NotFound,
            PhaseViolation { .. } | NotLinked(_) => ErrorKind::PhaseViolation,
            Unauthorized { .. } | NotRegistered(_) | NotHolder(_) => ErrorKind::Authorization,
            AlreadyRegistered(_) | AlreadyVoted(_) | AlreadySubmitted(_) | AlreadyClaimed(_)
            | AlreadyCalculated(_) | AlreadyTriggered | AlreadyLinked(_) => ErrorKind::Duplicate,
            DepositMismatch { .. } | ZeroValue | UnexpectedValue { .. }
            | InsufficientFunds { .. } => ErrorKind::ValueMismatch,
            EmptyRewardPool | NoEligibleHolders | SharesNotSubmitted(_) | NothingToClaim
            | InvalidParameters(_) => ErrorKind::PreconditionUnmet,
            Overflow | Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<anyhow::Error> for LedgerError {
    fn from(e: anyhow::Error) -> Self {
        LedgerError::Storage(format!("{:#}", e))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
