//! Notifications emitted by committed calls.
//!
//! Events are observer-facing only; no rule in the engine reads them back.
use chronoshare_address::Address;
use serde::{Deserialize, Serialize};

use crate::session::SessionStatus;
use crate::{Amount, SessionId, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionPairDeployed {
        session_id: SessionId,
        session: Address,
        registry: Address,
        owner: Address,
    },
    SessionContractLinked {
        session_id: SessionId,
        session: Address,
    },
    ExternalFundingAdded {
        session_id: SessionId,
        funder: Address,
        amount: Amount,
        total: Amount,
    },
    HolderRegistered {
        session_id: SessionId,
        holder: Address,
        deposit: Amount,
    },
    VoterRegistered {
        session_id: SessionId,
        voter: Address,
    },
    SharesRecorded {
        session_id: SessionId,
        holder: Address,
    },
    RewardsCalculated {
        session_id: SessionId,
        pool: Amount,
        eligible_holders: u64,
        per_holder: Amount,
        remainder: Amount,
    },
    RewardClaimed {
        session_id: SessionId,
        claimant: Address,
        amount: Amount,
    },
    DepositClaimed {
        session_id: SessionId,
        holder: Address,
        amount: Amount,
    },
    DepositRefunded {
        session_id: SessionId,
        holder: Address,
        amount: Amount,
    },
    FundingReclaimed {
        session_id: SessionId,
        owner: Address,
        amount: Amount,
    },
    RemainderSwept {
        session_id: SessionId,
        owner: Address,
        amount: Amount,
    },
    StatusChanged {
        session_id: SessionId,
        from: SessionStatus,
        to: SessionStatus,
    },
    VoteCast {
        session_id: SessionId,
        voter: Address,
        vote_index: u64,
    },
    ShareSubmitted {
        session_id: SessionId,
        holder: Address,
        vote_index: u64,
        share_index: u32,
    },
    DecryptionValueSubmitted {
        session_id: SessionId,
        holder: Address,
    },
    RewardCalculationTriggered {
        session_id: SessionId,
        caller: Address,
    },
    SessionAborted {
        session_id: SessionId,
        by: Address,
    },
}

/// A committed event with its position in the global, append-only log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub emitter: Address,
    pub at: Timestamp,
    pub event: Event,
}
