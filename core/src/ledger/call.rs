//! Entry points the host can route, and what they return.

use chronoshare_address::Address;
use chronoshare_ballot::VoteSubmission;
use serde::{Deserialize, Serialize};

use crate::directory::{DeployedPair, SessionParams};
use crate::registry::RewardBreakdown;
use crate::session::SessionStatus;
use crate::{Amount, SessionId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectoryCall {
    CreateSessionPair(SessionParams),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionCall {
    RefreshStatus,
    CastVote(VoteSubmission),
    SubmitShares {
        vote_index: u64,
        share_index: u32,
        #[serde(with = "hex::serde")]
        share: Vec<u8>,
    },
    SubmitDecryptionValue {
        value_hex: String,
    },
    TriggerRewardCalculation,
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryCall {
    LinkSession {
        session_id: SessionId,
        session: Address,
    },
    AddExternalFunding {
        session_id: SessionId,
    },
    JoinAsHolder {
        session_id: SessionId,
        bls_public_key_hex: String,
    },
    RegisterAsVoter {
        session_id: SessionId,
    },
    RecordShareSubmission {
        session_id: SessionId,
        holder: Address,
    },
    CalculateRewards {
        session_id: SessionId,
    },
    ClaimReward {
        session_id: SessionId,
    },
    ClaimDeposit {
        session_id: SessionId,
    },
    RefundAbortedDeposit {
        session_id: SessionId,
    },
    ReclaimExternalFunding {
        session_id: SessionId,
    },
    SweepRemainder {
        session_id: SessionId,
    },
}

impl RegistryCall {
    pub fn session_id(&self) -> SessionId {
        match self {
            RegistryCall::LinkSession { session_id, .. }
            | RegistryCall::AddExternalFunding { session_id }
            | RegistryCall::JoinAsHolder { session_id, .. }
            | RegistryCall::RegisterAsVoter { session_id }
            | RegistryCall::RecordShareSubmission { session_id, .. }
            | RegistryCall::CalculateRewards { session_id }
            | RegistryCall::ClaimReward { session_id }
            | RegistryCall::ClaimDeposit { session_id }
            | RegistryCall::RefundAbortedDeposit { session_id }
            | RegistryCall::ReclaimExternalFunding { session_id }
            | RegistryCall::SweepRemainder { session_id } => *session_id,
        }
    }
}

/// A state-mutating call addressed to one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    Directory(DirectoryCall),
    Session { session: Address, call: SessionCall },
    Registry { registry: Address, call: RegistryCall },
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::Directory(DirectoryCall::CreateSessionPair(_)) => "createSessionPair",
            Call::Session { call, .. } => match call {
                SessionCall::RefreshStatus => "refreshStatus",
                SessionCall::CastVote(_) => "castVote",
                SessionCall::SubmitShares { .. } => "submitShares",
                SessionCall::SubmitDecryptionValue { .. } => "submitDecryptionValue",
                SessionCall::TriggerRewardCalculation => "triggerRewardCalculation",
                SessionCall::Abort => "abort",
            },
            Call::Registry { call, .. } => match call {
                RegistryCall::LinkSession { .. } => "linkSession",
                RegistryCall::AddExternalFunding { .. } => "addExternalFunding",
                RegistryCall::JoinAsHolder { .. } => "joinAsHolder",
                RegistryCall::RegisterAsVoter { .. } => "registerAsVoter",
                RegistryCall::RecordShareSubmission { .. } => "recordShareSubmission",
                RegistryCall::CalculateRewards { .. } => "calculateRewards",
                RegistryCall::ClaimReward { .. } => "claimReward",
                RegistryCall::ClaimDeposit { .. } => "claimDeposit",
                RegistryCall::RefundAbortedDeposit { .. } => "refundAbortedDeposit",
                RegistryCall::ReclaimExternalFunding { .. } => "reclaimExternalFunding",
                RegistryCall::SweepRemainder { .. } => "sweepRemainder",
            },
        }
    }
}

/// Return value of a committed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Unit,
    Pair(DeployedPair),
    VoteIndex(u64),
    Status(SessionStatus),
    Amount(Amount),
    Rewards(RewardBreakdown),
}

impl Outcome {
    pub fn pair(&self) -> Option<DeployedPair> {
        match self {
            Outcome::Pair(p) => Some(*p),
            _ => None,
        }
    }

    pub fn vote_index(&self) -> Option<u64> {
        match self {
            Outcome::VoteIndex(i) => Some(*i),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<SessionStatus> {
        match self {
            Outcome::Status(s) => Some(*s),
            _ => None,
        }
    }

    pub fn amount(&self) -> Option<Amount> {
        match self {
            Outcome::Amount(a) => Some(*a),
            _ => None,
        }
    }

    pub fn rewards(&self) -> Option<RewardBreakdown> {
        match self {
            Outcome::Rewards(r) => Some(*r),
            _ => None,
        }
    }
}
