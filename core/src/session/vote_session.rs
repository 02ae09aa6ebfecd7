use std::collections::BTreeSet;

use chronoshare_address::Address;
use chronoshare_ballot::{DecryptionShare, DecryptionValue, EncryptedVote, VoteSubmission};
use log::debug;
use serde::{Deserialize, Serialize};

use super::{Schedule, SessionGate, SessionStatus};
use crate::error::{LedgerError, Result};
use crate::ledger::{CallContext, Effects, Event};
use crate::registry::{ParticipantRegistry, RewardBreakdown};
use crate::{Amount, SessionId, Timestamp};

/// Descriptive parameters and live status, as returned by `getSessionInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub title: String,
    pub description: String,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub shares_end_date: Timestamp,
    pub options: Vec<String>,
    pub metadata: String,
    pub required_deposit: Amount,
    pub min_share_threshold: u32,
    pub status: SessionStatus,
}

/// One timed-release event: phase state machine plus the vote and share logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSession {
    id: SessionId,
    address: Address,
    owner: Address,
    registry: Address,

    title: String,
    description: String,
    options: Vec<String>,
    metadata: String,

    schedule: Schedule,
    required_deposit: Amount,
    min_share_threshold: u32,

    /// Cached hint; phase gating always uses [`VoteSession::live_status`].
    status: SessionStatus,

    votes: Vec<EncryptedVote>,
    voted: BTreeSet<Address>,
    shares: Vec<DecryptionShare>,
    decryption_values: Vec<DecryptionValue>,
    value_submitted: BTreeSet<Address>,

    reward_triggered: bool,
}

impl VoteSession {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: SessionId,
        address: Address,
        owner: Address,
        registry: Address,
        title: String,
        description: String,
        options: Vec<String>,
        metadata: String,
        schedule: Schedule,
        required_deposit: Amount,
        min_share_threshold: u32,
    ) -> Self {
        Self {
            id,
            address,
            owner,
            registry,
            title,
            description,
            options,
            metadata,
            schedule,
            required_deposit,
            min_share_threshold,
            status: SessionStatus::Created,
            votes: Vec::new(),
            voted: BTreeSet::new(),
            shares: Vec::new(),
            decryption_values: Vec::new(),
            value_submitted: BTreeSet::new(),
            reward_triggered: false,
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn registry(&self) -> Address {
        self.registry
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn registration_end_date(&self) -> Timestamp {
        self.schedule.registration_end
    }

    pub fn min_share_threshold(&self) -> u32 {
        self.min_share_threshold
    }

    pub fn cached_status(&self) -> SessionStatus {
        self.status
    }

    /// Authoritative status: `Aborted` is sticky, everything else is
    /// derived from the schedule.
    pub fn live_status(&self, now: Timestamp) -> SessionStatus {
        if self.status == SessionStatus::Aborted {
            SessionStatus::Aborted
        } else {
            self.schedule.status_at(now)
        }
    }

    pub fn info(&self, now: Timestamp) -> SessionInfo {
        SessionInfo {
            title: self.title.clone(),
            description: self.description.clone(),
            start_date: self.schedule.registration_end,
            end_date: self.schedule.voting_end,
            shares_end_date: self.schedule.shares_collection_end,
            options: self.options.clone(),
            metadata: self.metadata.clone(),
            required_deposit: self.required_deposit,
            min_share_threshold: self.min_share_threshold,
            status: self.live_status(now),
        }
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.voted.contains(voter)
    }

    pub fn vote(&self, index: u64) -> Option<&EncryptedVote> {
        usize::try_from(index).ok().and_then(|i| self.votes.get(i))
    }

    pub fn votes(&self) -> &[EncryptedVote] {
        &self.votes
    }

    pub fn number_of_votes(&self) -> u64 {
        self.votes.len() as u64
    }

    pub fn decryption_shares(&self) -> &[DecryptionShare] {
        &self.shares
    }

    pub fn shares_for_vote(&self, vote_index: u64) -> Vec<&DecryptionShare> {
        self.shares
            .iter()
            .filter(|s| s.vote_index == vote_index)
            .collect()
    }

    /// True once at least `min_share_threshold` shares exist for the vote.
    pub fn has_reached_share_threshold(&self, vote_index: u64) -> bool {
        self.shares_for_vote(vote_index).len() >= self.min_share_threshold as usize
    }

    pub fn has_submitted_decryption_value(&self, holder: &Address) -> bool {
        self.value_submitted.contains(holder)
    }

    pub fn decryption_values(&self) -> &[DecryptionValue] {
        &self.decryption_values
    }

    pub fn reward_triggered(&self) -> bool {
        self.reward_triggered
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Persists the live status into the cache. Never moves backwards.
    pub fn refresh_status(&mut self, ctx: &CallContext, fx: &mut Effects) -> SessionStatus {
        let live = self.live_status(ctx.now);
        if live > self.status {
            fx.emit(
                self.address,
                ctx.now,
                Event::StatusChanged {
                    session_id: self.id,
                    from: self.status,
                    to: live,
                },
            );
            self.status = live;
        }
        self.status
    }

    fn require_phase(
        &self,
        operation: &'static str,
        expected: SessionStatus,
        now: Timestamp,
    ) -> Result<()> {
        let status = self.live_status(now);
        if status != expected {
            debug!(
                "session {}: {} rejected in {:?}",
                self.id, operation, status
            );
            return Err(LedgerError::PhaseViolation { operation, status });
        }
        Ok(())
    }

    /// Appends an encrypted vote from a registered participant.
    /// Returns the index of the new vote.
    pub fn cast_vote(
        &mut self,
        ctx: &CallContext,
        registry: &ParticipantRegistry,
        fx: &mut Effects,
        submission: VoteSubmission,
    ) -> Result<u64> {
        ctx.require_no_value("castVote")?;
        self.require_phase("castVote", SessionStatus::VotingOpen, ctx.now)?;

        let voter = ctx.caller;
        if !registry.is_registered(self.id, &voter) {
            return Err(LedgerError::NotRegistered(voter));
        }
        if self.voted.contains(&voter) {
            return Err(LedgerError::AlreadyVoted(voter));
        }

        self.refresh_status(ctx, fx);
        let vote_index = self.votes.len() as u64;
        self.votes.push(submission.into_vote(voter));
        self.voted.insert(voter);

        fx.emit(
            self.address,
            ctx.now,
            Event::VoteCast {
                session_id: self.id,
                voter,
                vote_index,
            },
        );
        Ok(vote_index)
    }

    /// Appends a holder's decryption share and records the submission in the
    /// registry. A holder submits exactly once.
    pub fn submit_shares(
        &mut self,
        ctx: &CallContext,
        registry: &mut ParticipantRegistry,
        fx: &mut Effects,
        vote_index: u64,
        share_index: u32,
        share: Vec<u8>,
    ) -> Result<()> {
        ctx.require_no_value("submitShares")?;
        self.require_phase("submitShares", SessionStatus::SharesCollectionOpen, ctx.now)?;

        let holder = ctx.caller;
        match registry.participant(self.id, &holder) {
            Some(info) if info.is_holder => {
                if info.has_submitted_shares {
                    return Err(LedgerError::AlreadySubmitted(holder));
                }
            }
            _ => return Err(LedgerError::NotHolder(holder)),
        }
        if self.vote(vote_index).is_none() {
            return Err(LedgerError::VoteNotFound(vote_index));
        }

        self.refresh_status(ctx, fx);
        self.shares.push(DecryptionShare {
            vote_index,
            holder,
            share_index,
            share,
        });

        registry.record_share_submission(&ctx.forward(self.address), self.id, holder, fx)?;

        fx.emit(
            self.address,
            ctx.now,
            Event::ShareSubmitted {
                session_id: self.id,
                holder,
                vote_index,
                share_index,
            },
        );
        Ok(())
    }

    /// Publishes a holder's decryption value. Only holders whose shares are
    /// already recorded may publish, once each.
    pub fn submit_decryption_value(
        &mut self,
        ctx: &CallContext,
        registry: &ParticipantRegistry,
        fx: &mut Effects,
        value_hex: String,
    ) -> Result<()> {
        ctx.require_no_value("submitDecryptionValue")?;
        self.require_phase(
            "submitDecryptionValue",
            SessionStatus::SharesCollectionOpen,
            ctx.now,
        )?;

        let holder = ctx.caller;
        match registry.participant(self.id, &holder) {
            Some(info) if info.is_holder => {
                if !info.has_submitted_shares {
                    return Err(LedgerError::SharesNotSubmitted(holder));
                }
            }
            _ => return Err(LedgerError::NotHolder(holder)),
        }
        if self.value_submitted.contains(&holder) {
            return Err(LedgerError::AlreadySubmitted(holder));
        }

        self.refresh_status(ctx, fx);
        self.decryption_values
            .push(DecryptionValue { holder, value_hex });
        self.value_submitted.insert(holder);

        fx.emit(
            self.address,
            ctx.now,
            Event::DecryptionValueSubmitted {
                session_id: self.id,
                holder,
            },
        );
        Ok(())
    }

    /// Asks the registry to settle rewards, at most once per session.
    ///
    /// The guard is raised before delegating, so a re-entrant trigger inside
    /// the same call observes it.
    pub fn trigger_reward_calculation(
        &mut self,
        ctx: &CallContext,
        registry: &mut ParticipantRegistry,
        fx: &mut Effects,
    ) -> Result<RewardBreakdown> {
        ctx.require_no_value("triggerRewardCalculation")?;
        self.require_phase(
            "triggerRewardCalculation",
            SessionStatus::Completed,
            ctx.now,
        )?;
        if self.reward_triggered {
            return Err(LedgerError::AlreadyTriggered);
        }

        self.reward_triggered = true;
        self.refresh_status(ctx, fx);
        fx.emit(
            self.address,
            ctx.now,
            Event::RewardCalculationTriggered {
                session_id: self.id,
                caller: ctx.caller,
            },
        );

        registry.calculate_rewards(&ctx.forward(self.address), &*self, fx)
    }

    /// Administrative cancellation from any non-terminal status.
    pub fn abort(&mut self, ctx: &CallContext, fx: &mut Effects) -> Result<()> {
        ctx.require_no_value("abort")?;
        if ctx.caller != self.owner {
            return Err(LedgerError::Unauthorized {
                operation: "abort",
                caller: ctx.caller,
            });
        }
        let status = self.live_status(ctx.now);
        if status.is_terminal() {
            return Err(LedgerError::PhaseViolation {
                operation: "abort",
                status,
            });
        }

        fx.emit(
            self.address,
            ctx.now,
            Event::StatusChanged {
                session_id: self.id,
                from: self.status,
                to: SessionStatus::Aborted,
            },
        );
        fx.emit(
            self.address,
            ctx.now,
            Event::SessionAborted {
                session_id: self.id,
                by: ctx.caller,
            },
        );
        self.status = SessionStatus::Aborted;
        Ok(())
    }
}

impl SessionGate for VoteSession {
    fn address(&self) -> Address {
        self.address
    }

    fn session_id(&self) -> SessionId {
        self.id
    }

    fn registry(&self) -> Address {
        self.registry
    }

    fn status_at(&self, now: Timestamp) -> SessionStatus {
        self.live_status(now)
    }

    fn required_deposit(&self) -> Amount {
        self.required_deposit
    }

    fn is_aborted(&self) -> bool {
        self.status == SessionStatus::Aborted
    }
}
