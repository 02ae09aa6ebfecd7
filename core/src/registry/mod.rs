//! Participant and incentive ledger.
//!
//! One registry per deployed pair. Its books are keyed by `session_id`, and
//! each book is bound to exactly one session address at link time; that
//! address is the only caller allowed to record share submissions.
//!
//! Payouts follow the pull pattern: flags and owed balances are updated
//! first, the value transfer is always the final effect.

mod book;

pub use book::{ParticipantInfo, RewardBreakdown};
pub(crate) use book::SessionBook;

use std::collections::BTreeMap;

use chronoshare_address::Address;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::ledger::{CallContext, Effects, Event};
use crate::session::{SessionGate, SessionStatus};
use crate::{Amount, SessionId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRegistry {
    address: Address,
    owner: Address,
    /// Directory that deployed this registry; may link sessions.
    deployer: Address,
    sessions: BTreeMap<SessionId, SessionBook>,
}

impl ParticipantRegistry {
    pub(crate) fn new(address: Address, owner: Address, deployer: Address) -> Self {
        Self {
            address,
            owner,
            deployer,
            sessions: BTreeMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn linked_sessions(&self) -> impl Iterator<Item = (SessionId, Address)> + '_ {
        self.sessions.iter().map(|(id, b)| (*id, b.session_ref))
    }

    pub fn session_ref(&self, session_id: SessionId) -> Option<Address> {
        self.sessions.get(&session_id).map(|b| b.session_ref)
    }

    fn book(&self, session_id: SessionId) -> Result<&SessionBook> {
        self.sessions
            .get(&session_id)
            .ok_or(LedgerError::SessionNotFound(session_id))
    }

    fn book_mut(&mut self, session_id: SessionId) -> Result<&mut SessionBook> {
        self.sessions
            .get_mut(&session_id)
            .ok_or(LedgerError::SessionNotFound(session_id))
    }

    /// Book for the session behind `session`, checking that it is the one
    /// linked under its id.
    fn linked_book_mut<S>(&mut self, session: &S) -> Result<&mut SessionBook>
    where
        S: SessionGate + ?Sized,
    {
        let session_id = session.session_id();
        let book = self.book_mut(session_id)?;
        if book.session_ref != session.address() {
            return Err(LedgerError::NotLinked(session_id));
        }
        Ok(book)
    }

    fn require_owner(&self, ctx: &CallContext, operation: &'static str) -> Result<()> {
        if ctx.caller != self.owner {
            return Err(LedgerError::Unauthorized {
                operation,
                caller: ctx.caller,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    /// Binds `session_id` to its session. The session must have been
    /// deployed against this registry under the same id.
    pub fn link_session<S>(
        &mut self,
        ctx: &CallContext,
        session_id: SessionId,
        session: &S,
        fx: &mut Effects,
    ) -> Result<()>
    where
        S: SessionGate + ?Sized,
    {
        ctx.require_no_value("linkSession")?;
        if ctx.caller != self.owner && ctx.caller != self.deployer {
            return Err(LedgerError::Unauthorized {
                operation: "linkSession",
                caller: ctx.caller,
            });
        }
        if session.registry() != self.address || session.session_id() != session_id {
            return Err(LedgerError::InvalidParameters(format!(
                "session {} belongs to registry {} as id {}, not {} as id {}",
                session.address(),
                session.registry(),
                session.session_id(),
                self.address,
                session_id
            )));
        }
        if self.sessions.contains_key(&session_id) {
            return Err(LedgerError::AlreadyLinked(session_id));
        }

        let session_ref = session.address();
        self.sessions.insert(session_id, SessionBook::new(session_ref));
        fx.emit(
            self.address,
            ctx.now,
            Event::SessionContractLinked {
                session_id,
                session: session_ref,
            },
        );
        Ok(())
    }

    /// Accumulates the attached value into the session's external funding.
    /// The host has already moved `ctx.value` into this registry.
    pub fn add_external_funding<S>(
        &mut self,
        ctx: &CallContext,
        session: &S,
        fx: &mut Effects,
    ) -> Result<Amount>
    where
        S: SessionGate + ?Sized,
    {
        self.require_owner(ctx, "addExternalFunding")?;
        let address = self.address;
        let session_id = session.session_id();
        let book = self.linked_book_mut(session)?;
        if ctx.value == 0 {
            return Err(LedgerError::ZeroValue);
        }
        if session.is_aborted() {
            return Err(LedgerError::PhaseViolation {
                operation: "addExternalFunding",
                status: SessionStatus::Aborted,
            });
        }
        if book.rewards_calculated {
            return Err(LedgerError::AlreadyCalculated(session_id));
        }

        book.external_funding = book
            .external_funding
            .checked_add(ctx.value)
            .ok_or(LedgerError::Overflow)?;
        let total = book.external_funding;

        fx.emit(
            address,
            ctx.now,
            Event::ExternalFundingAdded {
                session_id,
                funder: ctx.caller,
                amount: ctx.value,
                total,
            },
        );
        Ok(total)
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    fn open_registration<S>(
        &mut self,
        ctx: &CallContext,
        session: &S,
        operation: &'static str,
    ) -> Result<&mut SessionBook>
    where
        S: SessionGate + ?Sized,
    {
        let book = self.linked_book_mut(session)?;
        if !session.is_registration_open(ctx.now) {
            return Err(LedgerError::PhaseViolation {
                operation,
                status: session.status_at(ctx.now),
            });
        }
        if book
            .participants
            .get(&ctx.caller)
            .is_some_and(|p| p.is_registered)
        {
            return Err(LedgerError::AlreadyRegistered(ctx.caller));
        }
        Ok(book)
    }

    /// Registers the caller as a holder. The attached value must equal the
    /// session's required deposit exactly.
    pub fn join_as_holder<S>(
        &mut self,
        ctx: &CallContext,
        session: &S,
        bls_public_key_hex: String,
        fx: &mut Effects,
    ) -> Result<()>
    where
        S: SessionGate + ?Sized,
    {
        let address = self.address;
        let book = self.open_registration(ctx, session, "joinAsHolder")?;
        let expected = session.required_deposit();
        if ctx.value != expected {
            return Err(LedgerError::DepositMismatch {
                expected,
                got: ctx.value,
            });
        }
        if bls_public_key_hex.trim().is_empty() {
            return Err(LedgerError::InvalidParameters(
                "BLS public key must not be empty".into(),
            ));
        }

        book.participants.insert(
            ctx.caller,
            ParticipantInfo {
                is_registered: true,
                is_holder: true,
                deposit_amount: ctx.value,
                bls_public_key_hex,
                has_submitted_shares: false,
            },
        );
        book.active_holders.push(ctx.caller);

        fx.emit(
            address,
            ctx.now,
            Event::HolderRegistered {
                session_id: session.session_id(),
                holder: ctx.caller,
                deposit: ctx.value,
            },
        );
        Ok(())
    }

    pub fn register_as_voter<S>(
        &mut self,
        ctx: &CallContext,
        session: &S,
        fx: &mut Effects,
    ) -> Result<()>
    where
        S: SessionGate + ?Sized,
    {
        ctx.require_no_value("registerAsVoter")?;
        let address = self.address;
        let book = self.open_registration(ctx, session, "registerAsVoter")?;

        book.participants.insert(
            ctx.caller,
            ParticipantInfo {
                is_registered: true,
                ..Default::default()
            },
        );

        fx.emit(
            address,
            ctx.now,
            Event::VoterRegistered {
                session_id: session.session_id(),
                voter: ctx.caller,
            },
        );
        Ok(())
    }

    /// Flags `holder` as having submitted shares. Only the linked session may
    /// call this.
    pub fn record_share_submission(
        &mut self,
        ctx: &CallContext,
        session_id: SessionId,
        holder: Address,
        fx: &mut Effects,
    ) -> Result<()> {
        ctx.require_no_value("recordShareSubmission")?;
        let address = self.address;
        let book = self.book_mut(session_id)?;
        if ctx.caller != book.session_ref {
            debug!(
                "registry {}: recordShareSubmission from unlinked caller {}",
                address.short(),
                ctx.caller
            );
            return Err(LedgerError::Unauthorized {
                operation: "recordShareSubmission",
                caller: ctx.caller,
            });
        }
        let info = match book.participants.get_mut(&holder) {
            Some(info) if info.is_holder => info,
            _ => return Err(LedgerError::NotHolder(holder)),
        };
        if info.has_submitted_shares {
            return Err(LedgerError::AlreadySubmitted(holder));
        }
        info.has_submitted_shares = true;

        fx.emit(
            address,
            ctx.now,
            Event::SharesRecorded { session_id, holder },
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Settlement
    // ------------------------------------------------------------------

    /// Credits every eligible holder with an equal share of the pool.
    /// Runs once per session; the integer-division leftover is parked in
    /// `undistributed` for the owner to sweep.
    pub fn calculate_rewards<S>(
        &mut self,
        ctx: &CallContext,
        session: &S,
        fx: &mut Effects,
    ) -> Result<RewardBreakdown>
    where
        S: SessionGate + ?Sized,
    {
        ctx.require_no_value("calculateRewards")?;
        let session_id = session.session_id();
        let address = self.address;
        let owner = self.owner;
        let book = self.linked_book_mut(session)?;
        if ctx.caller != owner && ctx.caller != book.session_ref {
            return Err(LedgerError::Unauthorized {
                operation: "calculateRewards",
                caller: ctx.caller,
            });
        }
        if !session.is_reward_calculation_period_active(ctx.now) {
            return Err(LedgerError::PhaseViolation {
                operation: "calculateRewards",
                status: session.status_at(ctx.now),
            });
        }
        if book.rewards_calculated {
            return Err(LedgerError::AlreadyCalculated(session_id));
        }

        let mut breakdown = book.breakdown()?;
        if breakdown.pool() == 0 {
            return Err(LedgerError::EmptyRewardPool);
        }
        if breakdown.eligible_holders == 0 {
            return Err(LedgerError::NoEligibleHolders);
        }

        book.rewards_calculated = true;
        breakdown.calculated = true;
        book.settlement = Some(breakdown);

        let eligible: Vec<Address> = book
            .holders()
            .filter(|(_, p)| p.has_submitted_shares)
            .map(|(a, _)| *a)
            .collect();
        for holder in eligible {
            let owed = book.rewards_owed.entry(holder).or_insert(0);
            *owed = owed
                .checked_add(breakdown.per_holder)
                .ok_or(LedgerError::Overflow)?;
        }
        book.undistributed = breakdown.remainder;

        fx.emit(
            address,
            ctx.now,
            Event::RewardsCalculated {
                session_id,
                pool: breakdown.pool(),
                eligible_holders: breakdown.eligible_holders,
                per_holder: breakdown.per_holder,
                remainder: breakdown.remainder,
            },
        );
        Ok(breakdown)
    }

    pub fn claim_reward(
        &mut self,
        ctx: &CallContext,
        session_id: SessionId,
        fx: &mut Effects,
    ) -> Result<Amount> {
        ctx.require_no_value("claimReward")?;
        let address = self.address;
        let book = self.book_mut(session_id)?;
        let claimant = ctx.caller;
        if book.reward_claimed.contains(&claimant) {
            return Err(LedgerError::AlreadyClaimed(claimant));
        }
        let amount = book.rewards_owed.get(&claimant).copied().unwrap_or(0);
        if amount == 0 {
            return Err(LedgerError::NothingToClaim);
        }

        book.reward_claimed.insert(claimant);
        book.rewards_owed.insert(claimant, 0);

        fx.emit(
            address,
            ctx.now,
            Event::RewardClaimed {
                session_id,
                claimant,
                amount,
            },
        );
        fx.transfer(address, claimant, amount)?;
        Ok(amount)
    }

    /// Returns a holder's deposit after the session completes, provided its
    /// shares were recorded.
    pub fn claim_deposit<S>(
        &mut self,
        ctx: &CallContext,
        session: &S,
        fx: &mut Effects,
    ) -> Result<Amount>
    where
        S: SessionGate + ?Sized,
    {
        ctx.require_no_value("claimDeposit")?;
        let address = self.address;
        let holder = ctx.caller;
        let book = self.linked_book_mut(session)?;
        let amount = match book.participants.get(&holder) {
            Some(info) if info.is_holder => {
                if !info.has_submitted_shares {
                    return Err(LedgerError::SharesNotSubmitted(holder));
                }
                info.deposit_amount
            }
            _ => return Err(LedgerError::NotHolder(holder)),
        };
        if book.deposit_claimed.contains(&holder) {
            return Err(LedgerError::AlreadyClaimed(holder));
        }
        if amount == 0 {
            return Err(LedgerError::NothingToClaim);
        }
        if !session.is_deposit_claim_period_active(ctx.now) {
            return Err(LedgerError::PhaseViolation {
                operation: "claimDeposit",
                status: session.status_at(ctx.now),
            });
        }

        book.deposit_claimed.insert(holder);

        fx.emit(
            address,
            ctx.now,
            Event::DepositClaimed {
                session_id: session.session_id(),
                holder,
                amount,
            },
        );
        fx.transfer(address, holder, amount)?;
        Ok(amount)
    }

    /// Deposit exit for aborted sessions. Shares the claimed flag with
    /// [`ParticipantRegistry::claim_deposit`].
    pub fn refund_aborted_deposit<S>(
        &mut self,
        ctx: &CallContext,
        session: &S,
        fx: &mut Effects,
    ) -> Result<Amount>
    where
        S: SessionGate + ?Sized,
    {
        ctx.require_no_value("refundAbortedDeposit")?;
        let address = self.address;
        let holder = ctx.caller;
        let book = self.linked_book_mut(session)?;
        if !session.is_aborted() {
            return Err(LedgerError::PhaseViolation {
                operation: "refundAbortedDeposit",
                status: session.status_at(ctx.now),
            });
        }
        let amount = match book.participants.get(&holder) {
            Some(info) if info.is_holder => info.deposit_amount,
            _ => return Err(LedgerError::NotHolder(holder)),
        };
        if book.deposit_claimed.contains(&holder) {
            return Err(LedgerError::AlreadyClaimed(holder));
        }
        if amount == 0 {
            return Err(LedgerError::NothingToClaim);
        }

        book.deposit_claimed.insert(holder);

        fx.emit(
            address,
            ctx.now,
            Event::DepositRefunded {
                session_id: session.session_id(),
                holder,
                amount,
            },
        );
        fx.transfer(address, holder, amount)?;
        Ok(amount)
    }

    /// Owner withdrawal of external funding from an aborted session.
    pub fn reclaim_external_funding<S>(
        &mut self,
        ctx: &CallContext,
        session: &S,
        fx: &mut Effects,
    ) -> Result<Amount>
    where
        S: SessionGate + ?Sized,
    {
        ctx.require_no_value("reclaimExternalFunding")?;
        self.require_owner(ctx, "reclaimExternalFunding")?;
        let address = self.address;
        let book = self.linked_book_mut(session)?;
        if !session.is_aborted() {
            return Err(LedgerError::PhaseViolation {
                operation: "reclaimExternalFunding",
                status: session.status_at(ctx.now),
            });
        }
        if book.funding_reclaimed {
            return Err(LedgerError::AlreadyClaimed(ctx.caller));
        }
        let amount = book.external_funding;
        if amount == 0 {
            return Err(LedgerError::NothingToClaim);
        }

        book.funding_reclaimed = true;
        book.external_funding = 0;

        fx.emit(
            address,
            ctx.now,
            Event::FundingReclaimed {
                session_id: session.session_id(),
                owner: ctx.caller,
                amount,
            },
        );
        fx.transfer(address, ctx.caller, amount)?;
        Ok(amount)
    }

    /// Owner withdrawal of the rounding leftover, once, after calculation.
    pub fn sweep_remainder(
        &mut self,
        ctx: &CallContext,
        session_id: SessionId,
        fx: &mut Effects,
    ) -> Result<Amount> {
        ctx.require_no_value("sweepRemainder")?;
        self.require_owner(ctx, "sweepRemainder")?;
        let address = self.address;
        let book = self.book_mut(session_id)?;
        if book.remainder_swept {
            return Err(LedgerError::AlreadyClaimed(ctx.caller));
        }
        let amount = book.undistributed;
        if !book.rewards_calculated || amount == 0 {
            return Err(LedgerError::NothingToClaim);
        }

        book.remainder_swept = true;
        book.undistributed = 0;

        fx.emit(
            address,
            ctx.now,
            Event::RemainderSwept {
                session_id,
                owner: ctx.caller,
                amount,
            },
        );
        fx.transfer(address, ctx.caller, amount)?;
        Ok(amount)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn participant(&self, session_id: SessionId, who: &Address) -> Option<&ParticipantInfo> {
        self.sessions.get(&session_id)?.participants.get(who)
    }

    pub fn participant_info(&self, session_id: SessionId, who: &Address) -> Result<ParticipantInfo> {
        self.participant(session_id, who)
            .cloned()
            .ok_or(LedgerError::ParticipantNotFound {
                session_id,
                participant: *who,
            })
    }

    pub fn is_registered(&self, session_id: SessionId, who: &Address) -> bool {
        self.participant(session_id, who)
            .is_some_and(|p| p.is_registered)
    }

    pub fn active_holders(&self, session_id: SessionId) -> Result<&[Address]> {
        Ok(&self.book(session_id)?.active_holders)
    }

    pub fn number_of_active_holders(&self, session_id: SessionId) -> Result<u64> {
        Ok(self.book(session_id)?.active_holders.len() as u64)
    }

    /// 1-based position of `holder` in the active holder list.
    pub fn holder_index(&self, session_id: SessionId, holder: &Address) -> Option<u32> {
        let book = self.sessions.get(&session_id)?;
        book.active_holders
            .iter()
            .position(|a| a == holder)
            .and_then(|i| u32::try_from(i + 1).ok())
    }

    /// Holder addresses and their BLS keys as parallel vectors.
    pub fn holder_bls_keys(&self, session_id: SessionId) -> Result<(Vec<Address>, Vec<String>)> {
        let book = self.book(session_id)?;
        Ok(book
            .holders()
            .map(|(a, p)| (*a, p.bls_public_key_hex.clone()))
            .unzip())
    }

    /// External funding only.
    pub fn total_reward_pool(&self, session_id: SessionId) -> Result<Amount> {
        Ok(self.book(session_id)?.external_funding)
    }

    pub fn rewards_owed(&self, session_id: SessionId, who: &Address) -> Amount {
        self.sessions
            .get(&session_id)
            .and_then(|b| b.rewards_owed.get(who).copied())
            .unwrap_or(0)
    }

    pub fn reward_claimed(&self, session_id: SessionId, who: &Address) -> bool {
        self.sessions
            .get(&session_id)
            .is_some_and(|b| b.reward_claimed.contains(who))
    }

    pub fn deposit_claimed(&self, session_id: SessionId, who: &Address) -> bool {
        self.sessions
            .get(&session_id)
            .is_some_and(|b| b.deposit_claimed.contains(who))
    }

    pub fn rewards_calculated(&self, session_id: SessionId) -> bool {
        self.sessions
            .get(&session_id)
            .is_some_and(|b| b.rewards_calculated)
    }

    pub fn undistributed_remainder(&self, session_id: SessionId) -> Result<Amount> {
        Ok(self.book(session_id)?.undistributed)
    }

    pub fn reward_pool_breakdown(&self, session_id: SessionId) -> Result<RewardBreakdown> {
        self.book(session_id)?.breakdown()
    }
}
