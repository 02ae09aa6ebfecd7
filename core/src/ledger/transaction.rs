use std::collections::BTreeMap;

use chronoshare_address::Address;

use super::call::{Call, DirectoryCall, Outcome, RegistryCall, SessionCall};
use super::context::CallContext;
use super::effects::Effects;
use super::events::EventRecord;
use super::state::{ChangeSet, LedgerState};
use crate::directory::SessionDirectory;
use crate::error::{LedgerError, Result};
use crate::registry::ParticipantRegistry;
use crate::session::VoteSession;

/// Working copy of the ledger for one call.
///
/// Components are cloned from the committed state on first touch and only
/// the touched ones end up in the resulting [`ChangeSet`]. Dropping a
/// transaction discards every effect.
pub(crate) struct Transaction<'a> {
    base: &'a LedgerState,
    directory: Option<SessionDirectory>,
    sessions: BTreeMap<Address, VoteSession>,
    registries: BTreeMap<Address, ParticipantRegistry>,
    fx: Effects<'a>,
}

fn component_mut<T>(map: &mut BTreeMap<Address, T>, address: Address) -> Result<&mut T> {
    map.get_mut(&address)
        .ok_or(LedgerError::ContractNotFound(address))
}

impl<'a> Transaction<'a> {
    pub fn new(base: &'a LedgerState) -> Self {
        Self {
            base,
            directory: None,
            sessions: BTreeMap::new(),
            registries: BTreeMap::new(),
            fx: Effects::new(&base.balances),
        }
    }

    fn load_session(&mut self, address: Address) -> Result<()> {
        if !self.sessions.contains_key(&address) {
            let session = self
                .base
                .sessions
                .get(&address)
                .ok_or(LedgerError::ContractNotFound(address))?;
            self.sessions.insert(address, session.clone());
        }
        Ok(())
    }

    fn load_registry(&mut self, address: Address) -> Result<()> {
        if !self.registries.contains_key(&address) {
            let registry = self
                .base
                .registries
                .get(&address)
                .ok_or(LedgerError::ContractNotFound(address))?;
            self.registries.insert(address, registry.clone());
        }
        Ok(())
    }

    fn callee(&mut self, call: &Call) -> Result<Address> {
        match call {
            Call::Directory(_) => Ok(self.base.directory.address()),
            Call::Session { session, .. } => {
                self.load_session(*session)?;
                Ok(*session)
            }
            Call::Registry { registry, .. } => {
                self.load_registry(*registry)?;
                Ok(*registry)
            }
        }
    }

    /// Moves the attached value to the callee, then runs the call body.
    pub fn run(&mut self, ctx: &CallContext, call: Call) -> Result<Outcome> {
        let callee = self.callee(&call)?;
        self.fx.transfer(ctx.caller, callee, ctx.value)?;

        match call {
            Call::Directory(call) => self.directory_call(ctx, call),
            Call::Session { session, call } => self.session_call(ctx, session, call),
            Call::Registry { registry, call } => self.registry_call(ctx, registry, call),
        }
    }

    pub fn airdrop(&mut self, account: Address, amount: u64) -> Result<()> {
        self.fx.credit(account, amount)
    }

    fn directory_call(&mut self, ctx: &CallContext, call: DirectoryCall) -> Result<Outcome> {
        let base = self.base;
        let directory = self
            .directory
            .get_or_insert_with(|| base.directory.clone());

        match call {
            DirectoryCall::CreateSessionPair(params) => {
                let (pair, session, registry) =
                    directory.create_session_pair(ctx, params, &mut self.fx)?;
                self.sessions.insert(pair.session, session);
                self.registries.insert(pair.registry, registry);
                Ok(Outcome::Pair(pair))
            }
        }
    }

    fn session_call(
        &mut self,
        ctx: &CallContext,
        address: Address,
        call: SessionCall,
    ) -> Result<Outcome> {
        self.load_session(address)?;
        let registry_address = self
            .sessions
            .get(&address)
            .map(|s| s.registry())
            .ok_or(LedgerError::ContractNotFound(address))?;
        self.load_registry(registry_address)?;

        let session = self
            .sessions
            .get_mut(&address)
            .ok_or(LedgerError::ContractNotFound(address))?;
        let registry = self
            .registries
            .get_mut(&registry_address)
            .ok_or(LedgerError::ContractNotFound(registry_address))?;
        let fx = &mut self.fx;

        match call {
            SessionCall::RefreshStatus => {
                ctx.require_no_value("refreshStatus")?;
                Ok(Outcome::Status(session.refresh_status(ctx, fx)))
            }
            SessionCall::CastVote(submission) => session
                .cast_vote(ctx, registry, fx, submission)
                .map(Outcome::VoteIndex),
            SessionCall::SubmitShares {
                vote_index,
                share_index,
                share,
            } => session
                .submit_shares(ctx, registry, fx, vote_index, share_index, share)
                .map(|_| Outcome::Unit),
            SessionCall::SubmitDecryptionValue { value_hex } => session
                .submit_decryption_value(ctx, registry, fx, value_hex)
                .map(|_| Outcome::Unit),
            SessionCall::TriggerRewardCalculation => session
                .trigger_reward_calculation(ctx, registry, fx)
                .map(Outcome::Rewards),
            SessionCall::Abort => session.abort(ctx, fx).map(|_| Outcome::Unit),
        }
    }

    fn registry_call(
        &mut self,
        ctx: &CallContext,
        address: Address,
        call: RegistryCall,
    ) -> Result<Outcome> {
        self.load_registry(address)?;
        let session_id = call.session_id();

        let session_address = match call {
            RegistryCall::LinkSession { session, .. } => {
                self.load_session(session)?;
                Some(session)
            }
            RegistryCall::RecordShareSubmission { .. }
            | RegistryCall::ClaimReward { .. }
            | RegistryCall::SweepRemainder { .. } => None,
            _ => {
                let linked = self
                    .registries
                    .get(&address)
                    .and_then(|r| r.session_ref(session_id))
                    .ok_or(LedgerError::SessionNotFound(session_id))?;
                self.load_session(linked)?;
                Some(linked)
            }
        };

        let session = session_address.and_then(|a| self.sessions.get(&a));
        let linked = || session.ok_or(LedgerError::SessionNotFound(session_id));
        let registry = component_mut(&mut self.registries, address)?;
        let fx = &mut self.fx;

        match call {
            RegistryCall::LinkSession { session_id, .. } => registry
                .link_session(ctx, session_id, linked()?, fx)
                .map(|_| Outcome::Unit),
            RegistryCall::RecordShareSubmission { session_id, holder } => registry
                .record_share_submission(ctx, session_id, holder, fx)
                .map(|_| Outcome::Unit),
            RegistryCall::ClaimReward { session_id } => registry
                .claim_reward(ctx, session_id, fx)
                .map(Outcome::Amount),
            RegistryCall::SweepRemainder { session_id } => registry
                .sweep_remainder(ctx, session_id, fx)
                .map(Outcome::Amount),
            RegistryCall::AddExternalFunding { .. } => registry
                .add_external_funding(ctx, linked()?, fx)
                .map(Outcome::Amount),
            RegistryCall::JoinAsHolder {
                bls_public_key_hex, ..
            } => registry
                .join_as_holder(ctx, linked()?, bls_public_key_hex, fx)
                .map(|_| Outcome::Unit),
            RegistryCall::RegisterAsVoter { .. } => registry
                .register_as_voter(ctx, linked()?, fx)
                .map(|_| Outcome::Unit),
            RegistryCall::CalculateRewards { .. } => registry
                .calculate_rewards(ctx, linked()?, fx)
                .map(Outcome::Rewards),
            RegistryCall::ClaimDeposit { .. } => registry
                .claim_deposit(ctx, linked()?, fx)
                .map(Outcome::Amount),
            RegistryCall::RefundAbortedDeposit { .. } => registry
                .refund_aborted_deposit(ctx, linked()?, fx)
                .map(Outcome::Amount),
            RegistryCall::ReclaimExternalFunding { .. } => registry
                .reclaim_external_funding(ctx, linked()?, fx)
                .map(Outcome::Amount),
        }
    }

    /// Consumes the working copy, numbering its events from `next_seq`.
    pub fn into_changes(self, next_seq: u64) -> ChangeSet {
        let (balances, events) = self.fx.into_parts();
        ChangeSet {
            directory: self.directory,
            sessions: self.sessions.into_values().collect(),
            registries: self.registries.into_values().collect(),
            balances: balances.into_iter().collect(),
            events: events
                .into_iter()
                .enumerate()
                .map(|(i, (emitter, at, event))| EventRecord {
                    seq: next_seq + i as u64,
                    emitter,
                    at,
                    event,
                })
                .collect(),
        }
    }
}
