//! Session directory: deploys and indexes `(VoteSession, ParticipantRegistry)`
//! pairs under a monotonically increasing session id.

use chronoshare_address::Address;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::ledger::{CallContext, Effects, Event};
use crate::registry::ParticipantRegistry;
use crate::session::{Schedule, VoteSession};
use crate::{Amount, SessionId, Timestamp};

/// Arguments of `createSessionPair`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParams {
    pub title: String,
    pub description: String,
    /// End of registration.
    pub start_date: Timestamp,
    /// End of voting.
    pub end_date: Timestamp,
    /// End of share collection.
    pub shares_end_date: Timestamp,
    pub options: Vec<String>,
    pub metadata: String,
    pub required_deposit: Amount,
    pub min_share_threshold: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedPair {
    pub session_id: SessionId,
    pub session: Address,
    pub registry: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDirectory {
    address: Address,
    pairs: Vec<DeployedPair>,
}

impl SessionDirectory {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            pairs: Vec::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn deployed_session_count(&self) -> u64 {
        self.pairs.len() as u64
    }

    pub fn pair(&self, session_id: SessionId) -> Option<DeployedPair> {
        usize::try_from(session_id)
            .ok()
            .and_then(|i| self.pairs.get(i))
            .copied()
    }

    pub fn vote_session_address(&self, session_id: SessionId) -> Option<Address> {
        self.pair(session_id).map(|p| p.session)
    }

    pub fn registry_address(&self, session_id: SessionId) -> Option<Address> {
        self.pair(session_id).map(|p| p.registry)
    }

    pub fn pairs(&self) -> &[DeployedPair] {
        &self.pairs
    }

    /// Validates `params`, builds a fresh session and registry owned by the
    /// caller, and links them. The new components are returned for the host
    /// to install.
    pub fn create_session_pair(
        &mut self,
        ctx: &CallContext,
        params: SessionParams,
        fx: &mut Effects,
    ) -> Result<(DeployedPair, VoteSession, ParticipantRegistry)> {
        ctx.require_no_value("createSessionPair")?;
        validate(ctx, &params)?;
        let schedule = Schedule::new(params.start_date, params.end_date, params.shares_end_date)?;

        let session_id = self.deployed_session_count();
        let pair = DeployedPair {
            session_id,
            session: Address::contract(&self.address, "session", session_id),
            registry: Address::contract(&self.address, "registry", session_id),
        };

        let owner = ctx.caller;
        let session = VoteSession::new(
            session_id,
            pair.session,
            owner,
            pair.registry,
            params.title,
            params.description,
            params.options,
            params.metadata,
            schedule,
            params.required_deposit,
            params.min_share_threshold,
        );
        let mut registry = ParticipantRegistry::new(pair.registry, owner, self.address);

        fx.emit(
            self.address,
            ctx.now,
            Event::SessionPairDeployed {
                session_id,
                session: pair.session,
                registry: pair.registry,
                owner,
            },
        );
        registry.link_session(&ctx.forward(self.address), session_id, &session, fx)?;

        debug!(
            "Session {} deployed by {}: session {} registry {}",
            session_id, owner, pair.session, pair.registry
        );
        self.pairs.push(pair);
        Ok((pair, session, registry))
    }
}

fn validate(ctx: &CallContext, params: &SessionParams) -> Result<()> {
    if params.title.trim().is_empty() {
        return Err(LedgerError::InvalidParameters("title must not be empty".into()));
    }
    if params.options.is_empty() {
        return Err(LedgerError::InvalidParameters(
            "at least one option is required".into(),
        ));
    }
    if params.start_date <= ctx.now {
        return Err(LedgerError::InvalidParameters(format!(
            "start date {} is not in the future (now {})",
            params.start_date, ctx.now
        )));
    }
    if params.min_share_threshold == 0 {
        return Err(LedgerError::InvalidParameters(
            "minimum share threshold must be positive".into(),
        ));
    }
    Ok(())
}
