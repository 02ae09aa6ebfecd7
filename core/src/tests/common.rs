use std::sync::Arc;

use crate::{
    Address, Amount, Call, DeployedPair, DirectoryCall, Ledger, ManualClock, Outcome,
    ParticipantRegistry, RegistryCall, Result, SessionCall, SessionParams, Timestamp,
    VoteSession, VoteSubmission,
};

pub const T0: Timestamp = 1_000;
pub const REG_END: Timestamp = T0 + 100;
pub const VOTE_END: Timestamp = T0 + 200;
pub const SHARES_END: Timestamp = T0 + 300;

pub fn user(label: &str) -> Address {
    Address::from_label(label)
}

pub fn params(required_deposit: Amount, min_share_threshold: u32) -> SessionParams {
    SessionParams {
        title: "Board election".into(),
        description: "Pick the next board chair".into(),
        start_date: REG_END,
        end_date: VOTE_END,
        shares_end_date: SHARES_END,
        options: vec!["alice".into(), "bob".into()],
        metadata: r#"{"round":1}"#.into(),
        required_deposit,
        min_share_threshold,
    }
}

pub fn submission() -> VoteSubmission {
    VoteSubmission {
        ciphertext: vec![0xde, 0xad, 0xbe, 0xef],
        g1r: vec![0x01; 48],
        g2r: vec![0x02; 96],
        alpha: vec!["0a".into(), "0b".into()],
        threshold: 1,
    }
}

/// A ledger on a manual clock with one deployed pair owned by `owner`.
pub struct Fixture {
    pub ledger: Ledger,
    pub clock: ManualClock,
    pub owner: Address,
    pub pair: DeployedPair,
}

impl Fixture {
    pub fn new(required_deposit: Amount, min_share_threshold: u32) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let clock = ManualClock::new(T0);
        let mut ledger = Ledger::with_clock(Arc::new(clock.clone()));
        let owner = user("owner");
        ledger.airdrop(owner, 10_000).unwrap();

        let pair = ledger
            .execute(
                owner,
                0,
                Call::Directory(DirectoryCall::CreateSessionPair(params(
                    required_deposit,
                    min_share_threshold,
                ))),
            )
            .unwrap()
            .pair()
            .unwrap();

        Self {
            ledger,
            clock,
            owner,
            pair,
        }
    }

    /// Deploys one more pair with the same parameters, owned by `owner`.
    pub fn deploy_another(&mut self) -> DeployedPair {
        let p = params(
            self.session().info(T0).required_deposit,
            self.session().min_share_threshold(),
        );
        self.ledger
            .execute(self.owner, 0, Call::Directory(DirectoryCall::CreateSessionPair(p)))
            .unwrap()
            .pair()
            .unwrap()
    }

    pub fn at(&self, now: Timestamp) {
        self.clock.set(now);
    }

    pub fn id(&self) -> u64 {
        self.pair.session_id
    }

    pub fn session(&self) -> &VoteSession {
        self.ledger.session(&self.pair.session).unwrap()
    }

    pub fn registry(&self) -> &ParticipantRegistry {
        self.ledger.registry(&self.pair.registry).unwrap()
    }

    pub fn balance(&self, who: &Address) -> Amount {
        self.ledger.balance_of(who)
    }

    pub fn funded(&mut self, label: &str, amount: Amount) -> Address {
        let who = user(label);
        self.ledger.airdrop(who, amount).unwrap();
        who
    }

    pub fn registry_call(
        &mut self,
        who: Address,
        value: Amount,
        call: RegistryCall,
    ) -> Result<Outcome> {
        let registry = self.pair.registry;
        self.ledger
            .execute(who, value, Call::Registry { registry, call })
    }

    pub fn session_call(&mut self, who: Address, call: SessionCall) -> Result<Outcome> {
        let session = self.pair.session;
        self.ledger.execute(who, 0, Call::Session { session, call })
    }

    pub fn join(&mut self, who: Address, value: Amount) -> Result<Outcome> {
        let session_id = self.id();
        self.registry_call(
            who,
            value,
            RegistryCall::JoinAsHolder {
                session_id,
                bls_public_key_hex: format!("b1{}", hex::encode(who.as_bytes())),
            },
        )
    }

    pub fn register(&mut self, who: Address) -> Result<Outcome> {
        let session_id = self.id();
        self.registry_call(who, 0, RegistryCall::RegisterAsVoter { session_id })
    }

    pub fn vote(&mut self, who: Address) -> Result<u64> {
        self.session_call(who, SessionCall::CastVote(submission()))
            .map(|o| o.vote_index().unwrap())
    }

    pub fn submit_shares(&mut self, who: Address, vote_index: u64) -> Result<Outcome> {
        let share_index = self
            .registry()
            .holder_index(self.id(), &who)
            .unwrap_or(0);
        self.session_call(
            who,
            SessionCall::SubmitShares {
                vote_index,
                share_index,
                share: vec![0x5a; 32],
            },
        )
    }

    pub fn fund(&mut self, amount: Amount) -> Result<Outcome> {
        let (owner, session_id) = (self.owner, self.id());
        self.registry_call(owner, amount, RegistryCall::AddExternalFunding { session_id })
    }

    pub fn calculate(&mut self, who: Address) -> Result<Outcome> {
        let session_id = self.id();
        self.registry_call(who, 0, RegistryCall::CalculateRewards { session_id })
    }

    pub fn claim_reward(&mut self, who: Address) -> Result<Outcome> {
        let session_id = self.id();
        self.registry_call(who, 0, RegistryCall::ClaimReward { session_id })
    }

    pub fn claim_deposit(&mut self, who: Address) -> Result<Outcome> {
        let session_id = self.id();
        self.registry_call(who, 0, RegistryCall::ClaimDeposit { session_id })
    }
}
