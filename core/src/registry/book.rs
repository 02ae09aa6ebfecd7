use std::collections::{BTreeMap, BTreeSet};

use chronoshare_address::Address;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::Amount;

/// Per-session participant record. Identity fields never change after
/// registration; `has_submitted_shares` flips false to true exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub is_registered: bool,
    pub is_holder: bool,
    pub deposit_amount: Amount,
    pub bls_public_key_hex: String,
    pub has_submitted_shares: bool,
}

/// Snapshot of how a session's reward pool splits among eligible holders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub external_funding: Amount,
    pub forfeited: Amount,
    pub eligible_holders: u64,
    pub per_holder: Amount,
    pub remainder: Amount,
    pub calculated: bool,
}

impl RewardBreakdown {
    pub fn pool(&self) -> Amount {
        self.external_funding.saturating_add(self.forfeited)
    }
}

/// Everything a registry tracks for one linked session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SessionBook {
    pub session_ref: Address,
    pub participants: BTreeMap<Address, ParticipantInfo>,
    pub active_holders: Vec<Address>,
    pub external_funding: Amount,
    pub rewards_owed: BTreeMap<Address, Amount>,
    pub reward_claimed: BTreeSet<Address>,
    pub deposit_claimed: BTreeSet<Address>,
    pub rewards_calculated: bool,
    /// Frozen at calculation time.
    pub settlement: Option<RewardBreakdown>,
    pub undistributed: Amount,
    pub remainder_swept: bool,
    pub funding_reclaimed: bool,
}

impl SessionBook {
    pub fn new(session_ref: Address) -> Self {
        Self {
            session_ref,
            participants: BTreeMap::new(),
            active_holders: Vec::new(),
            external_funding: 0,
            rewards_owed: BTreeMap::new(),
            reward_claimed: BTreeSet::new(),
            deposit_claimed: BTreeSet::new(),
            rewards_calculated: false,
            settlement: None,
            undistributed: 0,
            remainder_swept: false,
            funding_reclaimed: false,
        }
    }

    pub fn holders(&self) -> impl Iterator<Item = (&Address, &ParticipantInfo)> {
        self.active_holders
            .iter()
            .filter_map(|a| self.participants.get(a).map(|p| (a, p)))
    }

    /// Splits `external_funding + forfeited deposits` evenly over the holders
    /// that submitted shares. Integer division; the leftover is `remainder`.
    pub fn breakdown(&self) -> Result<RewardBreakdown> {
        if let Some(settled) = self.settlement {
            return Ok(settled);
        }

        let mut forfeited: Amount = 0;
        let mut eligible: u64 = 0;
        for (_, info) in self.holders() {
            if info.has_submitted_shares {
                eligible += 1;
            } else {
                forfeited = forfeited
                    .checked_add(info.deposit_amount)
                    .ok_or(LedgerError::Overflow)?;
            }
        }

        let pool = self
            .external_funding
            .checked_add(forfeited)
            .ok_or(LedgerError::Overflow)?;
        let (per_holder, remainder) = match eligible {
            0 => (0, 0),
            n => (pool / n, pool % n),
        };

        Ok(RewardBreakdown {
            external_funding: self.external_funding,
            forfeited,
            eligible_holders: eligible,
            per_holder,
            remainder,
            calculated: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holder(deposit: Amount, submitted: bool) -> ParticipantInfo {
        ParticipantInfo {
            is_registered: true,
            is_holder: true,
            deposit_amount: deposit,
            bls_public_key_hex: "aa".into(),
            has_submitted_shares: submitted,
        }
    }

    fn book_with(holders: &[(&str, Amount, bool)], funding: Amount) -> SessionBook {
        let mut book = SessionBook::new(Address::from_label("session"));
        for (label, deposit, submitted) in holders {
            let addr = Address::from_label(label);
            book.participants.insert(addr, holder(*deposit, *submitted));
            book.active_holders.push(addr);
        }
        book.external_funding = funding;
        book
    }

    #[test]
    fn forfeited_deposits_join_the_pool() {
        let book = book_with(&[("h1", 100, true), ("h2", 100, false)], 0);
        let b = book.breakdown().unwrap();
        assert_eq!(b.forfeited, 100);
        assert_eq!(b.eligible_holders, 1);
        assert_eq!(b.per_holder, 100);
        assert_eq!(b.remainder, 0);
    }

    #[test]
    fn uneven_pool_leaves_remainder() {
        let book = book_with(&[("h1", 10, true), ("h2", 10, true), ("h3", 10, true)], 50);
        let b = book.breakdown().unwrap();
        assert_eq!(b.pool(), 50);
        assert_eq!(b.per_holder, 16);
        assert_eq!(b.remainder, 2);
        assert_eq!(b.per_holder * b.eligible_holders + b.remainder, b.pool());
    }

    #[test]
    fn voters_are_ignored() {
        let mut book = book_with(&[("h1", 100, true)], 30);
        book.participants.insert(
            Address::from_label("voter"),
            ParticipantInfo {
                is_registered: true,
                ..Default::default()
            },
        );
        let b = book.breakdown().unwrap();
        assert_eq!(b.eligible_holders, 1);
        assert_eq!(b.per_holder, 30);
    }

    #[test]
    fn no_eligible_holders_yields_zero_split() {
        let book = book_with(&[("h1", 100, false)], 20);
        let b = book.breakdown().unwrap();
        assert_eq!(b.eligible_holders, 0);
        assert_eq!(b.pool(), 120);
        assert_eq!(b.per_holder, 0);
    }

    #[test]
    fn settlement_is_frozen() {
        let mut book = book_with(&[("h1", 100, true)], 30);
        let mut settled = book.breakdown().unwrap();
        settled.calculated = true;
        book.settlement = Some(settled);
        book.external_funding = 999;
        assert_eq!(book.breakdown().unwrap(), settled);
    }
}
