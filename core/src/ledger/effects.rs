use std::collections::BTreeMap;

use chronoshare_address::Address;

use super::events::Event;
use crate::error::{LedgerError, Result};
use crate::{Amount, Timestamp};

/// Side effects of an in-flight call: balance movements and emitted events.
///
/// Balances are copy-on-write over the committed ledger; nothing here is
/// visible outside the transaction until the host commits it.
pub struct Effects<'a> {
    committed: &'a BTreeMap<Address, Amount>,
    balances: BTreeMap<Address, Amount>,
    events: Vec<(Address, Timestamp, Event)>,
}

impl<'a> Effects<'a> {
    pub(crate) fn new(committed: &'a BTreeMap<Address, Amount>) -> Self {
        Self {
            committed,
            balances: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances
            .get(account)
            .or_else(|| self.committed.get(account))
            .copied()
            .unwrap_or(0)
    }

    pub fn credit(&mut self, account: Address, amount: Amount) -> Result<()> {
        let balance = self
            .balance_of(&account)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.balances.insert(account, balance);
        Ok(())
    }

    pub fn debit(&mut self, account: Address, amount: Amount) -> Result<()> {
        let balance = self.balance_of(&account);
        if balance < amount {
            return Err(LedgerError::InsufficientFunds {
                balance,
                needed: amount,
            });
        }
        self.balances.insert(account, balance - amount);
        Ok(())
    }

    /// Moves value between accounts. Payouts call this as their final step.
    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    pub fn emit(&mut self, emitter: Address, at: Timestamp, event: Event) {
        self.events.push((emitter, at, event));
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        BTreeMap<Address, Amount>,
        Vec<(Address, Timestamp, Event)>,
    ) {
        (self.balances, self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committed() -> BTreeMap<Address, Amount> {
        let mut m = BTreeMap::new();
        m.insert(Address::from_label("alice"), 500);
        m
    }

    #[test]
    fn transfer_moves_value_over_committed_balances() {
        let base = committed();
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");

        let mut fx = Effects::new(&base);
        fx.transfer(alice, bob, 200).unwrap();

        assert_eq!(fx.balance_of(&alice), 300);
        assert_eq!(fx.balance_of(&bob), 200);
        // committed view untouched
        assert_eq!(base[&alice], 500);
    }

    #[test]
    fn debit_beyond_balance_fails() {
        let base = committed();
        let mut fx = Effects::new(&base);
        let err = fx
            .transfer(Address::from_label("bob"), Address::from_label("alice"), 1)
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                balance: 0,
                needed: 1
            }
        );
    }

    #[test]
    fn credit_overflow_is_rejected() {
        let base = BTreeMap::new();
        let mut fx = Effects::new(&base);
        let a = Address::from_label("a");
        fx.credit(a, u64::MAX).unwrap();
        assert_eq!(fx.credit(a, 1), Err(LedgerError::Overflow));
    }
}
