//! Backing-value movement (deposits in, payouts out).
//!
//! The ledger itself never moves value. Every transition that accepts or pays
//! out backing currency goes through a [`ValueChannel`], which is the only
//! external call a transition makes.

use std::collections::HashMap;
use std::sync::RwLock;

use curvebook_core::AccountId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("account {account} holds {available}, needs {requested}")]
    Insufficient {
        account: AccountId,
        available: u128,
        requested: u128,
    },
    #[error("recipient {0} refused the payment")]
    Refused(AccountId),
    #[error("channel unavailable: {0}")]
    Unavailable(String),
}

/// Moves backing value between external accounts and the ledger reserve.
///
/// Implementations may call back into the ledger service from `pay`; the
/// service rejects such reentrant transitions.
pub trait ValueChannel: Send + Sync {
    /// Take `amount` from `from` into the reserve. Must be all-or-nothing.
    fn collect(&self, from: AccountId, amount: u128) -> Result<(), ChannelError>;

    /// Pay `amount` out of the reserve to `to`. Must be all-or-nothing.
    fn pay(&self, to: AccountId, amount: u128) -> Result<(), ChannelError>;
}

impl<C> ValueChannel for std::sync::Arc<C>
where
    C: ValueChannel + ?Sized,
{
    fn collect(&self, from: AccountId, amount: u128) -> Result<(), ChannelError> {
        (**self).collect(from, amount)
    }

    fn pay(&self, to: AccountId, amount: u128) -> Result<(), ChannelError> {
        (**self).pay(to, amount)
    }
}

/// In-memory external wallets for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryWallets {
    balances: RwLock<HashMap<AccountId, u128>>,
}

impl InMemoryWallets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint external value into a wallet (dev faucet).
    pub fn credit(&self, account: AccountId, amount: u128) -> Result<u128, ChannelError> {
        let mut balances = self.write()?;
        let entry = balances.entry(account).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| ChannelError::Unavailable("wallet balance overflow".to_string()))?;
        Ok(*entry)
    }

    pub fn balance(&self, account: AccountId) -> Result<u128, ChannelError> {
        let balances = self
            .balances
            .read()
            .map_err(|_| ChannelError::Unavailable("lock poisoned".to_string()))?;
        Ok(balances.get(&account).copied().unwrap_or(0))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<AccountId, u128>>, ChannelError> {
        self.balances
            .write()
            .map_err(|_| ChannelError::Unavailable("lock poisoned".to_string()))
    }
}

impl ValueChannel for InMemoryWallets {
    fn collect(&self, from: AccountId, amount: u128) -> Result<(), ChannelError> {
        let mut balances = self.write()?;
        let available = balances.get(&from).copied().unwrap_or(0);
        if available < amount {
            return Err(ChannelError::Insufficient {
                account: from,
                available,
                requested: amount,
            });
        }
        balances.insert(from, available - amount);
        Ok(())
    }

    fn pay(&self, to: AccountId, amount: u128) -> Result<(), ChannelError> {
        // Write guard is dropped before returning; callbacks never see it held.
        self.credit(to, amount).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_debits_and_pay_credits() {
        let wallets = InMemoryWallets::new();
        let alice = AccountId::new();
        wallets.credit(alice, 100).unwrap();

        wallets.collect(alice, 60).unwrap();
        assert_eq!(wallets.balance(alice).unwrap(), 40);

        wallets.pay(alice, 5).unwrap();
        assert_eq!(wallets.balance(alice).unwrap(), 45);
    }

    #[test]
    fn collect_is_all_or_nothing() {
        let wallets = InMemoryWallets::new();
        let alice = AccountId::new();
        wallets.credit(alice, 10).unwrap();

        let err = wallets.collect(alice, 11).unwrap_err();

        assert_eq!(
            err,
            ChannelError::Insufficient {
                account: alice,
                available: 10,
                requested: 11
            }
        );
        assert_eq!(wallets.balance(alice).unwrap(), 10);
    }
}
