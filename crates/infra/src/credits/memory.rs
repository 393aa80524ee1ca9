//! In-memory credit ledger for tests/dev.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use audioforge_core::UserId;

use super::{CreditError, CreditLedger};

/// In-memory ledger. Unknown users implicitly start at zero on `grant`/
/// `deduct`; `balance` on a user who never appeared reports `NoAccount`.
#[derive(Debug, Default)]
pub struct InMemoryCreditLedger {
    balances: RwLock<HashMap<UserId, i64>>,
}

impl InMemoryCreditLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CreditLedger for InMemoryCreditLedger {
    async fn balance(&self, owner: UserId) -> Result<i64, CreditError> {
        self.balances
            .read()
            .unwrap()
            .get(&owner)
            .copied()
            .ok_or(CreditError::NoAccount)
    }

    async fn grant(&self, owner: UserId, amount: i64) -> Result<(), CreditError> {
        let mut balances = self.balances.write().unwrap();
        *balances.entry(owner).or_insert(0) += amount;
        Ok(())
    }

    async fn deduct(&self, owner: UserId, amount: i64) -> Result<i64, CreditError> {
        let mut balances = self.balances.write().unwrap();
        let balance = balances.entry(owner).or_insert(0);
        *balance -= amount;
        Ok(*balance)
    }
}
