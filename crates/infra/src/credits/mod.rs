//! Credit ledger: decrement-on-success settlement.

use async_trait::async_trait;

use audioforge_core::UserId;

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::InMemoryCreditLedger;
#[cfg(feature = "postgres")]
pub use postgres::PostgresCreditLedger;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CreditError {
    #[error("no credit account for user")]
    NoAccount,
    #[error("ledger error: {0}")]
    Ledger(String),
}

/// Minimal credit bookkeeping.
///
/// The orchestrator deducts a fixed cost after a successful generation;
/// deduction mirrors the product's unconditional decrement, so a balance
/// may go negative. Anything richer (purchases, invoicing) is out of scope.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn balance(&self, owner: UserId) -> Result<i64, CreditError>;

    async fn grant(&self, owner: UserId, amount: i64) -> Result<(), CreditError>;

    /// Deduct `amount`, returning the remaining balance.
    async fn deduct(&self, owner: UserId, amount: i64) -> Result<i64, CreditError>;
}
