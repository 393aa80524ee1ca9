//! Postgres-backed credit ledger.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use audioforge_core::UserId;

use super::{CreditError, CreditLedger};

#[derive(Debug, Clone)]
pub struct PostgresCreditLedger {
    pool: PgPool,
}

impl PostgresCreditLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), CreditError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS credit_balances ( \
                 owner_id UUID PRIMARY KEY, \
                 balance  BIGINT NOT NULL DEFAULT 0 \
             )",
        )
        .execute(&self.pool)
        .await
        .map_err(ledger_err)?;
        Ok(())
    }
}

fn ledger_err(e: sqlx::Error) -> CreditError {
    CreditError::Ledger(e.to_string())
}

#[async_trait]
impl CreditLedger for PostgresCreditLedger {
    async fn balance(&self, owner: UserId) -> Result<i64, CreditError> {
        let row = sqlx::query("SELECT balance FROM credit_balances WHERE owner_id = $1")
            .bind(owner.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(ledger_err)?;

        match row {
            Some(row) => row.try_get("balance").map_err(ledger_err),
            None => Err(CreditError::NoAccount),
        }
    }

    async fn grant(&self, owner: UserId, amount: i64) -> Result<(), CreditError> {
        sqlx::query(
            "INSERT INTO credit_balances (owner_id, balance) VALUES ($1, $2) \
             ON CONFLICT (owner_id) DO UPDATE SET balance = credit_balances.balance + $2",
        )
        .bind(owner.as_uuid())
        .bind(amount)
        .execute(&self.pool)
        .await
        .map_err(ledger_err)?;
        Ok(())
    }

    async fn deduct(&self, owner: UserId, amount: i64) -> Result<i64, CreditError> {
        let row = sqlx::query(
            "INSERT INTO credit_balances (owner_id, balance) VALUES ($1, -$2) \
             ON CONFLICT (owner_id) DO UPDATE SET balance = credit_balances.balance - $2 \
             RETURNING balance",
        )
        .bind(owner.as_uuid())
        .bind(amount)
        .fetch_one(&self.pool)
        .await
        .map_err(ledger_err)?;

        row.try_get("balance").map_err(ledger_err)
    }
}
