use async_trait::async_trait;
use tandem_core::{
    AccountId, AccountRangeProvider, ConfirmOutcome, CoverageStore, DateRange, PairLedger,
    PairSelection, ReconcileError, SwapOutcome, Transaction, TransactionSource, TransferPair,
    UserId,
};

use crate::db::{self, DbPool};

fn upstream(e: sqlx::Error) -> ReconcileError {
    ReconcileError::Upstream(e.to_string())
}

/// A leg claimed by another writer since it was checked surfaces as a UNIQUE
/// violation on `transfer_pairs`.
fn pair_insert_error(e: sqlx::Error, pair: &TransferPair) -> ReconcileError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            ReconcileError::AlreadyPaired(pair.outgoing_transaction_id)
        }
        other => upstream(other),
    }
}

/// SQLite-backed implementation of every collaborator the engine consumes.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl TransactionSource for SqliteStore {
    async fn query(
        &self,
        user: UserId,
        account_ids: Option<&[AccountId]>,
        range: DateRange,
    ) -> Result<Vec<Transaction>, ReconcileError> {
        db::query_transactions(&self.pool, user, account_ids, range)
            .await
            .map_err(upstream)
    }
}

#[async_trait]
impl AccountRangeProvider for SqliteStore {
    async fn account_range(&self, user: UserId) -> Result<Option<DateRange>, ReconcileError> {
        db::account_date_range(&self.pool, user)
            .await
            .map_err(upstream)
    }
}

#[async_trait]
impl CoverageStore for SqliteStore {
    async fn get(&self, user: UserId) -> Result<Option<DateRange>, ReconcileError> {
        db::get_checked_range(&self.pool, user)
            .await
            .map_err(upstream)
    }

    async fn compare_and_swap(
        &self,
        user: UserId,
        expected: Option<DateRange>,
        new: DateRange,
    ) -> Result<SwapOutcome, ReconcileError> {
        let swapped = db::swap_checked_range(&self.pool, user, expected, new)
            .await
            .map_err(upstream)?;
        Ok(if swapped {
            SwapOutcome::Swapped
        } else {
            SwapOutcome::Conflict
        })
    }

    async fn clear(&self, user: UserId) -> Result<(), ReconcileError> {
        db::clear_checked_range(&self.pool, user)
            .await
            .map_err(upstream)
    }
}

#[async_trait]
impl PairLedger for SqliteStore {
    async fn confirm_pair(
        &self,
        user: UserId,
        selection: PairSelection,
    ) -> Result<ConfirmOutcome, ReconcileError> {
        // Dropping `tx` on an early return rolls it back.
        let mut tx = self.pool.begin().await.map_err(upstream)?;

        let mut legs = Vec::with_capacity(2);
        for id in [
            selection.outgoing_transaction_id,
            selection.incoming_transaction_id,
        ] {
            let leg = db::fetch_transaction(&mut *tx, user, id)
                .await
                .map_err(upstream)?
                .ok_or_else(|| ReconcileError::NotFound(format!("transaction {id}")))?;
            legs.push(leg);
        }

        for leg in &legs {
            if let Some(existing) = db::fetch_pair_involving(&mut *tx, leg.id)
                .await
                .map_err(upstream)?
            {
                if existing.selection() == selection {
                    return Ok(ConfirmOutcome::AlreadyConfirmed(existing));
                }
                return Err(ReconcileError::AlreadyPaired(leg.id));
            }
        }

        let pair = TransferPair::between(&legs[0], &legs[1])?;
        db::insert_pair(&mut *tx, user, &pair)
            .await
            .map_err(|e| pair_insert_error(e, &pair))?;
        tx.commit().await.map_err(upstream)?;

        Ok(ConfirmOutcome::Confirmed(pair))
    }

    async fn confirmed_pairs(
        &self,
        user: UserId,
        range: Option<DateRange>,
    ) -> Result<Vec<TransferPair>, ReconcileError> {
        db::list_transfer_pairs(&self.pool, user, range)
            .await
            .map_err(upstream)
    }
}
