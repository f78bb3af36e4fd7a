//! Collaborators the engine reads from and writes to. Storage backends
//! implement these; the engine is generic over them.

use async_trait::async_trait;

use crate::account::{AccountId, UserId};
use crate::error::ReconcileError;
use crate::period::DateRange;
use crate::transaction::{PairSelection, Transaction, TransferPair};

#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Transactions of `user` dated within `range`, optionally restricted to
    /// `account_ids`.
    async fn query(
        &self,
        user: UserId,
        account_ids: Option<&[AccountId]>,
        range: DateRange,
    ) -> Result<Vec<Transaction>, ReconcileError>;
}

#[async_trait]
pub trait AccountRangeProvider: Send + Sync {
    /// Earliest and latest transaction dates across all of the user's
    /// accounts, or `None` when the user has no transactions.
    async fn account_range(&self, user: UserId) -> Result<Option<DateRange>, ReconcileError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    Swapped,
    /// The stored value no longer matched the expected one.
    Conflict,
}

#[async_trait]
pub trait CoverageStore: Send + Sync {
    async fn get(&self, user: UserId) -> Result<Option<DateRange>, ReconcileError>;

    /// Writes `new` only if the stored range still equals `expected`.
    async fn compare_and_swap(
        &self,
        user: UserId,
        expected: Option<DateRange>,
        new: DateRange,
    ) -> Result<SwapOutcome, ReconcileError>;

    async fn clear(&self, user: UserId) -> Result<(), ReconcileError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    Confirmed(TransferPair),
    /// The identical pair was confirmed earlier; nothing was written.
    AlreadyConfirmed(TransferPair),
}

impl ConfirmOutcome {
    pub fn pair(&self) -> &TransferPair {
        match self {
            ConfirmOutcome::Confirmed(p) | ConfirmOutcome::AlreadyConfirmed(p) => p,
        }
    }
}

#[async_trait]
pub trait PairLedger: Send + Sync {
    /// Records one user-approved pair. Fails with `NotFound` when either leg
    /// is gone, `AlreadyPaired` when a leg belongs to a different pair and
    /// `InvalidPair` when the legs cannot form a transfer.
    async fn confirm_pair(
        &self,
        user: UserId,
        selection: PairSelection,
    ) -> Result<ConfirmOutcome, ReconcileError>;

    /// Confirmed pairs with at least one leg dated inside `range` (all pairs
    /// when `None`), ordered by outgoing date.
    async fn confirmed_pairs(
        &self,
        user: UserId,
        range: Option<DateRange>,
    ) -> Result<Vec<TransferPair>, ReconcileError>;
}

/// Everything the reconciliation coordinator needs from one backend.
pub trait ReconcileBackend:
    TransactionSource + AccountRangeProvider + CoverageStore + PairLedger
{
}

impl<T> ReconcileBackend for T where
    T: TransactionSource + AccountRangeProvider + CoverageStore + PairLedger
{
}
