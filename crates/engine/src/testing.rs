//! In-memory backend for engine tests, with switches for simulating outages
//! and concurrent coverage writers.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use tandem_core::{
    AccountId, AccountRangeProvider, ConfirmOutcome, CoverageStore, DateRange, Money,
    PairLedger, PairSelection, ReconcileError, SwapOutcome, Transaction, TransactionId,
    TransactionSource, TransferPair, UserId,
};

pub const ALICE: UserId = UserId(1);
pub const BOB: UserId = UserId(2);

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[derive(Default)]
struct State {
    next_id: i64,
    transactions: Vec<(UserId, Transaction)>,
    pairs: Vec<(UserId, TransferPair)>,
    coverage: HashMap<UserId, DateRange>,
    interference: VecDeque<DateRange>,
    source_down: bool,
    ledger_down: bool,
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    query_calls: AtomicUsize,
}

/// Each user owns a checking (`*01`) and a savings (`*02`) account.
fn checking(user: UserId) -> AccountId {
    AccountId(user.0 * 100 + 1)
}

fn savings(user: UserId) -> AccountId {
    AccountId(user.0 * 100 + 2)
}

impl MemoryBackend {
    fn push(&self, user: UserId, id: TransactionId, account: AccountId, day: NaiveDate, cents: i64) {
        self.state.lock().unwrap().transactions.push((
            user,
            Transaction {
                id,
                account_id: account,
                date: day,
                amount: Money::from_cents(cents),
                currency: "USD".to_string(),
            },
        ));
    }

    fn fresh_id(&self) -> TransactionId {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        TransactionId(state.next_id)
    }

    /// Moves `cents` from checking to savings and returns the two legs.
    pub fn add_transfer(
        &self,
        user: UserId,
        out_date: NaiveDate,
        in_date: NaiveDate,
        cents: i64,
    ) -> PairSelection {
        let out = self.fresh_id();
        let inc = self.fresh_id();
        self.push(user, out, checking(user), out_date, -cents);
        self.push(user, inc, savings(user), in_date, cents);
        PairSelection::new(out, inc)
    }

    pub fn add_outgoing(&self, user: UserId, id: TransactionId, day: NaiveDate, cents: i64) {
        self.push(user, id, checking(user), day, cents);
    }

    pub fn add_incoming(&self, user: UserId, id: TransactionId, day: NaiveDate, cents: i64) {
        self.push(user, id, savings(user), day, cents);
    }

    pub fn remove_transaction(&self, id: TransactionId) {
        self.state
            .lock()
            .unwrap()
            .transactions
            .retain(|(_, t)| t.id != id);
    }

    pub fn pair_count(&self, user: UserId) -> usize {
        self.state
            .lock()
            .unwrap()
            .pairs
            .iter()
            .filter(|(u, _)| *u == user)
            .count()
    }

    pub fn coverage(&self, user: UserId) -> Option<DateRange> {
        self.state.lock().unwrap().coverage.get(&user).copied()
    }

    pub fn set_coverage(&self, user: UserId, range: DateRange) {
        self.state.lock().unwrap().coverage.insert(user, range);
    }

    pub fn set_source_down(&self, down: bool) {
        self.state.lock().unwrap().source_down = down;
    }

    pub fn set_ledger_down(&self, down: bool) {
        self.state.lock().unwrap().ledger_down = down;
    }

    /// Each upcoming compare-and-swap loses to a writer that records the next
    /// queued range first.
    pub fn interfere_with_swaps(&self, writes: Vec<DateRange>) {
        self.state.lock().unwrap().interference.extend(writes);
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSource for MemoryBackend {
    async fn query(
        &self,
        user: UserId,
        account_ids: Option<&[AccountId]>,
        range: DateRange,
    ) -> Result<Vec<Transaction>, ReconcileError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.source_down {
            return Err(ReconcileError::Upstream("transaction source offline".to_string()));
        }
        Ok(state
            .transactions
            .iter()
            .filter(|(u, t)| {
                *u == user
                    && range.contains(t.date)
                    && account_ids.map_or(true, |ids| ids.contains(&t.account_id))
            })
            .map(|(_, t)| t.clone())
            .collect())
    }
}

#[async_trait]
impl AccountRangeProvider for MemoryBackend {
    async fn account_range(&self, user: UserId) -> Result<Option<DateRange>, ReconcileError> {
        let state = self.state.lock().unwrap();
        if state.source_down {
            return Err(ReconcileError::Upstream("transaction source offline".to_string()));
        }
        let dates = state
            .transactions
            .iter()
            .filter(|(u, _)| *u == user)
            .map(|(_, t)| t.date);
        let first = dates.clone().min();
        let last = dates.max();
        Ok(first.zip(last).map(|(s, e)| DateRange::new(s, e)))
    }
}

#[async_trait]
impl CoverageStore for MemoryBackend {
    async fn get(&self, user: UserId) -> Result<Option<DateRange>, ReconcileError> {
        Ok(self.coverage(user))
    }

    async fn compare_and_swap(
        &self,
        user: UserId,
        expected: Option<DateRange>,
        new: DateRange,
    ) -> Result<SwapOutcome, ReconcileError> {
        let mut state = self.state.lock().unwrap();
        if let Some(rival) = state.interference.pop_front() {
            let merged = state
                .coverage
                .get(&user)
                .map_or(rival, |current| current.union(rival));
            state.coverage.insert(user, merged);
            return Ok(SwapOutcome::Conflict);
        }
        if state.coverage.get(&user).copied() != expected {
            return Ok(SwapOutcome::Conflict);
        }
        state.coverage.insert(user, new);
        Ok(SwapOutcome::Swapped)
    }

    async fn clear(&self, user: UserId) -> Result<(), ReconcileError> {
        self.state.lock().unwrap().coverage.remove(&user);
        Ok(())
    }
}

#[async_trait]
impl PairLedger for MemoryBackend {
    async fn confirm_pair(
        &self,
        user: UserId,
        selection: PairSelection,
    ) -> Result<ConfirmOutcome, ReconcileError> {
        let mut state = self.state.lock().unwrap();
        if state.ledger_down {
            return Err(ReconcileError::Upstream("ledger offline".to_string()));
        }

        let leg = |id: TransactionId| {
            state
                .transactions
                .iter()
                .find(|(u, t)| *u == user && t.id == id)
                .map(|(_, t)| t.clone())
                .ok_or_else(|| ReconcileError::NotFound(format!("transaction {id}")))
        };
        let outgoing = leg(selection.outgoing_transaction_id)?;
        let incoming = leg(selection.incoming_transaction_id)?;

        let existing = state.pairs.iter().find(|(_, p)| {
            p.involves(selection.outgoing_transaction_id)
                || p.involves(selection.incoming_transaction_id)
        });
        if let Some((_, pair)) = existing {
            if pair.selection() == selection {
                return Ok(ConfirmOutcome::AlreadyConfirmed(pair.clone()));
            }
            let taken = if pair.involves(selection.outgoing_transaction_id) {
                selection.outgoing_transaction_id
            } else {
                selection.incoming_transaction_id
            };
            return Err(ReconcileError::AlreadyPaired(taken));
        }

        let pair = TransferPair::between(&outgoing, &incoming)?;
        state.pairs.push((user, pair.clone()));
        Ok(ConfirmOutcome::Confirmed(pair))
    }

    async fn confirmed_pairs(
        &self,
        user: UserId,
        range: Option<DateRange>,
    ) -> Result<Vec<TransferPair>, ReconcileError> {
        let state = self.state.lock().unwrap();
        if state.ledger_down {
            return Err(ReconcileError::Upstream("ledger offline".to_string()));
        }
        let mut pairs: Vec<TransferPair> = state
            .pairs
            .iter()
            .filter(|(u, p)| {
                *u == user
                    && range.map_or(true, |r| {
                        r.contains(p.outgoing_date) || r.contains(p.incoming_date)
                    })
            })
            .map(|(_, p)| p.clone())
            .collect();
        pairs.sort_by_key(|p| (p.outgoing_date, p.outgoing_transaction_id));
        Ok(pairs)
    }
}
