use std::collections::{HashMap, HashSet};

use tandem_core::{DateRange, Money, Transaction, TransactionId, TransferPair};

/// Finds likely internal transfers: an outgoing transaction in one account
/// and an incoming transaction of the same magnitude and currency in another.
#[derive(Debug, Clone, Default)]
pub struct PairMatcher {
    /// Largest allowed distance between the two legs' dates. `None` lets any
    /// two transactions of the input set pair up.
    pub max_window_days: Option<i64>,
}

/// Smallest date gap first, then smallest amount; dates and ids make the
/// order total.
fn rank(pair: &TransferPair) -> (i64, Money, chrono::NaiveDate, TransactionId, TransactionId) {
    (
        pair.date_difference_days,
        pair.amount,
        pair.outgoing_date,
        pair.outgoing_transaction_id,
        pair.incoming_transaction_id,
    )
}

impl PairMatcher {
    pub fn new(max_window_days: Option<i64>) -> Self {
        Self { max_window_days }
    }

    /// A matcher whose window is the span of the scanned range.
    pub fn for_range(range: DateRange) -> Self {
        Self::new(Some(range.days()))
    }

    /// Greedily assigns pairs in rank order; a transaction ends up in at most
    /// one pair. Pairs come back ordered by outgoing date.
    pub fn find_pairs(&self, transactions: &[Transaction]) -> Vec<TransferPair> {
        let mut candidates = self.candidates(transactions);
        candidates.sort_by_key(rank);

        let mut used: HashSet<TransactionId> = HashSet::new();
        let mut pairs = Vec::new();

        for pair in candidates {
            let out_id = pair.outgoing_transaction_id;
            let in_id = pair.incoming_transaction_id;
            if used.contains(&out_id) || used.contains(&in_id) {
                continue;
            }
            used.insert(out_id);
            used.insert(in_id);
            pairs.push(pair);
        }

        pairs.sort_by(|a, b| {
            (a.outgoing_date, a.outgoing_transaction_id)
                .cmp(&(b.outgoing_date, b.outgoing_transaction_id))
        });
        pairs
    }

    fn candidates(&self, transactions: &[Transaction]) -> Vec<TransferPair> {
        // Incoming legs keyed by magnitude and currency so each outgoing leg
        // only looks at amounts it could match.
        let mut incoming: HashMap<(Money, String), Vec<&Transaction>> = HashMap::new();
        for tx in transactions.iter().filter(|t| t.is_incoming()) {
            incoming
                .entry((tx.amount, tx.currency.to_ascii_uppercase()))
                .or_default()
                .push(tx);
        }

        transactions
            .iter()
            .filter(|t| t.is_outgoing())
            .flat_map(|out| {
                let key = (-out.amount, out.currency.to_ascii_uppercase());
                incoming
                    .get(&key)
                    .into_iter()
                    .flatten()
                    .filter_map(move |inc| self.score_pair(out, inc))
            })
            .collect()
    }

    /// The pair the legs form, if it is a valid transfer inside the window.
    fn score_pair(&self, out: &Transaction, inc: &Transaction) -> Option<TransferPair> {
        let pair = TransferPair::between(out, inc).ok()?;
        if let Some(window) = self.max_window_days {
            if pair.date_difference_days > window {
                return None;
            }
        }
        Some(pair)
    }
}
