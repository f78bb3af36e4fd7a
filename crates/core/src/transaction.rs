use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::account::AccountId;
use super::error::ReconcileError;
use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub i64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A posted transaction as read from the transaction source. The sign of
/// `amount` encodes direction: negative leaves `account_id`, positive arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub date: NaiveDate,
    pub amount: Money,
    pub currency: String,
}

impl Transaction {
    pub fn is_outgoing(&self) -> bool {
        self.amount.is_negative()
    }

    pub fn is_incoming(&self) -> bool {
        self.amount.is_positive()
    }
}

/// The two legs of a transfer as chosen by the user for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairSelection {
    pub outgoing_transaction_id: TransactionId,
    pub incoming_transaction_id: TransactionId,
}

impl PairSelection {
    pub fn new(outgoing: TransactionId, incoming: TransactionId) -> Self {
        PairSelection {
            outgoing_transaction_id: outgoing,
            incoming_transaction_id: incoming,
        }
    }
}

impl fmt::Display for PairSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.outgoing_transaction_id, self.incoming_transaction_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferPair {
    pub outgoing_transaction_id: TransactionId,
    pub incoming_transaction_id: TransactionId,
    /// Positive magnitude shared by both legs.
    pub amount: Money,
    pub currency: String,
    pub outgoing_date: NaiveDate,
    pub incoming_date: NaiveDate,
    pub date_difference_days: i64,
}

impl TransferPair {
    /// Pairs an outgoing and an incoming transaction, rejecting legs that
    /// cannot be the two sides of one transfer.
    pub fn between(outgoing: &Transaction, incoming: &Transaction) -> Result<Self, ReconcileError> {
        if outgoing.id == incoming.id {
            return Err(ReconcileError::InvalidPair(format!(
                "transaction {} cannot pair with itself",
                outgoing.id
            )));
        }
        if !outgoing.is_outgoing() {
            return Err(ReconcileError::InvalidPair(format!(
                "transaction {} is not outgoing",
                outgoing.id
            )));
        }
        if !incoming.is_incoming() {
            return Err(ReconcileError::InvalidPair(format!(
                "transaction {} is not incoming",
                incoming.id
            )));
        }
        if outgoing.account_id == incoming.account_id {
            return Err(ReconcileError::InvalidPair(format!(
                "both legs are in account {}",
                outgoing.account_id
            )));
        }
        if !outgoing.currency.eq_ignore_ascii_case(&incoming.currency) {
            return Err(ReconcileError::InvalidPair(format!(
                "currency mismatch: {} vs {}",
                outgoing.currency, incoming.currency
            )));
        }
        if incoming.amount != -outgoing.amount {
            return Err(ReconcileError::InvalidPair(format!(
                "amounts differ: {} vs {}",
                outgoing.amount, incoming.amount
            )));
        }

        Ok(TransferPair {
            outgoing_transaction_id: outgoing.id,
            incoming_transaction_id: incoming.id,
            amount: incoming.amount,
            currency: outgoing.currency.to_ascii_uppercase(),
            outgoing_date: outgoing.date,
            incoming_date: incoming.date,
            date_difference_days: (incoming.date - outgoing.date).num_days().abs(),
        })
    }

    pub fn selection(&self) -> PairSelection {
        PairSelection::new(self.outgoing_transaction_id, self.incoming_transaction_id)
    }

    pub fn involves(&self, id: TransactionId) -> bool {
        self.outgoing_transaction_id == id || self.incoming_transaction_id == id
    }
}
