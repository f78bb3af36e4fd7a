//! Wire shapes for the HTTP API. Dates travel as epoch milliseconds (UTC
//! start of day); everything inside the engine works on calendar days.

use serde::{Deserialize, Serialize};
use tandem_core::{
    AccountId, DateRange, ErrorKind, Money, PairSelection, Progress, ReconcileError,
    TransactionId, TransferPair,
};
use tandem_engine::{
    BulkConfirmResult, ConfirmedPairs, CoverageUpdate, DetectResult, FailedPair, ProgressReport,
    ReconcileState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeMillis {
    pub start_date: i64,
    pub end_date: i64,
}

impl RangeMillis {
    pub fn to_range(self) -> Result<DateRange, ReconcileError> {
        DateRange::from_epoch_millis(self.start_date, self.end_date)
    }
}

impl From<DateRange> for RangeMillis {
    fn from(range: DateRange) -> Self {
        Self {
            start_date: range.start_millis(),
            end_date: range.end_millis(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub start_date: i64,
    pub end_date: i64,
    #[serde(default)]
    pub account_ids: Option<Vec<AccountId>>,
}

#[derive(Debug, Serialize)]
pub struct PairView {
    pub outgoing_transaction_id: TransactionId,
    pub incoming_transaction_id: TransactionId,
    pub amount: Money,
    pub currency: String,
    pub outgoing_date: i64,
    pub incoming_date: i64,
    pub date_difference_days: i64,
}

impl From<TransferPair> for PairView {
    fn from(pair: TransferPair) -> Self {
        let day = |d| DateRange::new(d, d).start_millis();
        Self {
            outgoing_date: day(pair.outgoing_date),
            incoming_date: day(pair.incoming_date),
            outgoing_transaction_id: pair.outgoing_transaction_id,
            incoming_transaction_id: pair.incoming_transaction_id,
            amount: pair.amount,
            currency: pair.currency,
            date_difference_days: pair.date_difference_days,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub transfers: Vec<PairView>,
    pub count: usize,
    pub date_range: RangeMillis,
}

impl From<DetectResult> for DetectResponse {
    fn from(result: DetectResult) -> Self {
        Self {
            transfers: result.transfers.into_iter().map(PairView::from).collect(),
            count: result.count,
            date_range: result.date_range.into(),
        }
    }
}

/// Query string of the confirmed-pair listing; both bounds or neither.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
}

impl ListQuery {
    pub fn to_range(&self) -> Result<Option<DateRange>, ReconcileError> {
        match (self.start_date, self.end_date) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => DateRange::from_epoch_millis(start, end).map(Some),
            _ => Err(ReconcileError::Validation(
                "start_date and end_date must be given together".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConfirmedPairsResponse {
    pub pairs: Vec<PairView>,
    pub count: usize,
}

impl From<ConfirmedPairs> for ConfirmedPairsResponse {
    fn from(confirmed: ConfirmedPairs) -> Self {
        Self {
            pairs: confirmed.pairs.into_iter().map(PairView::from).collect(),
            count: confirmed.count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub pairs: Vec<PairSelection>,
    #[serde(default)]
    pub scanned_range: Option<RangeMillis>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CoverageView {
    NotRequested,
    Unchanged {
        checked_range: Option<RangeMillis>,
    },
    Extended {
        checked_range: RangeMillis,
    },
    RejectedGap {
        checked_range: Option<RangeMillis>,
    },
    Failed {
        error: ErrorKind,
        message: String,
        retryable: bool,
    },
}

impl From<CoverageUpdate> for CoverageView {
    fn from(update: CoverageUpdate) -> Self {
        match update {
            CoverageUpdate::NotRequested => CoverageView::NotRequested,
            CoverageUpdate::Unchanged { checked_range } => CoverageView::Unchanged {
                checked_range: checked_range.map(Into::into),
            },
            CoverageUpdate::Extended { checked_range } => CoverageView::Extended {
                checked_range: checked_range.into(),
            },
            CoverageUpdate::RejectedGap { checked_range } => CoverageView::RejectedGap {
                checked_range: checked_range.map(Into::into),
            },
            CoverageUpdate::Failed {
                error,
                message,
                retryable,
            } => CoverageView::Failed {
                error,
                message,
                retryable,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub success_count: usize,
    pub failure_count: usize,
    pub successful: Vec<PairSelection>,
    pub failed: Vec<FailedPair>,
    pub coverage: CoverageView,
    pub next_state: ReconcileState,
}

impl From<BulkConfirmResult> for ConfirmResponse {
    fn from(result: BulkConfirmResult) -> Self {
        Self {
            success_count: result.outcome.success_count,
            failure_count: result.outcome.failure_count,
            successful: result.outcome.successful,
            failed: result.outcome.failed,
            coverage: result.coverage.into(),
            next_state: result.next_state,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub progress: Progress,
    pub recommended_range: Option<RangeMillis>,
    pub state: ReconcileState,
}

impl ProgressResponse {
    pub fn new(report: ProgressReport, state: ReconcileState) -> Self {
        Self {
            progress: report.progress,
            recommended_range: report.recommended_range.map(Into::into),
            state,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    pub retryable: bool,
}
