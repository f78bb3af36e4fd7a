use serde::Serialize;
use tandem_core::{ErrorKind, PairLedger, PairSelection, ReconcileError, UserId};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedPair {
    pub pair: PairSelection,
    pub error: ErrorKind,
    pub message: String,
}

/// Per-item results of one confirmation batch.
/// `success_count + failure_count` always equals the batch size.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkOutcome {
    pub success_count: usize,
    pub failure_count: usize,
    pub successful: Vec<PairSelection>,
    pub failed: Vec<FailedPair>,
}

impl BulkOutcome {
    fn record_success(&mut self, pair: PairSelection) {
        self.success_count += 1;
        self.successful.push(pair);
    }

    fn record_failure(&mut self, pair: PairSelection, err: &ReconcileError) {
        self.failure_count += 1;
        self.failed.push(FailedPair {
            pair,
            error: err.kind(),
            message: err.to_string(),
        });
    }
}

/// Commits user-approved pairs one at a time. A failing pair never stops the
/// rest of the batch.
pub struct BulkConfirmer<'a, L: PairLedger + ?Sized> {
    ledger: &'a L,
}

impl<'a, L: PairLedger + ?Sized> BulkConfirmer<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self { ledger }
    }

    /// Errors only when the ledger could not be reached for any pair of a
    /// non-empty batch; every other failure is reported per item.
    pub async fn confirm(
        &self,
        user: UserId,
        pairs: &[PairSelection],
    ) -> Result<BulkOutcome, ReconcileError> {
        let mut outcome = BulkOutcome::default();
        let mut last_upstream = None;

        for &pair in pairs {
            match self.ledger.confirm_pair(user, pair).await {
                Ok(_) => outcome.record_success(pair),
                Err(e) => {
                    debug!(user = %user, pair = %pair, error = %e, "pair confirmation failed");
                    outcome.record_failure(pair, &e);
                    if matches!(e, ReconcileError::Upstream(_)) {
                        last_upstream = Some(e);
                    }
                }
            }
        }

        let all_unreachable = !pairs.is_empty()
            && outcome
                .failed
                .iter()
                .filter(|f| f.error == ErrorKind::UpstreamUnavailable)
                .count()
                == pairs.len();
        if all_unreachable {
            if let Some(e) = last_upstream {
                return Err(e);
            }
        }

        info!(
            user = %user,
            confirmed = outcome.success_count,
            failed = outcome.failure_count,
            "bulk confirmation finished"
        );
        Ok(outcome)
    }
}
