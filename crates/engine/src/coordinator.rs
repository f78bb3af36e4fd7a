//! Drives the detect → review → confirm → re-scan loop for each user and
//! owns the only write path to the stored checked range.

use std::collections::HashSet;

use serde::Serialize;
use tandem_core::{
    extend_coverage, progress, AccountId, CoverageExtension, DateRange, ErrorKind, PairSelection,
    Progress, ReconcileBackend, ReconcileError, SwapOutcome, Transaction, TransactionId,
    TransferPair, UserId,
};
use tandem_matching::PairMatcher;
use tracing::{debug, info, warn};

use crate::bulk::{BulkConfirmer, BulkOutcome};
use crate::config::EngineConfig;
use crate::session::{ReconcileState, ReviewSession};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectResult {
    pub transfers: Vec<TransferPair>,
    pub count: usize,
    pub date_range: DateRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmedPairs {
    pub pairs: Vec<TransferPair>,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressReport {
    pub progress: Progress,
    pub recommended_range: Option<DateRange>,
}

/// What happened to the stored checked range at the end of a confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CoverageUpdate {
    /// No scanned range accompanied the batch.
    NotRequested,
    Unchanged { checked_range: Option<DateRange> },
    Extended { checked_range: DateRange },
    /// The scanned range would have left unscanned history inside the
    /// checked range.
    RejectedGap { checked_range: Option<DateRange> },
    /// The confirmations stand but coverage was not recorded.
    Failed {
        error: ErrorKind,
        message: String,
        retryable: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkConfirmResult {
    #[serde(flatten)]
    pub outcome: BulkOutcome,
    pub coverage: CoverageUpdate,
    pub next_state: ReconcileState,
}

pub struct ReconciliationCoordinator<B> {
    backend: B,
    config: EngineConfig,
}

impl<B: ReconcileBackend> ReconciliationCoordinator<B> {
    pub fn new(backend: B, config: EngineConfig) -> Result<Self, ReconcileError> {
        config.validate()?;
        Ok(Self { backend, config })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Candidate transfers inside `range`. Transactions already in a
    /// confirmed pair are left out. Never touches stored coverage.
    pub async fn detect(
        &self,
        user: UserId,
        range: DateRange,
        account_ids: Option<&[AccountId]>,
    ) -> Result<DetectResult, ReconcileError> {
        let range = DateRange::try_new(range.start, range.end)?;

        let (transactions, confirmed) = tokio::try_join!(
            self.backend.query(user, account_ids, range),
            self.backend.confirmed_pairs(user, Some(range)),
        )?;

        let paired: HashSet<TransactionId> = confirmed
            .iter()
            .flat_map(|p| [p.outgoing_transaction_id, p.incoming_transaction_id])
            .collect();
        let open: Vec<Transaction> = transactions
            .into_iter()
            .filter(|t| !paired.contains(&t.id))
            .collect();

        let transfers = PairMatcher::for_range(range).find_pairs(&open);
        info!(
            user = %user,
            range = %range,
            scanned = open.len(),
            candidates = transfers.len(),
            "transfer detection finished"
        );

        Ok(DetectResult {
            count: transfers.len(),
            transfers,
            date_range: range,
        })
    }

    pub async fn list_confirmed_pairs(
        &self,
        user: UserId,
        range: Option<DateRange>,
    ) -> Result<ConfirmedPairs, ReconcileError> {
        if let Some(r) = range {
            DateRange::try_new(r.start, r.end)?;
        }
        let pairs = self.backend.confirmed_pairs(user, range).await?;
        Ok(ConfirmedPairs {
            count: pairs.len(),
            pairs,
        })
    }

    /// Confirms `pairs` independently and, when `scanned_range` is given,
    /// records it as checked. This is the only place coverage grows.
    pub async fn bulk_confirm(
        &self,
        user: UserId,
        pairs: &[PairSelection],
        scanned_range: Option<DateRange>,
    ) -> Result<BulkConfirmResult, ReconcileError> {
        if let Some(r) = scanned_range {
            DateRange::try_new(r.start, r.end)?;
        }

        let outcome = BulkConfirmer::new(&self.backend).confirm(user, pairs).await?;

        let (coverage, next_state) = match scanned_range {
            None => {
                let state = match self.state(user).await {
                    Ok(state) => state,
                    Err(e) => {
                        warn!(user = %user, error = %e, "state not resolved after confirmation");
                        ReconcileState::Scanning
                    }
                };
                (CoverageUpdate::NotRequested, state)
            }
            Some(window) => match self.advance_coverage(user, window).await {
                Ok((update, state)) => (update, state),
                Err(e) => {
                    warn!(user = %user, window = %window, error = %e, "coverage not recorded");
                    let update = CoverageUpdate::Failed {
                        error: e.kind(),
                        message: e.to_string(),
                        retryable: e.is_retryable(),
                    };
                    (update, ReconcileState::Scanning)
                }
            },
        };

        Ok(BulkConfirmResult {
            outcome,
            coverage,
            next_state,
        })
    }

    pub async fn progress_and_recommendation(
        &self,
        user: UserId,
    ) -> Result<ProgressReport, ReconcileError> {
        let (checked, account) = tokio::try_join!(
            self.backend.get(user),
            self.backend.account_range(user),
        )?;
        Ok(ProgressReport {
            progress: progress(checked, account),
            recommended_range: self.config.policy.recommend(checked, account),
        })
    }

    /// Forgets all coverage for `user`. Confirmed pairs stay confirmed.
    pub async fn reset_coverage(&self, user: UserId) -> Result<(), ReconcileError> {
        self.backend.clear(user).await?;
        info!(user = %user, "coverage reset");
        Ok(())
    }

    /// Where the user stands between review rounds.
    pub async fn state(&self, user: UserId) -> Result<ReconcileState, ReconcileError> {
        let (checked, account) = tokio::try_join!(
            self.backend.get(user),
            self.backend.account_range(user),
        )?;
        Ok(ReconcileState::at_rest(checked, account, &self.config.policy))
    }

    /// Scans the recommended window (or `window_override`) and opens a review
    /// of its candidates. `None` means there is nothing left to scan.
    pub async fn begin_scan(
        &self,
        user: UserId,
        window_override: Option<DateRange>,
        account_ids: Option<&[AccountId]>,
    ) -> Result<Option<ReviewSession>, ReconcileError> {
        let window = match window_override {
            Some(w) => w,
            None => match self.progress_and_recommendation(user).await?.recommended_range {
                Some(w) => w,
                None => return Ok(None),
            },
        };

        let detected = self.detect(user, window, account_ids).await?;
        Ok(Some(ReviewSession::new(
            user,
            detected.date_range,
            detected.transfers,
        )))
    }

    /// Confirms the chosen subset of a session's candidates and records the
    /// session's window as checked. On error the session stays open for review.
    pub async fn commit_review(
        &self,
        session: &mut ReviewSession,
        selection: &[PairSelection],
    ) -> Result<BulkConfirmResult, ReconcileError> {
        if session.state != ReconcileState::AwaitingReview {
            return Err(ReconcileError::Validation(format!(
                "review session is {:?}, not awaiting review",
                session.state
            )));
        }
        if let Some(stray) = selection.iter().find(|s| !session.offers(s)) {
            return Err(ReconcileError::Validation(format!(
                "pair {stray} was not a candidate of this review"
            )));
        }

        session.state = ReconcileState::Confirming;
        match self
            .bulk_confirm(session.user(), selection, Some(session.window()))
            .await
        {
            Ok(result) => {
                session.state = result.next_state;
                Ok(result)
            }
            Err(e) => {
                session.state = ReconcileState::AwaitingReview;
                Err(e)
            }
        }
    }

    /// Read-merge-swap loop; a lost race re-reads and merges again so a
    /// concurrent wider update is never retracted.
    async fn advance_coverage(
        &self,
        user: UserId,
        window: DateRange,
    ) -> Result<(CoverageUpdate, ReconcileState), ReconcileError> {
        let account = self.backend.account_range(user).await?;
        let policy = &self.config.policy;

        // Days beyond the known history hold nothing yet; claiming them would
        // hide transactions imported there later.
        let Some(window) = account.and_then(|a| window.clamp_to(a)) else {
            let current = self.backend.get(user).await?;
            debug!(user = %user, "scanned range lies outside account history");
            return Ok((
                CoverageUpdate::Unchanged {
                    checked_range: current,
                },
                ReconcileState::at_rest(current, account, policy),
            ));
        };

        for attempt in 1..=self.config.coverage_retries {
            let current = self.backend.get(user).await?;
            let next = match extend_coverage(current, window, account) {
                CoverageExtension::Unchanged => {
                    return Ok((
                        CoverageUpdate::Unchanged {
                            checked_range: current,
                        },
                        ReconcileState::at_rest(current, account, policy),
                    ));
                }
                CoverageExtension::Gap => {
                    warn!(
                        user = %user,
                        window = %window,
                        "scanned range is detached from checked range, coverage left as is"
                    );
                    return Ok((
                        CoverageUpdate::RejectedGap {
                            checked_range: current,
                        },
                        ReconcileState::at_rest(current, account, policy),
                    ));
                }
                CoverageExtension::Extended(next) => next,
            };

            match self.backend.compare_and_swap(user, current, next).await? {
                SwapOutcome::Swapped => {
                    info!(user = %user, checked = %next, "coverage extended");
                    return Ok((
                        CoverageUpdate::Extended {
                            checked_range: next,
                        },
                        ReconcileState::at_rest(Some(next), account, policy),
                    ));
                }
                SwapOutcome::Conflict => {
                    debug!(user = %user, attempt, "coverage write raced, retrying");
                }
            }
        }

        Err(ReconcileError::CoverageConflict {
            attempts: self.config.coverage_retries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{date, MemoryBackend, ALICE, BOB};
    use tandem_core::RangePolicy;

    fn coordinator(backend: MemoryBackend) -> ReconciliationCoordinator<MemoryBackend> {
        ReconciliationCoordinator::new(backend, EngineConfig::default()).unwrap()
    }

    fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
        DateRange::new(date(start.0, start.1, start.2), date(end.0, end.1, end.2))
    }

    /// History from Jan 1 to Jun 30 2024 with one transfer in June.
    fn first_half_history(backend: &MemoryBackend) {
        backend.add_transfer(ALICE, date(2024, 1, 1), date(2024, 1, 1), 1);
        backend.add_transfer(ALICE, date(2024, 6, 5), date(2024, 6, 6), 10_000);
        backend.add_outgoing(ALICE, TransactionId(900), date(2024, 6, 30), -42);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = EngineConfig {
            coverage_retries: 0,
            policy: RangePolicy::default(),
        };
        assert!(ReconciliationCoordinator::new(MemoryBackend::default(), config).is_err());
    }

    #[tokio::test]
    async fn detect_finds_candidates_without_recording_coverage() {
        let backend = MemoryBackend::default();
        first_half_history(&backend);
        let engine = coordinator(backend);

        let june = range((2024, 6, 1), (2024, 6, 30));
        let result = engine.detect(ALICE, june, None).await.unwrap();
        assert_eq!(result.count, 1);
        assert_eq!(result.date_range, june);
        assert_eq!(result.transfers[0].date_difference_days, 1);
        assert_eq!(engine.backend().coverage(ALICE), None);

        // Abandoning the review and detecting again yields the same candidates.
        let again = engine.detect(ALICE, june, None).await.unwrap();
        assert_eq!(again, result);
    }

    #[tokio::test]
    async fn detect_skips_confirmed_transactions() {
        let backend = MemoryBackend::default();
        let june = range((2024, 6, 1), (2024, 6, 30));
        let first = backend.add_transfer(ALICE, date(2024, 6, 5), date(2024, 6, 6), 10_000);
        // A second incoming leg that would also match the first outgoing one.
        backend.add_incoming(ALICE, TransactionId(500), date(2024, 6, 7), 10_000);
        let engine = coordinator(backend);

        engine.bulk_confirm(ALICE, &[first], None).await.unwrap();
        let result = engine.detect(ALICE, june, None).await.unwrap();
        assert_eq!(result.count, 0);
    }

    #[tokio::test]
    async fn detect_rejects_inverted_range_before_io() {
        let backend = MemoryBackend::default();
        let engine = coordinator(backend);
        let inverted = DateRange {
            start: date(2024, 6, 30),
            end: date(2024, 6, 1),
        };
        let err = engine.detect(ALICE, inverted, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(engine.backend().query_calls(), 0);
    }

    #[tokio::test]
    async fn detect_surfaces_upstream_failure() {
        let backend = MemoryBackend::default();
        backend.set_source_down(true);
        let engine = coordinator(backend);
        let err = engine
            .detect(ALICE, range((2024, 6, 1), (2024, 6, 30)), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
    }

    #[tokio::test]
    async fn bulk_confirm_isolates_failures_and_records_coverage() {
        let backend = MemoryBackend::default();
        first_half_history(&backend);
        let a = backend.add_transfer(ALICE, date(2024, 6, 10), date(2024, 6, 10), 500);
        let b = backend.add_transfer(ALICE, date(2024, 6, 12), date(2024, 6, 13), 700);
        let c = backend.add_transfer(ALICE, date(2024, 6, 20), date(2024, 6, 21), 900);
        backend.remove_transaction(b.incoming_transaction_id);
        let engine = coordinator(backend);

        let june = range((2024, 5, 31), (2024, 6, 30));
        let result = engine.bulk_confirm(ALICE, &[a, b, c], Some(june)).await.unwrap();

        assert_eq!(result.outcome.success_count, 2);
        assert_eq!(result.outcome.failure_count, 1);
        assert_eq!(result.outcome.failed[0].pair, b);
        assert_eq!(result.outcome.failed[0].error, ErrorKind::NotFound);
        assert_eq!(result.coverage, CoverageUpdate::Extended { checked_range: june });
        assert_eq!(result.next_state, ReconcileState::Scanning);
        assert_eq!(engine.backend().coverage(ALICE), Some(june));
    }

    #[tokio::test]
    async fn confirm_without_window_reports_stored_state() {
        let backend = MemoryBackend::default();
        first_half_history(&backend);
        let pair = backend.add_transfer(ALICE, date(2024, 3, 3), date(2024, 3, 4), 800);
        let engine = coordinator(backend);

        let result = engine.bulk_confirm(ALICE, &[pair], None).await.unwrap();
        assert_eq!(result.coverage, CoverageUpdate::NotRequested);
        assert_eq!(result.next_state, ReconcileState::NotStarted);

        engine
            .backend()
            .set_coverage(ALICE, range((2024, 1, 1), (2024, 6, 30)));
        let late = backend_pair(&engine, (2024, 4, 8), (2024, 4, 9), 900);
        let result = engine.bulk_confirm(ALICE, &[late], None).await.unwrap();
        assert_eq!(result.outcome.success_count, 1);
        assert_eq!(result.next_state, ReconcileState::Complete);
        assert_eq!(result.next_state, engine.state(ALICE).await.unwrap());
    }

    fn backend_pair(
        engine: &ReconciliationCoordinator<MemoryBackend>,
        out: (i32, u32, u32),
        inc: (i32, u32, u32),
        cents: i64,
    ) -> PairSelection {
        engine
            .backend()
            .add_transfer(ALICE, date(out.0, out.1, out.2), date(inc.0, inc.1, inc.2), cents)
    }

    #[tokio::test]
    async fn bulk_confirm_rejects_inverted_scanned_range() {
        let backend = MemoryBackend::default();
        let a = backend.add_transfer(ALICE, date(2024, 6, 5), date(2024, 6, 6), 100);
        let engine = coordinator(backend);
        let inverted = DateRange {
            start: date(2024, 6, 30),
            end: date(2024, 6, 1),
        };
        let err = engine.bulk_confirm(ALICE, &[a], Some(inverted)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(engine.backend().pair_count(ALICE), 0);
    }

    #[tokio::test]
    async fn coverage_never_shrinks() {
        let backend = MemoryBackend::default();
        first_half_history(&backend);
        let engine = coordinator(backend);

        let wide = range((2024, 4, 1), (2024, 6, 30));
        engine.bulk_confirm(ALICE, &[], Some(wide)).await.unwrap();

        // A late, narrower confirm must not retract what the wide one recorded.
        let narrow = range((2024, 5, 1), (2024, 5, 31));
        let result = engine.bulk_confirm(ALICE, &[], Some(narrow)).await.unwrap();
        assert_eq!(result.coverage, CoverageUpdate::Unchanged { checked_range: Some(wide) });

        let earlier = range((2024, 3, 5), (2024, 4, 4));
        engine.bulk_confirm(ALICE, &[], Some(earlier)).await.unwrap();
        assert_eq!(engine.backend().coverage(ALICE), Some(range((2024, 3, 5), (2024, 6, 30))));
    }

    #[tokio::test]
    async fn detached_window_is_rejected() {
        let backend = MemoryBackend::default();
        first_half_history(&backend);
        let june = range((2024, 6, 1), (2024, 6, 30));
        backend.set_coverage(ALICE, june);
        let engine = coordinator(backend);

        let january = range((2024, 1, 1), (2024, 1, 31));
        let result = engine.bulk_confirm(ALICE, &[], Some(january)).await.unwrap();
        assert_eq!(result.coverage, CoverageUpdate::RejectedGap { checked_range: Some(june) });
        assert_eq!(engine.backend().coverage(ALICE), Some(june));
    }

    #[tokio::test]
    async fn scanned_range_is_clamped_to_history() {
        let backend = MemoryBackend::default();
        first_half_history(&backend);
        let engine = coordinator(backend);

        let past_the_end = range((2024, 6, 15), (2024, 8, 15));
        let result = engine.bulk_confirm(ALICE, &[], Some(past_the_end)).await.unwrap();
        assert_eq!(
            result.coverage,
            CoverageUpdate::Extended { checked_range: range((2024, 6, 15), (2024, 6, 30)) }
        );

        let future = range((2025, 1, 1), (2025, 1, 31));
        let result = engine.bulk_confirm(ALICE, &[], Some(future)).await.unwrap();
        assert!(matches!(result.coverage, CoverageUpdate::Unchanged { .. }));
    }

    #[tokio::test]
    async fn lost_race_merges_with_concurrent_write() {
        let backend = MemoryBackend::default();
        first_half_history(&backend);
        // Another tab records May just before our first swap lands.
        backend.interfere_with_swaps(vec![range((2024, 5, 1), (2024, 6, 2))]);
        let engine = coordinator(backend);

        let june = range((2024, 6, 1), (2024, 6, 30));
        let result = engine.bulk_confirm(ALICE, &[], Some(june)).await.unwrap();
        assert_eq!(
            result.coverage,
            CoverageUpdate::Extended { checked_range: range((2024, 5, 1), (2024, 6, 30)) }
        );
    }

    #[tokio::test]
    async fn exhausted_retries_keep_confirmations() {
        let backend = MemoryBackend::default();
        first_half_history(&backend);
        let pair = backend.add_transfer(ALICE, date(2024, 6, 10), date(2024, 6, 11), 300);
        backend.interfere_with_swaps(vec![
            range((2024, 6, 20), (2024, 6, 20)),
            range((2024, 6, 21), (2024, 6, 21)),
            range((2024, 6, 22), (2024, 6, 22)),
        ]);
        let engine = coordinator(backend);

        let june = range((2024, 6, 1), (2024, 6, 30));
        let result = engine.bulk_confirm(ALICE, &[pair], Some(june)).await.unwrap();
        assert_eq!(result.outcome.success_count, 1);
        match result.coverage {
            CoverageUpdate::Failed { error, retryable, .. } => {
                assert_eq!(error, ErrorKind::CoverageConflict);
                assert!(retryable);
            }
            other => panic!("expected failed coverage update, got {other:?}"),
        }
        assert_eq!(engine.backend().pair_count(ALICE), 1);
    }

    #[tokio::test]
    async fn progress_and_recommendation_follow_coverage() {
        let backend = MemoryBackend::default();
        first_half_history(&backend);
        let engine = coordinator(backend);

        let report = engine.progress_and_recommendation(ALICE).await.unwrap();
        assert!(report.progress.has_data);
        assert_eq!(report.progress.total_days, 181);
        assert_eq!(report.progress.progress_percentage, 0);
        assert_eq!(report.recommended_range, Some(range((2024, 5, 31), (2024, 6, 30))));

        engine
            .bulk_confirm(ALICE, &[], report.recommended_range)
            .await
            .unwrap();
        let report = engine.progress_and_recommendation(ALICE).await.unwrap();
        assert_eq!(report.progress.checked_days, 30);
        assert_eq!(report.recommended_range, Some(range((2024, 5, 4), (2024, 6, 3))));
    }

    #[tokio::test]
    async fn progress_without_history() {
        let engine = coordinator(MemoryBackend::default());
        let report = engine.progress_and_recommendation(BOB).await.unwrap();
        assert!(!report.progress.has_data);
        assert_eq!(report.recommended_range, None);
        assert_eq!(engine.state(BOB).await.unwrap(), ReconcileState::NotStarted);
    }

    #[tokio::test]
    async fn reset_returns_to_not_started() {
        let backend = MemoryBackend::default();
        first_half_history(&backend);
        backend.set_coverage(ALICE, range((2024, 1, 1), (2024, 6, 30)));
        let engine = coordinator(backend);

        assert_eq!(engine.state(ALICE).await.unwrap(), ReconcileState::Complete);
        engine.reset_coverage(ALICE).await.unwrap();
        assert_eq!(engine.state(ALICE).await.unwrap(), ReconcileState::NotStarted);
        assert_eq!(engine.backend().coverage(ALICE), None);
    }

    #[tokio::test]
    async fn review_loop_runs_to_completion() {
        let backend = MemoryBackend::default();
        first_half_history(&backend);
        backend.add_transfer(ALICE, date(2024, 2, 10), date(2024, 2, 12), 2_000);
        backend.add_transfer(ALICE, date(2024, 4, 29), date(2024, 5, 2), 3_000);
        let engine = coordinator(backend);

        let account = range((2024, 1, 1), (2024, 6, 30));
        let bound = engine.config().policy.max_steps(account);
        let mut rounds = 0;
        let mut confirmed = 0;

        while let Some(mut session) = engine.begin_scan(ALICE, None, None).await.unwrap() {
            rounds += 1;
            assert!(rounds <= bound, "review loop did not terminate");
            assert_eq!(session.state(), ReconcileState::AwaitingReview);

            let selection = session.select_all();
            let result = engine.commit_review(&mut session, &selection).await.unwrap();
            confirmed += result.outcome.success_count;
            assert_eq!(session.state(), result.next_state);
            assert!(matches!(result.coverage, CoverageUpdate::Extended { .. }));
        }

        assert_eq!(confirmed, 4);
        assert_eq!(engine.backend().coverage(ALICE), Some(account));
        assert_eq!(engine.state(ALICE).await.unwrap(), ReconcileState::Complete);
        assert!(engine.progress_and_recommendation(ALICE).await.unwrap().progress.is_complete);
    }

    #[tokio::test]
    async fn commit_rejects_foreign_selection_and_double_commit() {
        let backend = MemoryBackend::default();
        first_half_history(&backend);
        let engine = coordinator(backend);

        let mut session = engine.begin_scan(ALICE, None, None).await.unwrap().unwrap();
        let stray = PairSelection::new(TransactionId(1), TransactionId(2));
        let err = engine.commit_review(&mut session, &[stray]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(session.state(), ReconcileState::AwaitingReview);

        engine.commit_review(&mut session, &[]).await.unwrap();
        assert_eq!(session.state(), ReconcileState::Scanning);
        assert!(engine.commit_review(&mut session, &[]).await.is_err());
    }

    #[tokio::test]
    async fn user_override_window_is_scanned() {
        let backend = MemoryBackend::default();
        first_half_history(&backend);
        let engine = coordinator(backend);

        let early = range((2024, 1, 1), (2024, 1, 15));
        let session = engine.begin_scan(ALICE, Some(early), None).await.unwrap().unwrap();
        assert_eq!(session.window(), early);
        assert_eq!(session.candidates().len(), 1);
        assert_eq!(session.candidates()[0].outgoing_date, date(2024, 1, 1));
    }

    #[tokio::test]
    async fn systemic_ledger_failure_is_an_error() {
        let backend = MemoryBackend::default();
        let a = backend.add_transfer(ALICE, date(2024, 6, 5), date(2024, 6, 6), 100);
        backend.set_ledger_down(true);
        let engine = coordinator(backend);

        let err = engine
            .bulk_confirm(ALICE, &[a], Some(range((2024, 6, 1), (2024, 6, 30))))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
        assert_eq!(engine.backend().coverage(ALICE), None);
    }

    #[test]
    fn coverage_update_serializes_with_status_tag() {
        let update = CoverageUpdate::Failed {
            error: ErrorKind::CoverageConflict,
            message: "lost".to_string(),
            retryable: true,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "CoverageConflict");
    }
}
