use serde::Serialize;
use tandem_core::{
    progress, DateRange, PairSelection, RangePolicy, TransferPair, UserId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileState {
    NotStarted,
    Scanning,
    AwaitingReview,
    Confirming,
    Complete,
}

impl ReconcileState {
    /// Persisted state of a user between review rounds. The two in-flight
    /// states only exist on a [`ReviewSession`].
    pub fn at_rest(
        checked: Option<DateRange>,
        account: Option<DateRange>,
        policy: &RangePolicy,
    ) -> Self {
        if checked.is_none() {
            return ReconcileState::NotStarted;
        }
        let done = progress(checked, account).is_complete
            || policy.recommend(checked, account).is_none();
        if done {
            ReconcileState::Complete
        } else {
            ReconcileState::Scanning
        }
    }
}

/// One scan's candidates awaiting the user's decision. The caller owns the
/// session and hands it back to commit; dropping it abandons the review
/// without touching stored coverage.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewSession {
    user: UserId,
    window: DateRange,
    candidates: Vec<TransferPair>,
    pub(crate) state: ReconcileState,
}

impl ReviewSession {
    pub(crate) fn new(user: UserId, window: DateRange, candidates: Vec<TransferPair>) -> Self {
        Self {
            user,
            window,
            candidates,
            state: ReconcileState::AwaitingReview,
        }
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn window(&self) -> DateRange {
        self.window
    }

    pub fn candidates(&self) -> &[TransferPair] {
        &self.candidates
    }

    pub fn state(&self) -> ReconcileState {
        self.state
    }

    pub fn select_all(&self) -> Vec<PairSelection> {
        self.candidates.iter().map(TransferPair::selection).collect()
    }

    pub(crate) fn offers(&self, selection: &PairSelection) -> bool {
        self.candidates.iter().any(|c| c.selection() == *selection)
    }
}
