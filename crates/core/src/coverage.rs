//! Scan coverage: how much of a user's history has been checked for
//! transfers, and which window to check next.

use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;
use crate::period::{shift_days, DateRange};

/// Days of already-checked history re-scanned at a window boundary so a
/// transfer whose legs straddle two windows is still seen whole.
pub const OVERLAP_DAYS: i64 = 3;

/// Default size of one scan window.
pub const CHUNK_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangePolicy {
    pub overlap_days: i64,
    pub chunk_days: i64,
}

impl Default for RangePolicy {
    fn default() -> Self {
        Self {
            overlap_days: OVERLAP_DAYS,
            chunk_days: CHUNK_DAYS,
        }
    }
}

impl RangePolicy {
    pub fn new(overlap_days: i64, chunk_days: i64) -> Result<Self, ReconcileError> {
        let policy = Self {
            overlap_days,
            chunk_days,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Every window must reach past the overlap, otherwise scanning stalls.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.overlap_days < 0 {
            return Err(ReconcileError::Validation(format!(
                "overlap_days must not be negative (got {})",
                self.overlap_days
            )));
        }
        if self.chunk_days <= self.overlap_days {
            return Err(ReconcileError::Validation(format!(
                "chunk_days ({}) must exceed overlap_days ({})",
                self.chunk_days, self.overlap_days
            )));
        }
        Ok(())
    }

    /// Next window to scan, or `None` when there is no history or the checked
    /// range already spans all of it. Extending toward the present is
    /// preferred over extending into the past.
    pub fn recommend(
        &self,
        checked: Option<DateRange>,
        account: Option<DateRange>,
    ) -> Option<DateRange> {
        let account = account?;

        let Some(checked) = checked else {
            let start = shift_days(account.end, -self.chunk_days).max(account.start);
            return Some(DateRange::new(start, account.end));
        };

        let checked_start = checked.start.max(account.start);
        let checked_end = checked.end.min(account.end);

        if checked_end < account.end {
            let next_start = shift_days(checked_end, -self.overlap_days).max(account.start);
            let next_end = shift_days(next_start, self.chunk_days).min(account.end);
            Some(DateRange::new(next_start, next_end))
        } else if checked_start > account.start {
            let next_end = shift_days(checked_start, self.overlap_days).min(account.end);
            let next_start = shift_days(next_end, -self.chunk_days).max(account.start);
            Some(DateRange::new(next_start, next_end))
        } else {
            None
        }
    }

    /// Upper bound on the number of recommended windows needed to cover
    /// `account` from scratch: the first chunk plus one step per
    /// `chunk - overlap` days after it.
    pub fn max_steps(&self, account: DateRange) -> i64 {
        let stride = self.chunk_days - self.overlap_days;
        1 + (account.days() + stride - 1) / stride
    }
}

/// Recommended next window under the default policy.
pub fn recommend(checked: Option<DateRange>, account: Option<DateRange>) -> Option<DateRange> {
    RangePolicy::default().recommend(checked, account)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub has_data: bool,
    pub total_days: i64,
    pub checked_days: i64,
    pub progress_percentage: u32,
    pub is_complete: bool,
}

/// Scan progress of `checked` measured against the user's full history.
/// Coverage outside the account range (stale after deletions) is ignored.
pub fn progress(checked: Option<DateRange>, account: Option<DateRange>) -> Progress {
    let Some(account) = account else {
        return Progress::default();
    };

    let total_days = account.days();
    let checked_days = checked
        .map(|c| {
            let start = c.start.max(account.start);
            let end = c.end.min(account.end);
            (end - start).num_days().max(0)
        })
        .unwrap_or(0);

    let progress_percentage = if total_days > 0 {
        // Half-up rounding of 100 * checked / total in integers.
        ((checked_days * 200 + total_days) / (total_days * 2)).clamp(0, 100) as u32
    } else {
        0
    };

    Progress {
        has_data: true,
        total_days,
        checked_days,
        progress_percentage,
        is_complete: progress_percentage >= 100,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageExtension {
    /// The window adds nothing the checked range does not already hold.
    Unchanged,
    Extended(DateRange),
    /// Merging would claim days between the two ranges that were never scanned.
    Gap,
}

/// Folds a freshly scanned `window` into the existing checked range. Coverage
/// only grows; a window separated from it by unscanned history is refused.
/// Days outside `account` hold no transactions, so a separation lying wholly
/// outside it is bridged.
pub fn extend_coverage(
    existing: Option<DateRange>,
    window: DateRange,
    account: Option<DateRange>,
) -> CoverageExtension {
    let Some(existing) = existing else {
        return CoverageExtension::Extended(window);
    };

    if existing.covers(window) {
        return CoverageExtension::Unchanged;
    }

    if existing.overlaps_or_touches(window) {
        return CoverageExtension::Extended(existing.union(window));
    }

    let (earlier, later) = if existing.end < window.start {
        (existing, window)
    } else {
        (window, existing)
    };
    let gap = DateRange::new(shift_days(earlier.end, 1), shift_days(later.start, -1));
    let gap_has_history = account.is_some_and(|a| gap.clamp_to(a).is_some());

    if gap_has_history {
        CoverageExtension::Gap
    } else {
        CoverageExtension::Extended(existing.union(window))
    }
}
