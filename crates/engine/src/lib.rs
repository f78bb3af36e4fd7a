pub mod bulk;
pub mod config;
pub mod coordinator;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use bulk::{BulkConfirmer, BulkOutcome, FailedPair};
pub use config::EngineConfig;
pub use coordinator::{
    BulkConfirmResult, ConfirmedPairs, CoverageUpdate, DetectResult, ProgressReport,
    ReconciliationCoordinator,
};
pub use session::{ReconcileState, ReviewSession};
