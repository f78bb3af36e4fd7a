pub mod account;
pub mod coverage;
pub mod error;
pub mod money;
pub mod period;
pub mod ports;
pub mod transaction;

pub use account::{AccountId, UserId};
pub use coverage::{
    extend_coverage, progress, recommend, CoverageExtension, Progress, RangePolicy, CHUNK_DAYS,
    OVERLAP_DAYS,
};
pub use error::{ErrorKind, ReconcileError};
pub use money::Money;
pub use period::DateRange;
pub use ports::{
    AccountRangeProvider, ConfirmOutcome, CoverageStore, PairLedger, ReconcileBackend, SwapOutcome,
    TransactionSource,
};
pub use transaction::{PairSelection, Transaction, TransactionId, TransferPair};
