pub mod db;
pub mod store;

pub use db::{
    account_date_range, clear_checked_range, create_db, delete_transaction, get_checked_range,
    insert_account, insert_transaction, list_transfer_pairs, query_transactions,
    swap_checked_range, DbPool,
};
pub use store::SqliteStore;
