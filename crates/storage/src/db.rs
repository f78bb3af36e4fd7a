use chrono::NaiveDate;
use sqlx::{sqlite::SqlitePoolOptions, Pool, QueryBuilder, Sqlite, SqliteConnection};
use std::path::Path;
use tandem_core::{
    AccountId, DateRange, Money, Transaction, TransactionId, TransferPair, UserId,
};

pub type DbPool = Pool<Sqlite>;

type TransactionRow = (i64, i64, String, i64, String);
type PairRow = (i64, i64, i64, String, String, String, i64);

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA cache_size = -32000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts(user_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            currency TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transactions_account_date ON transactions(account_id, date)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transfer_pairs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            outgoing_transaction_id INTEGER NOT NULL UNIQUE,
            incoming_transaction_id INTEGER NOT NULL UNIQUE,
            amount_cents INTEGER NOT NULL,
            currency TEXT NOT NULL,
            outgoing_date TEXT NOT NULL,
            incoming_date TEXT NOT NULL,
            date_difference_days INTEGER NOT NULL,
            confirmed_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (outgoing_transaction_id) REFERENCES transactions(id) ON DELETE CASCADE,
            FOREIGN KEY (incoming_transaction_id) REFERENCES transactions(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS checked_ranges (
            user_id INTEGER PRIMARY KEY,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate, sqlx::Error> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn transaction_from_row(r: TransactionRow) -> Result<Transaction, sqlx::Error> {
    Ok(Transaction {
        id: TransactionId(r.0),
        account_id: AccountId(r.1),
        date: parse_date(&r.2)?,
        amount: Money::from_cents(r.3),
        currency: r.4,
    })
}

fn pair_from_row(r: PairRow) -> Result<TransferPair, sqlx::Error> {
    Ok(TransferPair {
        outgoing_transaction_id: TransactionId(r.0),
        incoming_transaction_id: TransactionId(r.1),
        amount: Money::from_cents(r.2),
        currency: r.3,
        outgoing_date: parse_date(&r.4)?,
        incoming_date: parse_date(&r.5)?,
        date_difference_days: r.6,
    })
}

// ── Accounts & transactions ──────────────────────────────────────────────────

pub async fn insert_account(pool: &DbPool, user: UserId, name: &str) -> Result<AccountId, sqlx::Error> {
    let (id,) = sqlx::query_as::<_, (i64,)>(
        "INSERT INTO accounts (user_id, name) VALUES (?, ?) RETURNING id",
    )
    .bind(user.0)
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(AccountId(id))
}

pub async fn insert_transaction(
    pool: &DbPool,
    account_id: AccountId,
    date: NaiveDate,
    amount: Money,
    currency: &str,
) -> Result<TransactionId, sqlx::Error> {
    let (id,) = sqlx::query_as::<_, (i64,)>(
        "INSERT INTO transactions (account_id, date, amount_cents, currency) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(account_id.0)
    .bind(date.to_string())
    .bind(amount.to_cents())
    .bind(currency)
    .fetch_one(pool)
    .await?;
    Ok(TransactionId(id))
}

/// Returns whether a row was removed. Any confirmed pair using the
/// transaction goes with it.
pub async fn delete_transaction(pool: &DbPool, id: TransactionId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM transactions WHERE id = ?")
        .bind(id.0)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn query_transactions(
    pool: &DbPool,
    user: UserId,
    account_ids: Option<&[AccountId]>,
    range: DateRange,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT t.id, t.account_id, t.date, t.amount_cents, t.currency \
         FROM transactions t JOIN accounts a ON a.id = t.account_id WHERE a.user_id = ",
    );
    qb.push_bind(user.0)
        .push(" AND t.date >= ")
        .push_bind(range.start.to_string())
        .push(" AND t.date <= ")
        .push_bind(range.end.to_string());

    if let Some(ids) = account_ids {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        qb.push(" AND t.account_id IN (");
        let mut list = qb.separated(", ");
        for id in ids {
            list.push_bind(id.0);
        }
        list.push_unseparated(")");
    }
    qb.push(" ORDER BY t.date, t.id");

    let rows = qb
        .build_query_as::<TransactionRow>()
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(transaction_from_row).collect()
}

pub async fn fetch_transaction(
    conn: &mut SqliteConnection,
    user: UserId,
    id: TransactionId,
) -> Result<Option<Transaction>, sqlx::Error> {
    let row = sqlx::query_as::<_, TransactionRow>(
        "SELECT t.id, t.account_id, t.date, t.amount_cents, t.currency \
         FROM transactions t JOIN accounts a ON a.id = t.account_id \
         WHERE t.id = ? AND a.user_id = ?",
    )
    .bind(id.0)
    .bind(user.0)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(transaction_from_row).transpose()
}

pub async fn account_date_range(pool: &DbPool, user: UserId) -> Result<Option<DateRange>, sqlx::Error> {
    let (min, max) = sqlx::query_as::<_, (Option<String>, Option<String>)>(
        "SELECT MIN(t.date), MAX(t.date) FROM transactions t \
         JOIN accounts a ON a.id = t.account_id WHERE a.user_id = ?",
    )
    .bind(user.0)
    .fetch_one(pool)
    .await?;

    match (min, max) {
        (Some(start), Some(end)) => Ok(Some(DateRange::new(parse_date(&start)?, parse_date(&end)?))),
        _ => Ok(None),
    }
}

// ── Transfer pairs ───────────────────────────────────────────────────────────

/// The confirmed pair that uses `id` on either side, if any.
pub async fn fetch_pair_involving(
    conn: &mut SqliteConnection,
    id: TransactionId,
) -> Result<Option<TransferPair>, sqlx::Error> {
    let row = sqlx::query_as::<_, PairRow>(
        "SELECT outgoing_transaction_id, incoming_transaction_id, amount_cents, currency, \
         outgoing_date, incoming_date, date_difference_days FROM transfer_pairs \
         WHERE outgoing_transaction_id = ? OR incoming_transaction_id = ?",
    )
    .bind(id.0)
    .bind(id.0)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(pair_from_row).transpose()
}

pub async fn insert_pair(
    conn: &mut SqliteConnection,
    user: UserId,
    pair: &TransferPair,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO transfer_pairs (user_id, outgoing_transaction_id, incoming_transaction_id, \
         amount_cents, currency, outgoing_date, incoming_date, date_difference_days) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user.0)
    .bind(pair.outgoing_transaction_id.0)
    .bind(pair.incoming_transaction_id.0)
    .bind(pair.amount.to_cents())
    .bind(&pair.currency)
    .bind(pair.outgoing_date.to_string())
    .bind(pair.incoming_date.to_string())
    .bind(pair.date_difference_days)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn list_transfer_pairs(
    pool: &DbPool,
    user: UserId,
    range: Option<DateRange>,
) -> Result<Vec<TransferPair>, sqlx::Error> {
    let rows = match range {
        Some(r) => {
            let (start, end) = (r.start.to_string(), r.end.to_string());
            sqlx::query_as::<_, PairRow>(
                "SELECT outgoing_transaction_id, incoming_transaction_id, amount_cents, currency, \
                 outgoing_date, incoming_date, date_difference_days FROM transfer_pairs \
                 WHERE user_id = ? AND ((outgoing_date >= ? AND outgoing_date <= ?) \
                 OR (incoming_date >= ? AND incoming_date <= ?)) \
                 ORDER BY outgoing_date, outgoing_transaction_id",
            )
            .bind(user.0)
            .bind(&start)
            .bind(&end)
            .bind(&start)
            .bind(&end)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, PairRow>(
                "SELECT outgoing_transaction_id, incoming_transaction_id, amount_cents, currency, \
                 outgoing_date, incoming_date, date_difference_days FROM transfer_pairs \
                 WHERE user_id = ? ORDER BY outgoing_date, outgoing_transaction_id",
            )
            .bind(user.0)
            .fetch_all(pool)
            .await?
        }
    };
    rows.into_iter().map(pair_from_row).collect()
}

// ── Checked ranges ───────────────────────────────────────────────────────────

pub async fn get_checked_range(pool: &DbPool, user: UserId) -> Result<Option<DateRange>, sqlx::Error> {
    let row = sqlx::query_as::<_, (String, String)>(
        "SELECT start_date, end_date FROM checked_ranges WHERE user_id = ?",
    )
    .bind(user.0)
    .fetch_optional(pool)
    .await?;

    match row {
        Some((start, end)) => Ok(Some(DateRange::new(parse_date(&start)?, parse_date(&end)?))),
        None => Ok(None),
    }
}

/// Conditional write of the user's checked range. Returns `false` when the
/// stored value no longer equals `expected`.
pub async fn swap_checked_range(
    pool: &DbPool,
    user: UserId,
    expected: Option<DateRange>,
    new: DateRange,
) -> Result<bool, sqlx::Error> {
    let result = match expected {
        None => {
            sqlx::query(
                "INSERT INTO checked_ranges (user_id, start_date, end_date) VALUES (?, ?, ?) \
                 ON CONFLICT(user_id) DO NOTHING",
            )
            .bind(user.0)
            .bind(new.start.to_string())
            .bind(new.end.to_string())
            .execute(pool)
            .await?
        }
        Some(prior) => {
            sqlx::query(
                "UPDATE checked_ranges SET start_date = ?, end_date = ?, updated_at = datetime('now') \
                 WHERE user_id = ? AND start_date = ? AND end_date = ?",
            )
            .bind(new.start.to_string())
            .bind(new.end.to_string())
            .bind(user.0)
            .bind(prior.start.to_string())
            .bind(prior.end.to_string())
            .execute(pool)
            .await?
        }
    };
    Ok(result.rows_affected() == 1)
}

pub async fn clear_checked_range(pool: &DbPool, user: UserId) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM checked_ranges WHERE user_id = ?")
        .bind(user.0)
        .execute(pool)
        .await?;
    Ok(())
}
