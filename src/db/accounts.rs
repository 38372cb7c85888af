use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

use crate::models::{AccountStatus, TrackedAccount};

const ACCOUNT_COLUMNS: &str = "address, last_checked_at, next_check_at, check_interval_ms, \
     balance_lamports, status, total_reclaimed, error_count, last_error, created_at, updated_at";

/// Insert or fully overwrite a tracked account (last writer wins).
pub async fn upsert_account(pool: &Pool<Sqlite>, account: &TrackedAccount) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO tracked_accounts
        (address, last_checked_at, next_check_at, check_interval_ms, balance_lamports,
         status, total_reclaimed, error_count, last_error, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(address) DO UPDATE SET
            last_checked_at = excluded.last_checked_at,
            next_check_at = excluded.next_check_at,
            check_interval_ms = excluded.check_interval_ms,
            balance_lamports = excluded.balance_lamports,
            status = excluded.status,
            total_reclaimed = excluded.total_reclaimed,
            error_count = excluded.error_count,
            last_error = excluded.last_error,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&account.address)
    .bind(account.last_checked_at)
    .bind(account.next_check_at)
    .bind(account.check_interval_ms)
    .bind(account.balance as i64)
    .bind(account.status.as_str())
    .bind(account.total_reclaimed as i64)
    .bind(account.error_count)
    .bind(&account.last_error)
    .bind(account.created_at)
    .bind(account.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert a newly discovered account. Returns false if the address was already tracked.
pub async fn insert_if_absent(pool: &Pool<Sqlite>, account: &TrackedAccount) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO tracked_accounts
        (address, last_checked_at, next_check_at, check_interval_ms, balance_lamports,
         status, total_reclaimed, error_count, last_error, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(address) DO NOTHING
        "#,
    )
    .bind(&account.address)
    .bind(account.last_checked_at)
    .bind(account.next_check_at)
    .bind(account.check_interval_ms)
    .bind(account.balance as i64)
    .bind(account.status.as_str())
    .bind(account.total_reclaimed as i64)
    .bind(account.error_count)
    .bind(&account.last_error)
    .bind(account.created_at)
    .bind(account.updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_account(pool: &Pool<Sqlite>, address: &str) -> Result<Option<TrackedAccount>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM tracked_accounts WHERE address = ?",
        ACCOUNT_COLUMNS
    ))
    .bind(address)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(account_from_row).transpose()
}

pub async fn is_tracked(pool: &Pool<Sqlite>, address: &str) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT address FROM tracked_accounts WHERE address = ?")
        .bind(address)
        .fetch_optional(pool)
        .await?;

    Ok(row.is_some())
}

/// Active accounts whose next check is due (or unset), oldest deadline first.
pub async fn due_for_check(
    pool: &Pool<Sqlite>,
    limit: u32,
    now: i64,
) -> Result<Vec<TrackedAccount>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"SELECT {} FROM tracked_accounts
           WHERE status = 'active'
           AND (next_check_at IS NULL OR next_check_at <= ?)
           ORDER BY next_check_at ASC
           LIMIT ?"#,
        ACCOUNT_COLUMNS
    ))
    .bind(now)
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.iter().map(account_from_row).collect()
}

/// Every tracked account, most recently checked first.
pub async fn get_all_accounts(pool: &Pool<Sqlite>) -> Result<Vec<TrackedAccount>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tracked_accounts ORDER BY last_checked_at DESC, address ASC",
        ACCOUNT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(account_from_row).collect()
}

fn account_from_row(row: &SqliteRow) -> Result<TrackedAccount, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<AccountStatus>()
        .map_err(|e| sqlx::Error::Decode(e.into()))?;

    Ok(TrackedAccount {
        address: row.try_get("address")?,
        last_checked_at: row.try_get("last_checked_at")?,
        next_check_at: row.try_get("next_check_at")?,
        check_interval_ms: row.try_get("check_interval_ms")?,
        balance: row.try_get::<i64, _>("balance_lamports")? as u64,
        status,
        total_reclaimed: row.try_get::<i64, _>("total_reclaimed")? as u64,
        error_count: row.try_get("error_count")?,
        last_error: row.try_get("last_error")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
