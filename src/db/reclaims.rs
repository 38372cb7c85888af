use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

use crate::models::{ReclaimEvent, ReclaimOutcome};

/// Append a reclaim event and, for successful ones, credit the owning account.
/// Both writes commit or roll back together.
pub async fn record_reclaim(pool: &Pool<Sqlite>, event: &ReclaimEvent) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO reclaim_events
        (address, transaction_ref, amount, timestamp, outcome, error_message)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&event.address)
    .bind(&event.transaction_ref)
    .bind(event.amount as i64)
    .bind(event.timestamp)
    .bind(event.outcome.as_str())
    .bind(&event.error_message)
    .execute(&mut *tx)
    .await?;

    if event.outcome == ReclaimOutcome::Success {
        let updated = sqlx::query(
            "UPDATE tracked_accounts
             SET total_reclaimed = total_reclaimed + ?, updated_at = ?
             WHERE address = ?",
        )
        .bind(event.amount as i64)
        .bind(event.timestamp)
        .bind(&event.address)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Dropping the transaction rolls back the event insert
            return Err(sqlx::Error::RowNotFound);
        }
    }

    tx.commit().await?;

    Ok(result.last_insert_rowid())
}

/// Reclaim events for an address, newest first.
pub async fn reclaim_history(
    pool: &Pool<Sqlite>,
    address: &str,
    limit: u32,
) -> Result<Vec<ReclaimEvent>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, address, transaction_ref, amount, timestamp, outcome, error_message
           FROM reclaim_events
           WHERE address = ?
           ORDER BY timestamp DESC, id DESC
           LIMIT ?"#,
    )
    .bind(address)
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.iter().map(event_from_row).collect()
}

pub async fn count_events(pool: &Pool<Sqlite>, address: &str) -> Result<i64, sqlx::Error> {
    let count = sqlx::query("SELECT COUNT(*) FROM reclaim_events WHERE address = ?")
        .bind(address)
        .fetch_one(pool)
        .await?
        .get::<i64, _>(0);

    Ok(count)
}

fn event_from_row(row: &SqliteRow) -> Result<ReclaimEvent, sqlx::Error> {
    let outcome: String = row.try_get("outcome")?;
    let outcome = outcome
        .parse::<ReclaimOutcome>()
        .map_err(|e| sqlx::Error::Decode(e.into()))?;

    Ok(ReclaimEvent {
        id: row.try_get("id")?,
        address: row.try_get("address")?,
        transaction_ref: row.try_get("transaction_ref")?,
        amount: row.try_get::<i64, _>("amount")? as u64,
        timestamp: row.try_get("timestamp")?,
        outcome,
        error_message: row.try_get("error_message")?,
    })
}
