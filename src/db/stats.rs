use sqlx::{Pool, Row, Sqlite};

use crate::models::{StatsSnapshot, StoreStats};

pub async fn get_stats(pool: &Pool<Sqlite>) -> Result<StoreStats, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT
            (SELECT COUNT(*) FROM tracked_accounts) AS total_tracked,
            (SELECT COUNT(*) FROM tracked_accounts WHERE status = 'active') AS active,
            (SELECT COUNT(*) FROM tracked_accounts WHERE status = 'inactive') AS inactive,
            (SELECT COUNT(*) FROM tracked_accounts WHERE status = 'reclaimed') AS reclaimed,
            (SELECT COUNT(*) FROM tracked_accounts WHERE status = 'error') AS errored,
            (SELECT COALESCE(SUM(amount), 0) FROM reclaim_events WHERE outcome = 'success') AS total_reclaimed,
            (SELECT COUNT(*) FROM reclaim_events WHERE outcome = 'success') AS successful_reclaims,
            (SELECT COUNT(*) FROM reclaim_events WHERE outcome = 'failed') AS failed_reclaims"#,
    )
    .fetch_one(pool)
    .await?;

    Ok(StoreStats {
        total_tracked: row.try_get("total_tracked")?,
        active: row.try_get("active")?,
        inactive: row.try_get("inactive")?,
        reclaimed: row.try_get("reclaimed")?,
        errored: row.try_get("errored")?,
        total_reclaimed_lamports: row.try_get::<i64, _>("total_reclaimed")? as u64,
        successful_reclaims: row.try_get("successful_reclaims")?,
        failed_reclaims: row.try_get("failed_reclaims")?,
    })
}

pub async fn total_error_count(pool: &Pool<Sqlite>) -> Result<i64, sqlx::Error> {
    let total = sqlx::query("SELECT COALESCE(SUM(error_count), 0) FROM tracked_accounts")
        .fetch_one(pool)
        .await?
        .get::<i64, _>(0);

    Ok(total)
}

pub async fn record_stats_snapshot(pool: &Pool<Sqlite>, snapshot: &StatsSnapshot) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO stats_snapshots
        (timestamp, accounts_monitored, accounts_reclaimed, total_reclaimed_lamports,
         rpc_calls_made, errors_encountered)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(snapshot.timestamp)
    .bind(snapshot.accounts_monitored)
    .bind(snapshot.accounts_reclaimed)
    .bind(snapshot.total_reclaimed_lamports as i64)
    .bind(snapshot.rpc_calls_made as i64)
    .bind(snapshot.errors_encountered)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_latest_stats(pool: &Pool<Sqlite>) -> Result<Option<StatsSnapshot>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT timestamp, accounts_monitored, accounts_reclaimed, total_reclaimed_lamports,
                  rpc_calls_made, errors_encountered
           FROM stats_snapshots
           ORDER BY timestamp DESC, id DESC
           LIMIT 1"#,
    )
    .fetch_optional(pool)
    .await?;

    row.map(|row| -> Result<StatsSnapshot, sqlx::Error> {
        Ok(StatsSnapshot {
            timestamp: row.try_get("timestamp")?,
            accounts_monitored: row.try_get("accounts_monitored")?,
            accounts_reclaimed: row.try_get("accounts_reclaimed")?,
            total_reclaimed_lamports: row.try_get::<i64, _>("total_reclaimed_lamports")? as u64,
            rpc_calls_made: row.try_get::<i64, _>("rpc_calls_made")? as u64,
            errors_encountered: row.try_get("errors_encountered")?,
        })
    })
    .transpose()
}
