use sqlx::SqlitePool;
use tracing::info;

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS tracked_accounts (
            address TEXT PRIMARY KEY,
            last_checked_at INTEGER,
            next_check_at INTEGER,
            check_interval_ms INTEGER NOT NULL DEFAULT 30000,
            balance_lamports INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            total_reclaimed INTEGER NOT NULL DEFAULT 0,
            error_count INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )"
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS reclaim_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            address TEXT NOT NULL,
            transaction_ref TEXT NOT NULL,
            amount INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,
            outcome TEXT NOT NULL CHECK (outcome IN ('success', 'failed')),
            error_message TEXT,
            FOREIGN KEY (address) REFERENCES tracked_accounts(address)
        )"
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS stats_snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            accounts_monitored INTEGER NOT NULL,
            accounts_reclaimed INTEGER NOT NULL,
            total_reclaimed_lamports INTEGER NOT NULL,
            rpc_calls_made INTEGER NOT NULL,
            errors_encountered INTEGER NOT NULL
        )"
    )
    .execute(pool)
    .await?;

    // Add indexes for common queries
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_tracked_accounts_next_check
         ON tracked_accounts(next_check_at)"
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_tracked_accounts_status
         ON tracked_accounts(status)"
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reclaim_events_address
         ON reclaim_events(address)"
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_stats_snapshots_timestamp
         ON stats_snapshots(timestamp)"
    )
    .execute(pool)
    .await?;

    info!("Database migrations completed successfully");
    Ok(())
}
