use solana_sdk::pubkey::Pubkey;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::blockchain::client::RateLimitedClient;
use crate::blockchain::models::RemoteAccount;
use crate::config::Config;
use crate::db::{accounts, stats};
use crate::models::{
    now_millis, AccountStatus, StatsSnapshot, TrackedAccount, INTERVAL_ACTIVE_MS, INTERVAL_INACTIVE_MS,
    INTERVAL_NEW_MS, NEW_ACCOUNT_AGE_MS,
};
use crate::reclaim::{Eligibility, EligibilityEvaluator, ReclaimExecutor, TransactionBuilder};
use crate::validation::parse_pubkey;

/// Re-check cadence after a check. Absent accounts always get the long
/// interval; otherwise young accounts get the short one, closed accounts the
/// long one and live accounts the medium one.
pub fn next_check_interval(record: &TrackedAccount, remote: Option<&RemoteAccount>, now: i64) -> i64 {
    let Some(account) = remote else {
        return INTERVAL_INACTIVE_MS;
    };

    if now - record.created_at < NEW_ACCOUNT_AGE_MS {
        return INTERVAL_NEW_MS;
    }

    if account.is_closed() {
        return INTERVAL_INACTIVE_MS;
    }

    INTERVAL_ACTIVE_MS
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub checked: usize,
    pub eligible: usize,
    pub reclaimed: usize,
    pub failed: usize,
    pub discovered: usize,
}

/// Where reclaimed lamports go and who signs for the close.
#[derive(Debug, Clone, Copy)]
pub struct ReclaimTarget {
    pub program_id: Pubkey,
    pub destination: Pubkey,
    pub authority: Pubkey,
}

/// The scheduling loop: due-check pass, discovery pass, sleep, repeat.
/// Cycles never overlap; everything inside a cycle runs sequentially.
pub struct ReclaimMonitor {
    client: Arc<RateLimitedClient>,
    db_pool: SqlitePool,
    evaluator: EligibilityEvaluator,
    builder: TransactionBuilder,
    executor: ReclaimExecutor,
    target: ReclaimTarget,
    batch_size: u32,
    scan_interval: Duration,
}

impl ReclaimMonitor {
    pub fn new(
        client: Arc<RateLimitedClient>,
        db_pool: SqlitePool,
        executor: ReclaimExecutor,
        target: ReclaimTarget,
        config: &Config,
    ) -> Self {
        Self {
            client,
            db_pool,
            evaluator: EligibilityEvaluator::new(config.min_reclaim_lamports),
            builder: TransactionBuilder::new(config.priority_fee_micro_lamports),
            executor,
            target,
            batch_size: config.batch_size,
            scan_interval: config.scan_interval,
        }
    }

    /// Run cycles until `shutdown` fires. The next cycle starts `scan_interval`
    /// after the previous one finished. A cycle in flight is never interrupted.
    ///
    /// Returns `Err` only when the store fails, which the caller treats as fatal.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), sqlx::Error> {
        info!(
            "Starting reclaim monitor for program {} (scan interval {:?}, batch size {})",
            self.target.program_id, self.scan_interval, self.batch_size
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match self.run_cycle().await {
                Ok(summary) => debug!("Cycle complete: {:?}", summary),
                Err(e) => {
                    error!("Store failure, stopping monitor: {}", e);
                    return Err(e);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.scan_interval) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        info!("Reclaim monitor stopped");
        Ok(())
    }

    pub async fn run_cycle(&self) -> Result<CycleSummary, sqlx::Error> {
        let mut summary = self.check_due_accounts().await?;
        summary.discovered = self.discover_accounts().await?;
        self.record_snapshot().await?;

        if summary.checked > 0 || summary.discovered > 0 {
            info!(
                "Cycle: checked {}, eligible {}, reclaimed {}, failed {}, discovered {}",
                summary.checked, summary.eligible, summary.reclaimed, summary.failed, summary.discovered
            );
        }

        Ok(summary)
    }

    async fn check_due_accounts(&self) -> Result<CycleSummary, sqlx::Error> {
        let mut summary = CycleSummary::default();

        let due = accounts::due_for_check(&self.db_pool, self.batch_size, now_millis()).await?;
        if due.is_empty() {
            return Ok(summary);
        }

        debug!("Processing {} due accounts", due.len());

        let addresses: Vec<String> = due.iter().map(|account| account.address.clone()).collect();
        let remote_states = match self.client.get_multiple_accounts(&addresses).await {
            Ok(states) => states,
            Err(e) => {
                // Records keep their deadline and are picked up next cycle
                warn!("Skipping due-check pass, batch read failed: {}", e);
                return Ok(summary);
            }
        };

        for (mut record, remote) in due.into_iter().zip(remote_states) {
            let now = now_millis();

            record.last_checked_at = Some(now);
            match &remote {
                Some(account) => record.balance = account.lamports,
                None => record.status = AccountStatus::Inactive,
            }
            record.check_interval_ms = next_check_interval(&record, remote.as_ref(), now);
            record.next_check_at = Some(now + record.check_interval_ms);
            record.updated_at = now;
            accounts::upsert_account(&self.db_pool, &record).await?;
            summary.checked += 1;

            match self.evaluator.evaluate(remote.as_ref(), &record) {
                Eligibility::Eligible { amount } => {
                    if !self.evaluator.meets_threshold(remote.as_ref()) {
                        debug!(
                            "{} holds {} lamports, below reclaim threshold of {}",
                            record.address,
                            amount,
                            self.evaluator.min_reclaim_lamports()
                        );
                        continue;
                    }

                    info!("Found eligible account {} ({} lamports)", record.address, amount);
                    summary.eligible += 1;

                    if self.reclaim(&mut record).await? {
                        summary.reclaimed += 1;
                    } else {
                        summary.failed += 1;
                    }
                }
                Eligibility::Ineligible(reason) => {
                    debug!("{} not eligible: {}", record.address, reason);
                }
            }
        }

        Ok(summary)
    }

    /// Build and execute the close for one record, sequentially.
    async fn reclaim(&self, record: &mut TrackedAccount) -> Result<bool, sqlx::Error> {
        let transaction = parse_pubkey(&record.address)
            .map_err(|e| e.to_string())
            .and_then(|account| {
                self.builder
                    .build(&account, &self.target.destination, &self.target.authority)
                    .map_err(|e| e.to_string())
            });

        let transaction = match transaction {
            Ok(transaction) => transaction,
            Err(message) => {
                error!("Could not build reclaim for {}: {}", record.address, message);
                self.executor.record_failure(record, &message).await?;
                return Ok(false);
            }
        };

        let result = self.executor.execute_reclaim(record, transaction).await?;
        Ok(result.success)
    }

    /// Track every program-owned address not seen before. Failures are logged
    /// and the cycle carries on.
    async fn discover_accounts(&self) -> Result<usize, sqlx::Error> {
        let addresses = match self.client.get_program_accounts(&self.target.program_id).await {
            Ok(addresses) => addresses,
            Err(e) => {
                error!("Discovery failed: {}", e);
                return Ok(0);
            }
        };

        debug!("Discovered {} program accounts", addresses.len());

        let mut inserted = 0;
        for address in addresses {
            let record = TrackedAccount::new(address, now_millis());
            if accounts::insert_if_absent(&self.db_pool, &record).await? {
                info!("Tracking new account: {}", record.address);
                inserted += 1;
            }
        }

        Ok(inserted)
    }

    async fn record_snapshot(&self) -> Result<(), sqlx::Error> {
        let store_stats = stats::get_stats(&self.db_pool).await?;
        let rpc_stats = self.client.stats().await;

        let snapshot = StatsSnapshot {
            timestamp: now_millis(),
            accounts_monitored: store_stats.total_tracked,
            accounts_reclaimed: store_stats.reclaimed,
            total_reclaimed_lamports: store_stats.total_reclaimed_lamports,
            rpc_calls_made: rpc_stats.requests_total,
            errors_encountered: stats::total_error_count(&self.db_pool).await?,
        };

        stats::record_stats_snapshot(&self.db_pool, &snapshot).await
    }
}
