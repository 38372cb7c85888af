//! tests/monitor_tests.rs - Adaptive intervals, discovery and full scheduling cycles

#[cfg(test)]
mod tests {
    use crate::blockchain::polling::{next_check_interval, ReclaimMonitor, ReclaimTarget};
    use crate::db::{accounts, reclaims, stats};
    use crate::models::{
        now_millis, AccountStatus, TrackedAccount, INTERVAL_ACTIVE_MS, INTERVAL_INACTIVE_MS, INTERVAL_NEW_MS,
        NEW_ACCOUNT_AGE_MS,
    };
    use crate::tests::support::{
        closed_account, live_account, store, test_config, tracked, Harness, MockBackend, HOUR_MS,
        TOKEN_ACCOUNT_RENT,
    };
    use solana_sdk::pubkey::Pubkey;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn monitor(harness: &Harness) -> ReclaimMonitor {
        let target = ReclaimTarget {
            program_id: harness.config.program_id.parse().unwrap(),
            destination: harness.authority(),
            authority: harness.authority(),
        };
        ReclaimMonitor::new(
            harness.client.clone(),
            harness.pool.clone(),
            harness.executor(),
            target,
            &harness.config,
        )
    }

    async fn load(harness: &Harness, address: &Pubkey) -> TrackedAccount {
        accounts::get_account(&harness.pool, &address.to_string())
            .await
            .unwrap()
            .expect("record should exist")
    }

    #[test]
    fn test_adaptive_interval() {
        let now = now_millis();
        let young = TrackedAccount::new("young", now - 10_000);
        let old = TrackedAccount::new("old", now - 2 * HOUR_MS);

        assert_eq!(next_check_interval(&young, None, now), INTERVAL_INACTIVE_MS, "Absent wins over age");
        assert_eq!(next_check_interval(&old, None, now), INTERVAL_INACTIVE_MS);

        assert_eq!(next_check_interval(&young, Some(&live_account(1)), now), INTERVAL_NEW_MS);
        assert_eq!(next_check_interval(&young, Some(&closed_account(1)), now), INTERVAL_NEW_MS);

        assert_eq!(next_check_interval(&old, Some(&closed_account(1)), now), INTERVAL_INACTIVE_MS);
        assert_eq!(next_check_interval(&old, Some(&live_account(1)), now), INTERVAL_ACTIVE_MS);

        let at_boundary = TrackedAccount::new("edge", now - NEW_ACCOUNT_AGE_MS);
        assert_eq!(next_check_interval(&at_boundary, Some(&live_account(1)), now), INTERVAL_ACTIVE_MS);
    }

    #[tokio::test]
    async fn test_full_cycle() {
        let harness = Harness::new(test_config()).await;
        let monitor = monitor(&harness);

        let closed = Pubkey::new_unique();
        let live = Pubkey::new_unique();
        let absent = Pubkey::new_unique();
        let dust = Pubkey::new_unique();

        harness.backend.set_account(closed, closed_account(TOKEN_ACCOUNT_RENT));
        harness.backend.set_account(live, live_account(TOKEN_ACCOUNT_RENT));
        harness.backend.set_account(dust, closed_account(5_000));

        for address in [&closed, &live, &absent, &dust] {
            store(&harness.pool, &tracked(address, 2 * HOUR_MS)).await;
        }

        let before = now_millis();
        let summary = monitor.run_cycle().await.unwrap();

        assert_eq!(summary.checked, 4);
        assert_eq!(summary.eligible, 1, "Dust below the threshold is skipped");
        assert_eq!(summary.reclaimed, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.discovered, 0);
        assert_eq!(MockBackend::count(&harness.backend.batch_calls), 1);

        let reclaimed = load(&harness, &closed).await;
        assert_eq!(reclaimed.status, AccountStatus::Reclaimed);
        assert_eq!(reclaimed.total_reclaimed, TOKEN_ACCOUNT_RENT);
        assert_eq!(reclaimed.balance, 0);

        let live_record = load(&harness, &live).await;
        assert_eq!(live_record.status, AccountStatus::Active);
        assert_eq!(live_record.balance, TOKEN_ACCOUNT_RENT);
        assert_eq!(live_record.check_interval_ms, INTERVAL_ACTIVE_MS);
        assert!(live_record.last_checked_at.unwrap() >= before);
        assert!(live_record.next_check_at.unwrap() >= before + INTERVAL_ACTIVE_MS);

        let absent_record = load(&harness, &absent).await;
        assert_eq!(absent_record.status, AccountStatus::Inactive);
        assert_eq!(absent_record.check_interval_ms, INTERVAL_INACTIVE_MS);

        let dust_record = load(&harness, &dust).await;
        assert_eq!(dust_record.status, AccountStatus::Active);
        assert_eq!(dust_record.balance, 5_000);
        assert_eq!(dust_record.check_interval_ms, INTERVAL_INACTIVE_MS);
        assert_eq!(reclaims::count_events(&harness.pool, &dust.to_string()).await.unwrap(), 0);

        let snapshot = stats::get_latest_stats(&harness.pool).await.unwrap().unwrap();
        assert_eq!(snapshot.accounts_monitored, 4);
        assert_eq!(snapshot.accounts_reclaimed, 1);
        assert_eq!(snapshot.total_reclaimed_lamports, TOKEN_ACCOUNT_RENT);
        assert!(snapshot.rpc_calls_made >= 4);

        // Nothing is due on the next pass
        let second = monitor.run_cycle().await.unwrap();
        assert_eq!(second.checked, 0);
        assert_eq!(MockBackend::count(&harness.backend.batch_calls), 1);
    }

    #[tokio::test]
    async fn test_discovery_tracks_only_new_addresses() {
        let harness = Harness::new(test_config()).await;
        let monitor = monitor(&harness);

        let known = Pubkey::new_unique();
        let fresh = Pubkey::new_unique();
        let mut known_record = tracked(&known, 2 * HOUR_MS);
        known_record.status = AccountStatus::Reclaimed;
        store(&harness.pool, &known_record).await;

        harness.backend.set_program_accounts(vec![known, fresh]);

        let before = now_millis();
        let summary = monitor.run_cycle().await.unwrap();
        assert_eq!(summary.discovered, 1);

        assert_eq!(load(&harness, &known).await.status, AccountStatus::Reclaimed);

        let discovered = load(&harness, &fresh).await;
        assert_eq!(discovered.status, AccountStatus::Active);
        assert_eq!(discovered.check_interval_ms, INTERVAL_NEW_MS);
        assert!(discovered.last_checked_at.is_none());
        assert!(discovered.next_check_at.unwrap() >= before);

        // The new record is checked on the following cycle
        harness.backend.set_account(fresh, live_account(TOKEN_ACCOUNT_RENT));
        let next = monitor.run_cycle().await.unwrap();
        assert_eq!(next.checked, 1);
        assert_eq!(next.discovered, 0);
        assert_eq!(load(&harness, &fresh).await.check_interval_ms, INTERVAL_NEW_MS);
    }

    #[tokio::test]
    async fn test_discovery_failure_does_not_abort_cycle() {
        let harness = Harness::new(test_config()).await;
        let monitor = monitor(&harness);
        harness.backend.fail_discovery();

        let address = Pubkey::new_unique();
        harness.backend.set_account(address, live_account(TOKEN_ACCOUNT_RENT));
        store(&harness.pool, &tracked(&address, 2 * HOUR_MS)).await;

        let summary = monitor.run_cycle().await.unwrap();
        assert_eq!(summary.checked, 1);
        assert_eq!(summary.discovered, 0);
        assert!(stats::get_latest_stats(&harness.pool).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_batch_read_failure_skips_due_pass() {
        let harness = Harness::new(test_config()).await;
        let monitor = monitor(&harness);
        harness.backend.fail_batch_reads();

        let address = Pubkey::new_unique();
        let record = tracked(&address, 2 * HOUR_MS);
        store(&harness.pool, &record).await;

        let summary = monitor.run_cycle().await.unwrap();
        assert_eq!(summary.checked, 0);

        let unchanged = load(&harness, &address).await;
        assert_eq!(unchanged.next_check_at, record.next_check_at, "Deadline kept for the next cycle");
        assert!(unchanged.last_checked_at.is_none());
    }

    #[tokio::test]
    async fn test_failed_reclaim_counts_in_summary() {
        let mut config = test_config();
        config.max_retries = 1;
        let harness = Harness::new(config).await;
        harness.backend.script_sends(&[crate::tests::support::SendBehaviour::Permanent]);
        let monitor = monitor(&harness);

        let address = Pubkey::new_unique();
        harness.backend.set_account(address, closed_account(TOKEN_ACCOUNT_RENT));
        store(&harness.pool, &tracked(&address, 2 * HOUR_MS)).await;

        let summary = monitor.run_cycle().await.unwrap();
        assert_eq!(summary.eligible, 1);
        assert_eq!(summary.failed, 1);

        let record = load(&harness, &address).await;
        assert_eq!(record.status, AccountStatus::Active);
        assert_eq!(record.error_count, 1);
        assert_eq!(record.check_interval_ms, INTERVAL_INACTIVE_MS);

        let snapshot = stats::get_latest_stats(&harness.pool).await.unwrap().unwrap();
        assert_eq!(snapshot.errors_encountered, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancellation() {
        let mut config = test_config();
        config.scan_interval = Duration::from_secs(3600);
        let harness = Harness::new(config).await;
        let monitor = Arc::new(monitor(&harness));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn({
            let monitor = monitor.clone();
            let shutdown = shutdown.clone();
            async move { monitor.run(shutdown).await }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("monitor should stop promptly")
            .expect("monitor task panicked");
        assert!(result.is_ok());
        assert_eq!(MockBackend::count(&harness.backend.program_calls), 1, "Exactly one cycle ran");
    }
}
