use backon::{ExponentialBuilder, Retryable};
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::{Transaction, TransactionError};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::blockchain::client::{ClientError, RateLimitedClient};
use crate::config::Config;
use crate::db::{accounts, reclaims};
use crate::models::{now_millis, AccountStatus, ReclaimEvent, TrackedAccount};
use crate::reclaim::builder::{BuildError, TransactionBuilder};

pub const DRY_RUN_REFERENCE: &str = "dry-run";

/// The signed transaction carried between submission attempts.
#[derive(Default)]
struct Submission {
    signed: Option<Transaction>,
    blockhash_expired: bool,
}

const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("Transaction failed on-chain: {0}")]
    OnChain(TransactionError),

    #[error("Transaction not confirmed within {0:?}")]
    ConfirmationTimeout(Duration),
}

impl ExecutionError {
    /// Only transient transport failures are worth another submission.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExecutionError::Client(e) => e.is_transient(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub reference: Option<String>,
    pub error: Option<String>,
    pub amount_reclaimed: Option<u64>,
}

impl ExecutionResult {
    fn succeeded(reference: String, amount: u64) -> Self {
        Self {
            success: true,
            reference: Some(reference),
            error: None,
            amount_reclaimed: Some(amount),
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            reference: None,
            error: Some(error),
            amount_reclaimed: None,
        }
    }
}

/// Submits reclaim transactions, waits for confirmation and commits the outcome.
pub struct ReclaimExecutor {
    client: Arc<RateLimitedClient>,
    db_pool: SqlitePool,
    builder: TransactionBuilder,
    signer: Arc<Keypair>,
    dry_run: bool,
    max_retries: usize,
    retry_base_delay: Duration,
    confirm_timeout: Duration,
}

impl ReclaimExecutor {
    pub fn new(
        client: Arc<RateLimitedClient>,
        db_pool: SqlitePool,
        builder: TransactionBuilder,
        signer: Arc<Keypair>,
        config: &Config,
    ) -> Self {
        Self {
            client,
            db_pool,
            builder,
            signer,
            dry_run: config.dry_run,
            max_retries: config.max_retries.max(1),
            retry_base_delay: config.retry_base_delay,
            confirm_timeout: config.confirm_timeout,
        }
    }

    /// Run one reclaim attempt for `record` and persist the outcome.
    ///
    /// Execution failures are reported through `ExecutionResult`; only a store
    /// failure is returned as `Err`.
    pub async fn execute_reclaim(
        &self,
        record: &mut TrackedAccount,
        transaction: Transaction,
    ) -> Result<ExecutionResult, sqlx::Error> {
        let amount = record.balance;
        info!("Starting reclaim for {} ({} lamports)", record.address, amount);

        if self.dry_run {
            info!("[DRY RUN] Skipping submission for {}", record.address);
            return Ok(ExecutionResult::succeeded(DRY_RUN_REFERENCE.to_string(), amount));
        }

        match self.submit_and_confirm(&transaction).await {
            Ok(signature) => {
                info!("Reclaimed {} lamports from {}: {}", amount, record.address, signature);
                self.commit_success(record, signature.to_string(), amount).await?;
                self.client.invalidate_cached(&record.address).await;
                Ok(ExecutionResult::succeeded(signature.to_string(), amount))
            }
            Err(e) => {
                error!("Reclaim failed for {}: {}", record.address, e);
                let message = e.to_string();
                self.record_failure(record, &message).await?;
                Ok(ExecutionResult::failed(message))
            }
        }
    }

    /// Record a failed attempt: audit row first, then the error counters.
    /// Status is left untouched so the account stays monitored.
    pub async fn record_failure(&self, record: &mut TrackedAccount, message: &str) -> Result<(), sqlx::Error> {
        let now = now_millis();
        reclaims::record_reclaim(&self.db_pool, &ReclaimEvent::failed(&record.address, message.to_string(), now))
            .await?;

        record.error_count += 1;
        record.last_error = Some(message.to_string());
        record.updated_at = now;
        accounts::upsert_account(&self.db_pool, record).await
    }

    async fn commit_success(
        &self,
        record: &mut TrackedAccount,
        reference: String,
        amount: u64,
    ) -> Result<(), sqlx::Error> {
        let now = now_millis();
        // Appends the audit row and credits total_reclaimed in one transaction
        reclaims::record_reclaim(&self.db_pool, &ReclaimEvent::success(&record.address, reference, amount, now))
            .await?;

        record.status = AccountStatus::Reclaimed;
        record.total_reclaimed += amount;
        record.balance = 0;
        record.updated_at = now;
        accounts::upsert_account(&self.db_pool, record).await
    }

    async fn submit_and_confirm(&self, transaction: &Transaction) -> Result<Signature, ExecutionError> {
        let signature = self.submit_with_retry(transaction).await?;
        info!("Transaction submitted: {}", signature);

        timeout(self.confirm_timeout, self.poll_confirmation(&signature))
            .await
            .map_err(|_| ExecutionError::ConfirmationTimeout(self.confirm_timeout))??;

        info!("Transaction confirmed: {}", signature);
        Ok(signature)
    }

    /// Resubmits the same signed transaction after transient failures so the
    /// node can deduplicate it by signature.
    async fn submit_with_retry(&self, skeleton: &Transaction) -> Result<Signature, ExecutionError> {
        let policy = ExponentialBuilder::default()
            .with_min_delay(self.retry_base_delay)
            .with_max_delay(self.retry_base_delay.saturating_mul(64))
            .with_factor(2.0)
            .with_max_times(self.max_retries - 1);

        let submission = Mutex::new(Submission::default());

        (|| self.submit_attempt(skeleton, &submission))
            .retry(policy)
            .sleep(sleep)
            .when(ExecutionError::is_retryable)
            .notify(|err: &ExecutionError, delay: Duration| {
                warn!("Submission failed, retrying in {:?}: {}", delay, err);
            })
            .await
    }

    /// One submission attempt. A previously sent signature is looked up first:
    /// if it already landed, that is the result. The skeleton is signed against
    /// a new blockhash only on the first attempt or after the old one expired.
    async fn submit_attempt(
        &self,
        skeleton: &Transaction,
        submission: &Mutex<Submission>,
    ) -> Result<Signature, ExecutionError> {
        let mut state = submission.lock().await;

        if let Some(previous) = state.signed.as_ref() {
            let signature = previous.signatures[0];
            match self.client.get_signature_status(&signature).await? {
                Some(Ok(())) => {
                    info!("Earlier submission {} already landed", signature);
                    return Ok(signature);
                }
                Some(Err(err)) => return Err(ExecutionError::OnChain(err)),
                None => {}
            }
        }

        let signed = match state.signed.take() {
            Some(signed) if !state.blockhash_expired => signed,
            _ => {
                let blockhash = self.client.get_latest_blockhash().await?;
                let mut signed = skeleton.clone();
                self.builder.sign(&mut signed, &[self.signer.as_ref()], blockhash)?;
                signed
            }
        };
        state.blockhash_expired = false;

        let signature = signed.signatures[0];
        let result = self.client.send_transaction(&signed).await;
        state.signed = Some(signed);

        match result {
            Ok(signature) => Ok(signature),
            Err(e) if e.is_already_processed() => {
                debug!("Node already processed {}", signature);
                Ok(signature)
            }
            Err(e) => {
                state.blockhash_expired = e.is_blockhash_expired();
                Err(e.into())
            }
        }
    }

    async fn poll_confirmation(&self, signature: &Signature) -> Result<(), ExecutionError> {
        loop {
            match self.client.get_signature_status(signature).await? {
                Some(Ok(())) => return Ok(()),
                Some(Err(err)) => return Err(ExecutionError::OnChain(err)),
                None => {
                    debug!("Waiting for confirmation: {}", signature);
                    sleep(CONFIRM_POLL_INTERVAL).await;
                }
            }
        }
    }
}
