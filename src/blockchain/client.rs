use futures::future::try_join_all;
use serde::Serialize;
use solana_client::client_error::ClientErrorKind;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{Transaction, TransactionError};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::blockchain::backend::RpcBackend;
use crate::blockchain::models::RemoteAccount;
use crate::blockchain::rate_limiter::{Admission, AdmissionGate};
use crate::cache::AccountCache;
use crate::config::Config;
use crate::models::now_millis;
use crate::validation::parse_pubkey;

/// getMultipleAccounts accepts at most this many keys per request.
pub const MAX_MULTIPLE_ACCOUNTS: usize = 100;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("RPC error: {0}")]
    RpcError(#[from] solana_client::client_error::ClientError),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limited by RPC provider (429)")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid public key: {0}")]
    PubkeyError(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Blockhash not found")]
    BlockhashNotFound,
}

impl ClientError {
    /// Timeouts, connection failures, provider rate limits and expired
    /// blockhashes. Everything else is treated as permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Timeout(_)
            | ClientError::RateLimited
            | ClientError::Network(_)
            | ClientError::BlockhashNotFound => true,
            ClientError::PubkeyError(_) | ClientError::Rejected(_) => false,
            ClientError::RpcError(e) => {
                if matches!(e.kind(), ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_)) {
                    return true;
                }
                let message = e.to_string().to_lowercase();
                message.contains("timeout")
                    || message.contains("timed out")
                    || message.contains("429")
                    || message.contains("too many requests")
                    || message.contains("network")
                    || message.contains("connection")
                    || message.contains("blockhash not found")
            }
        }
    }

    /// The transaction's blockhash is no longer valid and it must be re-signed.
    pub fn is_blockhash_expired(&self) -> bool {
        match self {
            ClientError::BlockhashNotFound => true,
            ClientError::RpcError(e) => {
                let message = e.to_string().to_lowercase();
                message.contains("blockhash not found") || message.contains("block height exceeded")
            }
            _ => false,
        }
    }

    /// The node has already seen this exact signed transaction.
    pub fn is_already_processed(&self) -> bool {
        let message = self.to_string().to_lowercase();
        message.contains("already been processed") || message.contains("alreadyprocessed")
    }
}

/// Call statistics, exposed as a copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RpcStats {
    pub requests_total: u64,
    pub requests_success: u64,
    pub requests_failed: u64,
    pub requests_rate_limited: u64,
    pub cache_hits: u64,
    pub last_request_timestamp: i64,
    pub average_latency_ms: f64,
}

impl RpcStats {
    pub(crate) fn record_latency(&mut self, latency_ms: f64) {
        if self.requests_success == 0 {
            self.average_latency_ms = latency_ms;
        } else {
            self.average_latency_ms = self.average_latency_ms * 0.9 + latency_ms * 0.1;
        }
    }
}

pub struct RateLimitedClient {
    backend: Arc<dyn RpcBackend>,
    gate: AdmissionGate,
    cache: AccountCache,
    stats: Mutex<RpcStats>,
}

impl RateLimitedClient {
    pub fn new(backend: Arc<dyn RpcBackend>, config: &Config) -> Self {
        info!(
            "RPC client initialized: {} req / {:?}, cache ttl {:?}, cache size {}",
            config.max_requests_per_window,
            config.rate_limit_window,
            config.cache_ttl,
            config.cache_max_capacity
        );

        Self {
            backend,
            gate: AdmissionGate::new(config.max_requests_per_window, config.rate_limit_window),
            cache: AccountCache::new(config.cache_max_capacity, config.cache_ttl),
            stats: Mutex::new(RpcStats::default()),
        }
    }

    /// Pass the admission gate, run one network call and account for it.
    async fn execute<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        if self.gate.acquire().await == Admission::Delayed {
            self.stats.lock().await.requests_rate_limited += 1;
        }

        let start = Instant::now();
        {
            let mut stats = self.stats.lock().await;
            stats.requests_total += 1;
            stats.last_request_timestamp = now_millis();
        }

        match call().await {
            Ok(value) => {
                let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
                let mut stats = self.stats.lock().await;
                stats.record_latency(latency_ms);
                stats.requests_success += 1;
                Ok(value)
            }
            Err(e) => {
                self.stats.lock().await.requests_failed += 1;
                error!("RPC error [{}]: {}", operation, e);
                Err(e)
            }
        }
    }

    /// Single account lookup; served from cache while the entry is fresh.
    pub async fn get_account_info(&self, address: &str) -> Result<Option<RemoteAccount>, ClientError> {
        if let Some(cached) = self.cache.get(address).await {
            self.stats.lock().await.cache_hits += 1;
            return Ok(cached);
        }

        let pubkey = parse_pubkey(address).map_err(|_| ClientError::PubkeyError(address.to_string()))?;
        let account = self
            .execute("getAccountInfo", || self.backend.get_account(&pubkey))
            .await?;

        self.cache.insert(address, account.clone()).await;
        Ok(account)
    }

    /// Batched lookup, always fresh. Chunks are fetched concurrently and each
    /// one passes the admission gate on its own. Output order matches input.
    pub async fn get_multiple_accounts(
        &self,
        addresses: &[String],
    ) -> Result<Vec<Option<RemoteAccount>>, ClientError> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        let pubkeys = addresses
            .iter()
            .map(|address| parse_pubkey(address).map_err(|_| ClientError::PubkeyError(address.clone())))
            .collect::<Result<Vec<Pubkey>, _>>()?;

        let chunks = pubkeys.chunks(MAX_MULTIPLE_ACCOUNTS).map(|chunk| {
            self.execute("getMultipleAccounts", move || self.backend.get_multiple_accounts(chunk))
        });

        let accounts: Vec<Option<RemoteAccount>> = try_join_all(chunks).await?.into_iter().flatten().collect();

        if accounts.len() != addresses.len() {
            return Err(ClientError::Rejected(format!(
                "expected {} accounts, got {}",
                addresses.len(),
                accounts.len()
            )));
        }

        for (address, account) in addresses.iter().zip(accounts.iter()) {
            self.cache.insert(address, account.clone()).await;
        }

        debug!("Fetched {} accounts in batch", accounts.len());
        Ok(accounts)
    }

    /// Addresses of every account owned by `program_id`.
    pub async fn get_program_accounts(&self, program_id: &Pubkey) -> Result<Vec<String>, ClientError> {
        let pubkeys = self
            .execute("getProgramAccounts", || self.backend.get_program_accounts(program_id))
            .await?;

        Ok(pubkeys.iter().map(Pubkey::to_string).collect())
    }

    pub async fn get_latest_blockhash(&self) -> Result<Hash, ClientError> {
        self.execute("getLatestBlockhash", || self.backend.get_latest_blockhash())
            .await
    }

    pub async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, ClientError> {
        self.execute("sendTransaction", || self.backend.send_transaction(transaction))
            .await
    }

    pub async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<Result<(), TransactionError>>, ClientError> {
        self.execute("getSignatureStatus", || self.backend.get_signature_status(signature))
            .await
    }

    pub async fn invalidate_cached(&self, address: &str) {
        self.cache.invalidate(address).await;
    }

    pub async fn cached_entries(&self) -> u64 {
        self.cache.entry_count().await
    }

    pub async fn stats(&self) -> RpcStats {
        self.stats.lock().await.clone()
    }
}
