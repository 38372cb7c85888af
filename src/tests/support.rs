//! Shared fixtures: in-memory store, scripted RPC backend, test config.

use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::{Transaction, TransactionError};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::blockchain::backend::RpcBackend;
use crate::blockchain::client::{ClientError, RateLimitedClient};
use crate::blockchain::models::RemoteAccount;
use crate::config::Config;
use crate::db::{accounts, run_migrations};
use crate::models::{now_millis, TrackedAccount};
use crate::reclaim::{ReclaimExecutor, TransactionBuilder};

/// Rent-exempt minimum of a 165-byte token account.
pub const TOKEN_ACCOUNT_RENT: u64 = 2_039_280;
pub const TOKEN_ACCOUNT_LEN: usize = 165;

pub const HOUR_MS: i64 = 60 * 60 * 1000;

pub fn test_config() -> Config {
    Config {
        program_id: Pubkey::new_unique().to_string(),
        max_requests_per_window: 1000,
        rate_limit_window: Duration::from_secs(1),
        retry_base_delay: Duration::from_millis(1),
        confirm_timeout: Duration::from_secs(2),
        ..Config::default()
    }
}

pub async fn memory_pool() -> SqlitePool {
    // A single connection that never recycles keeps the in-memory database alive
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    run_migrations(&pool).await.expect("Failed to run migrations");
    pool
}

pub fn closed_account(lamports: u64) -> RemoteAccount {
    RemoteAccount::new(lamports, 0, spl_token::id())
}

pub fn live_account(lamports: u64) -> RemoteAccount {
    RemoteAccount::new(lamports, TOKEN_ACCOUNT_LEN, spl_token::id())
}

/// A tracked record created `age_ms` ago that is already due.
pub fn tracked(address: &Pubkey, age_ms: i64) -> TrackedAccount {
    let now = now_millis();
    let mut record = TrackedAccount::new(address.to_string(), now - age_ms);
    record.next_check_at = Some(now - 1);
    record
}

pub async fn store(pool: &SqlitePool, record: &TrackedAccount) {
    accounts::upsert_account(pool, record)
        .await
        .expect("Failed to store account");
}

#[derive(Debug, Clone, Copy)]
pub enum SendBehaviour {
    Accept,
    Transient,
    Permanent,
    /// The transaction lands but the response is lost.
    LandedTimeout,
    /// The node already has this signature and refuses the duplicate.
    AlreadyProcessed,
    ExpiredBlockhash,
}

/// Scripted in-process stand-in for the RPC node.
pub struct MockBackend {
    accounts: Mutex<HashMap<Pubkey, RemoteAccount>>,
    program_accounts: Mutex<Vec<Pubkey>>,
    send_script: Mutex<VecDeque<SendBehaviour>>,
    confirmation: Mutex<Option<Result<(), TransactionError>>>,
    submitted: Mutex<HashSet<Signature>>,
    landed: Mutex<HashSet<Signature>>,
    sent: Mutex<Vec<Signature>>,
    fail_batch: AtomicBool,
    fail_discovery: AtomicBool,
    pub get_account_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
    pub program_calls: AtomicUsize,
    pub blockhash_calls: AtomicUsize,
    pub send_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            program_accounts: Mutex::new(Vec::new()),
            send_script: Mutex::new(VecDeque::new()),
            confirmation: Mutex::new(Some(Ok(()))),
            submitted: Mutex::new(HashSet::new()),
            landed: Mutex::new(HashSet::new()),
            sent: Mutex::new(Vec::new()),
            fail_batch: AtomicBool::new(false),
            fail_discovery: AtomicBool::new(false),
            get_account_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
            program_calls: AtomicUsize::new(0),
            blockhash_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_account(&self, address: Pubkey, account: RemoteAccount) {
        self.accounts.lock().unwrap().insert(address, account);
    }

    pub fn set_program_accounts(&self, addresses: Vec<Pubkey>) {
        *self.program_accounts.lock().unwrap() = addresses;
    }

    /// Behaviours consumed one per send; an empty script accepts.
    pub fn script_sends(&self, script: &[SendBehaviour]) {
        self.send_script.lock().unwrap().extend(script.iter().copied());
    }

    /// Signatures of every transaction handed to `send_transaction`, in order.
    pub fn sent_signatures(&self) -> Vec<Signature> {
        self.sent.lock().unwrap().clone()
    }

    /// Status reported for transactions the node accepted.
    pub fn set_confirmation(&self, status: Option<Result<(), TransactionError>>) {
        *self.confirmation.lock().unwrap() = status;
    }

    pub fn fail_batch_reads(&self) {
        self.fail_batch.store(true, Ordering::SeqCst);
    }

    pub fn fail_discovery(&self) {
        self.fail_discovery.store(true, Ordering::SeqCst);
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RpcBackend for MockBackend {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<RemoteAccount>, ClientError> {
        self.get_account_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn get_multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<RemoteAccount>>, ClientError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_batch.load(Ordering::SeqCst) {
            return Err(ClientError::Network("connection refused".to_string()));
        }

        let accounts = self.accounts.lock().unwrap();
        Ok(addresses.iter().map(|address| accounts.get(address).cloned()).collect())
    }

    async fn get_program_accounts(&self, _program_id: &Pubkey) -> Result<Vec<Pubkey>, ClientError> {
        self.program_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_discovery.load(Ordering::SeqCst) {
            return Err(ClientError::Timeout("getProgramAccounts".to_string()));
        }
        Ok(self.program_accounts.lock().unwrap().clone())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, ClientError> {
        self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Hash::new_unique())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, ClientError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        let behaviour = self
            .send_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SendBehaviour::Accept);

        let signature = transaction.signatures[0];
        self.sent.lock().unwrap().push(signature);

        match behaviour {
            SendBehaviour::Accept => {
                self.submitted.lock().unwrap().insert(signature);
                Ok(signature)
            }
            SendBehaviour::Transient => Err(ClientError::Network("connection reset by peer".to_string())),
            SendBehaviour::Permanent => Err(ClientError::Rejected("insufficient funds for fee".to_string())),
            SendBehaviour::LandedTimeout => {
                self.landed.lock().unwrap().insert(signature);
                Err(ClientError::Timeout("sendTransaction".to_string()))
            }
            SendBehaviour::AlreadyProcessed => {
                self.submitted.lock().unwrap().insert(signature);
                Err(ClientError::Rejected(
                    "Transaction simulation failed: This transaction has already been processed".to_string(),
                ))
            }
            SendBehaviour::ExpiredBlockhash => Err(ClientError::BlockhashNotFound),
        }
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<Result<(), TransactionError>>, ClientError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.landed.lock().unwrap().contains(signature) {
            return Ok(Some(Ok(())));
        }
        if self.submitted.lock().unwrap().contains(signature) {
            return Ok(self.confirmation.lock().unwrap().clone());
        }
        Ok(None)
    }
}

/// Client, signer and executor wired to one mock backend and pool.
pub struct Harness {
    pub backend: Arc<MockBackend>,
    pub client: Arc<RateLimitedClient>,
    pub pool: SqlitePool,
    pub signer: Arc<Keypair>,
    pub config: Config,
}

impl Harness {
    pub async fn new(config: Config) -> Self {
        let backend = Arc::new(MockBackend::new());
        let client = Arc::new(RateLimitedClient::new(backend.clone(), &config));

        Self {
            backend,
            client,
            pool: memory_pool().await,
            signer: Arc::new(Keypair::new()),
            config,
        }
    }

    pub fn authority(&self) -> Pubkey {
        self.signer.pubkey()
    }

    pub fn executor(&self) -> ReclaimExecutor {
        ReclaimExecutor::new(
            self.client.clone(),
            self.pool.clone(),
            TransactionBuilder::new(self.config.priority_fee_micro_lamports),
            self.signer.clone(),
            &self.config,
        )
    }

    /// Unsigned close transaction for `address`, paid and signed by the harness signer.
    pub fn close_transaction(&self, address: &Pubkey) -> Transaction {
        TransactionBuilder::new(self.config.priority_fee_micro_lamports)
            .build(address, &self.authority(), &self.authority())
            .expect("Failed to build close transaction")
    }
}
