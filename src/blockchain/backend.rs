use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{Transaction, TransactionError};
use std::time::Duration;
use tracing::info;

use crate::blockchain::client::ClientError;
use crate::blockchain::models::RemoteAccount;
use crate::config::Config;

/// The remote procedure boundary. Every method is a single network round trip;
/// admission control, caching and statistics live in `RateLimitedClient`.
#[async_trait]
pub trait RpcBackend: Send + Sync {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<RemoteAccount>, ClientError>;

    /// Results are positionally aligned with `addresses`.
    async fn get_multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<RemoteAccount>>, ClientError>;

    async fn get_program_accounts(&self, program_id: &Pubkey) -> Result<Vec<Pubkey>, ClientError>;

    async fn get_latest_blockhash(&self) -> Result<Hash, ClientError>;

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, ClientError>;

    /// `None` while the signature has not reached the configured commitment.
    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<Result<(), TransactionError>>, ClientError>;
}

pub fn parse_commitment(level: &str) -> CommitmentConfig {
    match level {
        "processed" => CommitmentConfig::processed(),
        "confirmed" => CommitmentConfig::confirmed(),
        "finalized" => CommitmentConfig::finalized(),
        _ => CommitmentConfig::confirmed(),
    }
}

pub struct SolanaRpcBackend {
    rpc_client: RpcClient,
    commitment: CommitmentConfig,
}

impl SolanaRpcBackend {
    pub fn new(config: &Config) -> Self {
        let rpc_url = &config.solana_rpc_url;
        let timeout = Duration::from_secs(config.rpc_timeout_secs);
        let commitment = parse_commitment(&config.solana_commitment_level);

        info!(
            "Initializing Solana client with RPC endpoint: {}, commitment: {:?}",
            rpc_url, commitment
        );

        let rpc_client =
            RpcClient::new_with_timeout_and_commitment(rpc_url.clone(), timeout, commitment);

        Self {
            rpc_client,
            commitment,
        }
    }
}

#[async_trait]
impl RpcBackend for SolanaRpcBackend {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<RemoteAccount>, ClientError> {
        let response = self
            .rpc_client
            .get_account_with_commitment(address, self.commitment)
            .await?;

        Ok(response.value.map(RemoteAccount::from))
    }

    async fn get_multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<RemoteAccount>>, ClientError> {
        let response = self
            .rpc_client
            .get_multiple_accounts_with_commitment(addresses, self.commitment)
            .await?;

        Ok(response
            .value
            .into_iter()
            .map(|account| account.map(RemoteAccount::from))
            .collect())
    }

    async fn get_program_accounts(&self, program_id: &Pubkey) -> Result<Vec<Pubkey>, ClientError> {
        let accounts = self.rpc_client.get_program_accounts(program_id).await?;
        Ok(accounts.into_iter().map(|(pubkey, _)| pubkey).collect())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, ClientError> {
        Ok(self.rpc_client.get_latest_blockhash().await?)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, ClientError> {
        Ok(self.rpc_client.send_transaction(transaction).await?)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<Result<(), TransactionError>>, ClientError> {
        Ok(self
            .rpc_client
            .get_signature_status_with_commitment(signature, self.commitment)
            .await?)
    }
}
