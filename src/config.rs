// Runtime configuration for the reclaim bot:
// - RPC endpoint, commitment and timeout
// - monitored program and fee payer keypair
// - rate limit window/capacity and account cache settings
// - scan cadence, batch size, retry policy and dry-run flag
// - dashboard listening address/port

use dotenv::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub dashboard_enabled: bool,
    pub solana_rpc_url: String,
    pub solana_commitment_level: String,
    pub rpc_timeout_secs: u64,
    pub program_id: String,
    pub fee_payer_keypair_path: String,
    pub reclaim_destination: Option<String>,
    pub max_requests_per_window: u32,
    pub rate_limit_window: Duration,
    pub cache_ttl: Duration,
    pub cache_max_capacity: u64,
    pub scan_interval: Duration,
    pub batch_size: u32,
    pub priority_fee_micro_lamports: u64,
    pub max_retries: usize,
    pub retry_base_delay: Duration,
    pub confirm_timeout: Duration,
    pub dry_run: bool,
    pub min_reclaim_lamports: u64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/bot-state.db".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            dashboard_enabled: true,
            solana_rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            solana_commitment_level: "confirmed".to_string(),
            rpc_timeout_secs: 30,
            program_id: String::new(),
            fee_payer_keypair_path: "./config/fee-payer.json".to_string(),
            reclaim_destination: None,
            max_requests_per_window: 100,
            rate_limit_window: Duration::from_millis(10_000),
            cache_ttl: Duration::from_millis(30_000),
            cache_max_capacity: 1000,
            scan_interval: Duration::from_secs(60),
            batch_size: 100,
            priority_fee_micro_lamports: 5000,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(2000),
            confirm_timeout: Duration::from_secs(60),
            dry_run: false,
            min_reclaim_lamports: 1_000_000,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let defaults = Self::default();

        let program_id = env::var("KORA_PROGRAM_ID")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("KORA_PROGRAM_ID"))?;
        crate::validation::validate_solana_address(&program_id).map_err(|_| {
            ConfigError::Invalid {
                name: "KORA_PROGRAM_ID",
                value: program_id.clone(),
            }
        })?;

        let priority_fee_micro_lamports = env::var("PRIORITY_FEE_MICRO_LAMPORTS")
            .or_else(|_| env::var("PRIORITY_FEE_LAMPORTS"))
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.priority_fee_micro_lamports);

        Ok(Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_env("SERVER_PORT", defaults.server_port),
            dashboard_enabled: parse_bool_env("DASHBOARD_ENABLED", defaults.dashboard_enabled),
            solana_rpc_url: env::var("SOLANA_RPC_URL")
                .or_else(|_| env::var("SOLANA_RPC_ENDPOINT"))
                .unwrap_or(defaults.solana_rpc_url),
            solana_commitment_level: env::var("SOLANA_COMMITMENT_LEVEL")
                .unwrap_or(defaults.solana_commitment_level),
            rpc_timeout_secs: parse_env("RPC_TIMEOUT_SECS", defaults.rpc_timeout_secs),
            program_id,
            fee_payer_keypair_path: env::var("FEE_PAYER_KEYPAIR_PATH")
                .unwrap_or(defaults.fee_payer_keypair_path),
            reclaim_destination: env::var("RECLAIM_DESTINATION")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            max_requests_per_window: parse_env(
                "MAX_RPC_REQUESTS_PER_WINDOW",
                defaults.max_requests_per_window,
            ),
            rate_limit_window: parse_millis_env("RATE_LIMIT_WINDOW_MS", defaults.rate_limit_window),
            cache_ttl: parse_millis_env("CACHE_TTL_MS", defaults.cache_ttl),
            cache_max_capacity: parse_env("CACHE_SIZE", defaults.cache_max_capacity),
            scan_interval: env::var("SCAN_INTERVAL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.scan_interval),
            batch_size: parse_env("BATCH_SIZE", defaults.batch_size),
            priority_fee_micro_lamports,
            max_retries: parse_env("MAX_RETRIES", defaults.max_retries),
            retry_base_delay: parse_millis_env("RETRY_BASE_DELAY_MS", defaults.retry_base_delay),
            confirm_timeout: env::var("CONFIRM_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.confirm_timeout),
            dry_run: parse_bool_env("DRY_RUN", defaults.dry_run),
            min_reclaim_lamports: parse_env("MIN_RECLAIM_LAMPORTS", defaults.min_reclaim_lamports),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }
}

fn parse_env<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_millis_env(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn parse_bool_env(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => v.eq_ignore_ascii_case("true") || v == "1",
        Err(_) => default,
    }
}
