// Tracked account records, reclaim audit events and aggregate stats.
// Timestamps are epoch milliseconds, amounts are lamports.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const INTERVAL_NEW_MS: i64 = 30 * 1000;
pub const INTERVAL_ACTIVE_MS: i64 = 5 * 60 * 1000;
pub const INTERVAL_INACTIVE_MS: i64 = 30 * 60 * 1000;

/// Accounts younger than this are re-checked on the short interval.
pub const NEW_ACCOUNT_AGE_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Reclaimed,
    Error,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Reclaimed => "reclaimed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "reclaimed" => Ok(Self::Reclaimed),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown account status: {}", other)),
        }
    }
}

/// One monitored address and its schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedAccount {
    pub address: String,
    pub last_checked_at: Option<i64>,
    pub next_check_at: Option<i64>,
    pub check_interval_ms: i64,
    pub balance: u64,
    pub status: AccountStatus,
    pub total_reclaimed: u64,
    pub error_count: i64,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TrackedAccount {
    /// A freshly discovered account, due immediately.
    pub fn new(address: impl Into<String>, now: i64) -> Self {
        Self {
            address: address.into(),
            last_checked_at: None,
            next_check_at: Some(now),
            check_interval_ms: INTERVAL_NEW_MS,
            balance: 0,
            status: AccountStatus::Active,
            total_reclaimed: 0,
            error_count: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReclaimOutcome {
    Success,
    Failed,
}

impl ReclaimOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for ReclaimOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown reclaim outcome: {}", other)),
        }
    }
}

/// Append-only audit row, one per execution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReclaimEvent {
    pub id: Option<i64>,
    pub address: String,
    pub transaction_ref: String,
    pub amount: u64,
    pub timestamp: i64,
    pub outcome: ReclaimOutcome,
    pub error_message: Option<String>,
}

impl ReclaimEvent {
    pub fn success(address: &str, transaction_ref: String, amount: u64, timestamp: i64) -> Self {
        Self {
            id: None,
            address: address.to_string(),
            transaction_ref,
            amount,
            timestamp,
            outcome: ReclaimOutcome::Success,
            error_message: None,
        }
    }

    pub fn failed(address: &str, error_message: String, timestamp: i64) -> Self {
        Self {
            id: None,
            address: address.to_string(),
            transaction_ref: "failed-submission".to_string(),
            amount: 0,
            timestamp,
            outcome: ReclaimOutcome::Failed,
            error_message: Some(error_message),
        }
    }
}

/// Aggregate counts over the tracking store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_tracked: i64,
    pub active: i64,
    pub inactive: i64,
    pub reclaimed: i64,
    pub errored: i64,
    pub total_reclaimed_lamports: u64,
    pub successful_reclaims: i64,
    pub failed_reclaims: i64,
}

/// Per-cycle snapshot persisted for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub timestamp: i64,
    pub accounts_monitored: i64,
    pub accounts_reclaimed: i64,
    pub total_reclaimed_lamports: u64,
    pub rpc_calls_made: u64,
    pub errors_encountered: i64,
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
