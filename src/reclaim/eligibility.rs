use std::fmt;

use crate::blockchain::models::RemoteAccount;
use crate::models::{AccountStatus, TrackedAccount};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneligibleReason {
    NotFound,
    NotClosed,
    ZeroBalance,
    AlreadyReclaimed,
}

impl IneligibleReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::NotClosed => "not closed",
            Self::ZeroBalance => "zero balance",
            Self::AlreadyReclaimed => "already reclaimed",
        }
    }
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible { amount: u64 },
    Ineligible(IneligibleReason),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible { .. })
    }

    pub fn amount(&self) -> Option<u64> {
        match self {
            Self::Eligible { amount } => Some(*amount),
            Self::Ineligible(_) => None,
        }
    }

    pub fn reason(&self) -> Option<IneligibleReason> {
        match self {
            Self::Eligible { .. } => None,
            Self::Ineligible(reason) => Some(*reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EligibilityEvaluator {
    min_reclaim_lamports: u64,
}

impl EligibilityEvaluator {
    pub fn new(min_reclaim_lamports: u64) -> Self {
        Self { min_reclaim_lamports }
    }

    /// Structural eligibility. Checks run in order and stop at the first failure:
    /// exists on-chain, closed (no data), non-zero balance, not yet reclaimed.
    pub fn evaluate(&self, remote: Option<&RemoteAccount>, record: &TrackedAccount) -> Eligibility {
        let Some(account) = remote else {
            return Eligibility::Ineligible(IneligibleReason::NotFound);
        };

        if !account.is_closed() {
            return Eligibility::Ineligible(IneligibleReason::NotClosed);
        }

        if account.lamports == 0 {
            return Eligibility::Ineligible(IneligibleReason::ZeroBalance);
        }

        if record.status == AccountStatus::Reclaimed {
            return Eligibility::Ineligible(IneligibleReason::AlreadyReclaimed);
        }

        Eligibility::Eligible {
            amount: account.lamports,
        }
    }

    /// Whether the balance is worth a transaction fee. Kept apart from
    /// `evaluate` so "too small" is never confused with "not closed".
    pub fn meets_threshold(&self, remote: Option<&RemoteAccount>) -> bool {
        remote.is_some_and(|account| account.lamports >= self.min_reclaim_lamports)
    }

    pub fn min_reclaim_lamports(&self) -> u64 {
        self.min_reclaim_lamports
    }
}
