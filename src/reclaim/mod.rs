pub mod builder;
pub mod eligibility;
pub mod executor;

pub use builder::{BuildError, TransactionBuilder};
pub use eligibility::{Eligibility, EligibilityEvaluator, IneligibleReason};
pub use executor::{ExecutionError, ExecutionResult, ReclaimExecutor};
