pub mod api;
pub mod blockchain;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod reclaim;
pub mod state;
pub mod validation;

#[cfg(test)]
pub mod tests;

// Re-export specific items for convenience
pub use api::error::ApiError;
pub use api::response::ApiResponse;
pub use api::route::create_router;
pub use blockchain::{RateLimitedClient, ReclaimMonitor};
pub use config::Config;
pub use db::{establish_connection, run_migrations};
pub use models::{AccountStatus, ReclaimEvent, TrackedAccount};
pub use validation::{parse_pubkey, validate_solana_address};
