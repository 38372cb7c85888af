pub mod backend;
pub mod client;
pub mod models;
pub mod polling;
pub mod rate_limiter;

// Re-exports for convenience
pub use backend::{RpcBackend, SolanaRpcBackend};
pub use client::{ClientError, RateLimitedClient, RpcStats};
pub use polling::{ReclaimMonitor, ReclaimTarget};
