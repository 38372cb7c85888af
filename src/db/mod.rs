pub mod accounts;
pub mod connection;
pub mod migration;
pub mod reclaims;
pub mod stats;

pub use connection::{establish_connection, open_read_only};
pub use migration::run_migrations;
