use crate::blockchain::RateLimitedClient;
use crate::config::Config;
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub db_pool: SqlitePool,
    pub client: Arc<RateLimitedClient>,
}
