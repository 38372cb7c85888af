use rent_reclaim::{
    api,
    blockchain::{RateLimitedClient, ReclaimMonitor, ReclaimTarget, SolanaRpcBackend},
    config::Config,
    db,
    reclaim::{ReclaimExecutor, TransactionBuilder},
    state::AppState,
    validation::parse_pubkey,
};

use solana_sdk::signature::{read_keypair_file, Signer};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting rent-reclaim");
    tracing::info!(
        "Configuration loaded: rpc {}, program {}, dry run {}",
        config.solana_rpc_url,
        config.program_id,
        config.dry_run
    );

    let db_pool = db::establish_connection(&config.database_url).await?;
    tracing::info!("Database ready at {}", config.database_url);

    let fee_payer = read_keypair_file(&config.fee_payer_keypair_path).map_err(|e| {
        format!(
            "Failed to read fee payer keypair {}: {}",
            config.fee_payer_keypair_path, e
        )
    })?;
    let fee_payer = Arc::new(fee_payer);

    let destination = match &config.reclaim_destination {
        Some(address) => parse_pubkey(address)?,
        None => fee_payer.pubkey(),
    };
    let target = ReclaimTarget {
        program_id: parse_pubkey(&config.program_id)?,
        destination,
        authority: fee_payer.pubkey(),
    };
    tracing::info!(
        "Reclaiming to {} with authority {}",
        target.destination,
        target.authority
    );

    let backend = Arc::new(SolanaRpcBackend::new(&config));
    let client = Arc::new(RateLimitedClient::new(backend, &config));

    let executor = ReclaimExecutor::new(
        client.clone(),
        db_pool.clone(),
        TransactionBuilder::new(config.priority_fee_micro_lamports),
        fee_payer.clone(),
        &config,
    );
    let monitor = ReclaimMonitor::new(client.clone(), db_pool.clone(), executor, target, &config);

    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        signal_token.cancel();
    });

    let server = if config.dashboard_enabled {
        let app_state = Arc::new(AppState {
            config: config.clone(),
            db_pool: db_pool.clone(),
            client: client.clone(),
        });
        let app = api::create_router(app_state);
        let addr = format!("{}:{}", config.server_host, config.server_port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Dashboard listening on {}", addr);

        let server_token = shutdown.clone();
        Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_token.cancelled().await })
                .await
        }))
    } else {
        None
    };

    let result = monitor.run(shutdown.clone()).await;
    shutdown.cancel();

    if let Some(server) = server {
        match server.await {
            Ok(Err(e)) => tracing::error!("Dashboard server error: {}", e),
            Err(e) => tracing::error!("Dashboard task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }

    db_pool.close().await;
    result?;
    tracing::info!("Shutdown complete");
    Ok(())
}
