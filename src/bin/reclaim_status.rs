use rent_reclaim::config::Config;
use rent_reclaim::db::{self, accounts, stats};
use rent_reclaim::models::now_millis;

const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

fn sol(lamports: u64) -> String {
    format!("{:.6} SOL", lamports as f64 / LAMPORTS_PER_SOL)
}

fn print_usage() {
    println!("Usage: reclaim-status <command>");
    println!();
    println!("Commands:");
    println!("  status   Bot summary: tracked accounts and reclaimed totals");
    println!("  stats    Latest per-cycle snapshot");
    println!("  list     Every tracked account");
    println!("  help     Show this message");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let command = std::env::args().nth(1).unwrap_or_else(|| "status".to_string());
    if command == "help" || command == "--help" || command == "-h" {
        print_usage();
        return Ok(());
    }

    dotenv::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| Config::default().database_url);
    let pool = match db::open_read_only(&database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Cannot open {}: {}", database_url, e);
            std::process::exit(1);
        }
    };

    match command.as_str() {
        "status" => {
            let store = stats::get_stats(&pool).await?;
            println!("Rent reclaim status ({})", database_url);
            println!("  Tracked accounts:   {}", store.total_tracked);
            println!("    active:           {}", store.active);
            println!("    inactive:         {}", store.inactive);
            println!("    reclaimed:        {}", store.reclaimed);
            println!("    error:            {}", store.errored);
            println!("  Successful reclaims: {}", store.successful_reclaims);
            println!("  Failed reclaims:     {}", store.failed_reclaims);
            println!("  Total reclaimed:     {}", sol(store.total_reclaimed_lamports));

            let due = accounts::due_for_check(&pool, u32::MAX, now_millis()).await?;
            println!("  Due for check now:   {}", due.len());
        }
        "stats" => match stats::get_latest_stats(&pool).await? {
            Some(snapshot) => {
                let age_secs = (now_millis() - snapshot.timestamp) / 1000;
                println!("Latest snapshot ({}s ago)", age_secs);
                println!("  Accounts monitored: {}", snapshot.accounts_monitored);
                println!("  Accounts reclaimed: {}", snapshot.accounts_reclaimed);
                println!("  Total reclaimed:    {}", sol(snapshot.total_reclaimed_lamports));
                println!("  RPC calls made:     {}", snapshot.rpc_calls_made);
                println!("  Errors:             {}", snapshot.errors_encountered);
            }
            None => println!("No snapshots recorded yet"),
        },
        "list" => {
            let records = accounts::get_all_accounts(&pool).await?;
            if records.is_empty() {
                println!("No tracked accounts");
            }
            for record in records {
                println!(
                    "{}  {:<9}  balance {}  reclaimed {}  errors {}",
                    record.address,
                    record.status.as_str(),
                    sol(record.balance),
                    sol(record.total_reclaimed),
                    record.error_count
                );
                if let Some(error) = record.last_error {
                    println!("    last error: {}", error);
                }
            }
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            pool.close().await;
            std::process::exit(2);
        }
    }

    pool.close().await;
    Ok(())
}
