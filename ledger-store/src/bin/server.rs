//! Nexus store server binary

use ledger_store::{Config, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Nexus ledger store");

    // Load configuration
    let config = Config::from_env()?;

    // Open store (seeds on first open)
    let store = Store::open(config).await?;
    let stats = store.stats()?;
    tracing::info!(
        users = stats.total_users,
        transactions = stats.total_transactions,
        withdrawals = stats.total_withdrawals,
        "Store opened"
    );

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down store");
    store.shutdown().await?;
    Ok(())
}
