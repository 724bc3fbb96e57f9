//! Werewolf game host, run end to end from the command line.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use werewolf_host::{GameHost, HostConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = HostConfig::from_env();

    // Comma-separated player names; missing seats get default names
    let names: Vec<String> = match std::env::var("WEREWOLF_NAMES") {
        Ok(raw) => raw
            .split(',')
            .map(|name| name.trim().to_string())
            .collect(),
        Err(_) => Vec::new(),
    };
    let seed: Option<u64> = std::env::var("WEREWOLF_SEED")
        .ok()
        .and_then(|raw| raw.parse().ok());

    info!("Starting a Werewolf game...");

    let host = GameHost::new(config);
    host.start_game(names, seed);
    host.run_full_cycle().await?;

    let state = host.snapshot();
    for line in &state.log {
        println!("{line}");
    }
    if let Some(winner) = state.winner {
        info!(winner = winner.display_name(), day = state.day, "finished");
    }

    // Full structured state on demand
    if std::env::var("WEREWOLF_DUMP_STATE").is_ok() {
        println!("{}", serde_json::to_string_pretty(&state)?);
    }

    Ok(())
}
