//! Relay server binary.
//!
//! Usage: `relay-server [config-path]`
//!
//! The config path may also come from `RELAY_CONFIG`; it defaults to
//! `config/relay.json`. Ctrl-C runs the graceful shutdown sequence.

use tracing::info;

use relay_server::{server, Config, Observers};

const DEFAULT_CONFIG_PATH: &str = "config/relay.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_server=info,relay_core=info".into()),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("RELAY_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = Config::from_file(&config_path)?;
    let mut handle = server::start(config, Observers::default()).await?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Got SIGINT");
        }
        _ = handle.stopped() => {
            // Lifecycle shutdown (game over, everyone left).
            info!("Relay shut down");
            return Ok(());
        }
    }

    handle.stop().await;
    Ok(())
}
