use std::path::Path;
use std::time::Duration;
use anyhow::{Context, Result};
use discoverable_services::config::Config;
use discoverable_services::Discoverable;

const DEFAULT_CONFIG_PATH: &str = "/etc/discoverable-services/discoverabled.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("discoverable_services=info,discoverabled=info")
            }),
        )
        .init();

    tracing::info!("Starting discoverabled");

    // Load config, falling back to defaults when the default path is absent
    let config_path = std::env::args().nth(1);
    let config = match config_path.as_deref() {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_PATH))?,
        None => {
            tracing::info!("No config at {}, using defaults", DEFAULT_CONFIG_PATH);
            Config::default()
        }
    };

    let discoverable = Discoverable::new(&config.registry.path);

    let services = discoverable
        .enumerate_services()
        .await
        .context("Failed to load service registry")?;
    tracing::info!(
        "Loaded {} service definitions from {}",
        services.len(),
        config.registry.path.display()
    );
    for service in &services {
        tracing::debug!("Service {} tags {:?}", service.identifier, service.tags);
    }

    if !config.discovery.find.is_empty() {
        let timeout = Duration::from_millis(config.discovery.timeout_ms);
        let found = discoverable
            .find_services(config.discovery.find.as_slice(), Some(timeout))
            .await
            .context("Failed to browse for services")?;

        tracing::info!("Found {} service instances", found.len());
        for instance in &found {
            println!("{}", serde_json::to_string(instance)?);
        }
    }

    if config.publish.is_empty() {
        return Ok(());
    }

    let published = discoverable
        .publish_services(&config.publish)
        .await
        .context("Failed to publish services")?;
    tracing::info!("Publishing {} of {} configured services", published, config.publish.len());

    // Wait for shutdown signal
    let signal = tokio::signal::ctrl_c().await;

    tracing::info!("Shutdown signal received");

    // Unpublish before surfacing any signal error so goodbyes still go out
    discoverable.unpublish_services().await;
    signal.context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutdown complete");
    Ok(())
}
