//! pagebridge - content data bridge with live reload for dev clients.

use anyhow::Result;
use clap::Parser;
use pagebridge::{
    cli::{Cli, Commands},
    client::{DataClient, resolve_cache_path},
    config::BridgeConfig,
    log,
    transform::{Transformer, load_objects},
    watch::serve_blocking,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Transform { .. } => run_transform(config),
        Commands::Serve { .. } => run_serve(config),
        Commands::Paths => run_paths(&config),
        Commands::Props { path } => run_props(&config, path),
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &Cli) -> Result<BridgeConfig> {
    let mut config = if cli.config.exists() {
        BridgeConfig::from_path(&cli.config)?
    } else {
        BridgeConfig::from_str("")?
    };
    config.update_with_cli(cli);
    config.validate()?;
    Ok(config)
}

/// One pipeline run: read the content input, transform, write the cache.
fn run_transform(config: BridgeConfig) -> Result<()> {
    let input = config.serve.input.clone();
    let transformer = Transformer::new(config);
    let objects = load_objects(&input)?;
    let data = transformer.transform(objects)?;
    log!(
        "transform";
        "{} objects reduced to {} pages",
        data.objects.len(),
        data.pages.len()
    );
    Ok(())
}

/// Bootstrap, transform, then watch the input and notify live clients.
fn run_serve(mut config: BridgeConfig) -> Result<()> {
    // Serving without the notifier defeats the point of the command.
    config.live_update.enable.get_or_insert(true);
    let mut transformer = Transformer::new(config);
    serve_blocking(&mut transformer)
}

fn run_paths(config: &BridgeConfig) -> Result<()> {
    for path in reader(config).list_page_paths()? {
        println!("{path}");
    }
    Ok(())
}

fn run_props(config: &BridgeConfig, path: &str) -> Result<()> {
    let props = reader(config).props_for_path(path)?;
    println!("{}", serde_json::to_string_pretty(&props)?);
    Ok(())
}

/// Read-side client honoring the cache file environment override.
fn reader(config: &BridgeConfig) -> DataClient {
    DataClient::new(
        resolve_cache_path(Some(config.cache.resolve())),
        config.mode,
    )
}
