//! kvc - command-line client for the Azure Key Vault REST API

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keyvault_client::cli::{exit_code, Cli};
use keyvault_client::config::load_config_no_validation;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config_no_validation().await?;
    init_logging(cli.debug || config.debug);
    info!("Starting kvc");

    if let Err(e) = cli.execute(config).await {
        error!("Error: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(&e));
    }

    Ok(())
}

fn init_logging(debug: bool) {
    let default_filter = if debug {
        "keyvault_client=debug,kvc=debug"
    } else {
        "keyvault_client=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
