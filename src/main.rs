//! Command-line interface for basket-loadgen
//!
//! # Usage Examples
//!
//! ```bash
//! # Run the dev environment from the conf directory
//! basket-loadgen run --env dev --config-dir conf
//!
//! # Credentials come from flags or the environment
//! SASL_USERNAME=key SASL_PASSWORD=secret basket-loadgen run --env prod --config-dir conf
//!
//! # Fixed seed and iteration count
//! basket-loadgen run --config-dir conf --seed 42 --iterations 500
//! ```

use anyhow::Context;
use basket_loadgen::logging::init_tracing;
use basket_loadgen::{app, Config, Credentials};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "basket-loadgen")]
#[command(about = "Generate retail basket and payment events into Kafka and MongoDB")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and deliver basket/payment pairs
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Environment name; selects {env}_app.json, {env}_kafka.json and {env}_mongo.json
    #[arg(long, default_value = "dev")]
    env: String,

    /// Directory holding the configuration files
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Kafka SASL username
    #[arg(long, env = "SASL_USERNAME")]
    sasl_username: Option<String>,

    /// Kafka SASL password
    #[arg(long, env = "SASL_PASSWORD", hide_env_values = true)]
    sasl_password: Option<String>,

    /// Schema registry basic-auth password
    #[arg(long, env = "SCHEMA_REGISTRY_PASSWORD", hide_env_values = true)]
    schema_registry_password: Option<String>,

    /// MongoDB username
    #[arg(long, env = "MONGO_USERNAME")]
    mongo_username: Option<String>,

    /// MongoDB password
    #[arg(long, env = "MONGO_PASSWORD", hide_env_values = true)]
    mongo_password: Option<String>,

    /// Seed every random draw (overrides rng_seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Iterations to run, 0 for unbounded (overrides test_size)
    #[arg(long)]
    iterations: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let credentials = Credentials {
                sasl_username: args.sasl_username,
                sasl_password: args.sasl_password,
                schema_registry_password: args.schema_registry_password,
                mongo_username: args.mongo_username,
                mongo_password: args.mongo_password,
            };
            let mut config = Config::load(&args.config_dir, &args.env, credentials)
                .with_context(|| format!("Failed to load '{}' configuration", args.env))?;
            if let Some(seed) = args.seed {
                config.general.rng_seed = Some(seed);
            }
            if let Some(iterations) = args.iterations {
                config.general.test_size = iterations;
            }

            init_tracing(config.general.debug_level);
            info!("Starting basket-loadgen with environment '{}'", args.env);

            let cancel = setup_shutdown_handler();
            app::run(config, cancel).await?;
        }
    }

    Ok(())
}

/// Cancel the returned token on Ctrl+C.
fn setup_shutdown_handler() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            return;
        }
        info!("Received interrupt signal (Ctrl+C), finishing current record");
        token.cancel();
    });

    cancel
}
