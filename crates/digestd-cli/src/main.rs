mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "digestd-cli")]
#[command(about = "digestd command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// List active digests that are due now, grouped by frequency
    Due,
    /// Run one digest immediately, outside the schedule
    Run {
        /// Id of the digest to run
        digest_id: Uuid,
        /// Send to this address instead of the digest owner
        #[arg(long)]
        email: Option<String>,
    },
    /// Run one batch cycle over every due digest and print the report
    Cycle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = digestd_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool_config = digestd_db::PoolConfig::from_app_config(&config);
    let pool = digestd_db::connect_pool(&config.database_url, pool_config).await?;

    match cli.command {
        Commands::Migrate => commands::run_migrate(&pool).await,
        Commands::Due => commands::run_due(&pool).await,
        Commands::Run { digest_id, email } => {
            commands::run_digest(&config, pool, digest_id, email).await
        }
        Commands::Cycle => commands::run_cycle(&config, pool).await,
    }
}

#[cfg(test)]
mod tests;
