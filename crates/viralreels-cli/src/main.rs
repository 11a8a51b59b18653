mod jobs;
mod reels;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::{jobs::JobsCommands, reels::ReelsCommands};

#[derive(Debug, Parser)]
#[command(name = "viralreels-cli")]
#[command(about = "Viral reels command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Create, advance and inspect scrape jobs
    Jobs {
        #[command(subcommand)]
        command: JobsCommands,
    },
    /// Query scored reels
    Reels {
        #[command(subcommand)]
        command: ReelsCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("viralreels-cli: run with --help to list commands");
        return Ok(());
    };

    let config = viralreels_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = viralreels_db::PoolConfig::from_app_config(&config);
    let pool = viralreels_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                viralreels_db::ping(&pool).await?;
                println!("database reachable");
            }
            DbCommands::Migrate => {
                let applied = viralreels_db::run_migrations(&pool).await?;
                println!("applied {applied} migration(s)");
            }
        },
        Commands::Jobs { command } => jobs::run(pool, &config, command).await?,
        Commands::Reels { command } => reels::run(&pool, command).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;
