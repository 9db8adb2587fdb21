mod demand;
mod sync;

use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "floradesk-cli")]
#[command(about = "Floradesk command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Mirror the shop's catalog and orders into the database.
    Sync {
        /// Fetch and reconcile only; print counts and write nothing.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print demand against captured supply for a delivery date.
    Demand {
        /// Delivery date, YYYY-MM-DD.
        #[arg(long)]
        date: NaiveDate,
        /// Earliest order creation time (local HH:MM, inclusive).
        #[arg(long)]
        start: Option<String>,
        /// Latest order creation time (local HH:MM, inclusive).
        #[arg(long)]
        end: Option<String>,
        /// Merge variant rows into one row per base product.
        #[arg(long)]
        by_product: bool,
        /// Only rows in this category.
        #[arg(long)]
        category: Option<String>,
    },
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations.
    Migrate,
    /// Check that the database answers.
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = floradesk_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    if let Commands::Sync { dry_run: true } = command {
        return sync::run_sync_dry_run(&config).await;
    }

    let pool_config = floradesk_db::PoolConfig::from_app_config(&config);
    let pool = floradesk_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Sync { .. } => sync::run_sync(&pool, &config).await,
        Commands::Demand {
            date,
            start,
            end,
            by_product,
            category,
        } => {
            let args = demand::DemandArgs {
                date,
                start,
                end,
                by_product,
                category,
            };
            demand::run_demand(&pool, &config, args).await
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = floradesk_db::run_migrations(&pool).await?;
            println!("migrations applied: {applied}");
            Ok(())
        }
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            floradesk_db::health_check(&pool).await?;
            println!("database ok");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests;
