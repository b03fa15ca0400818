mod process;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pricewatch")]
#[command(about = "Fetch product pages, extract prices, and report statistics")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch every record, extract its price, and store the results
    Process {
        /// Records file; defaults to `PRICEWATCH_RECORDS_PATH`
        #[arg(long)]
        records: Option<PathBuf>,

        /// Process into memory and print results without writing to the database
        #[arg(long)]
        dry_run: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show aggregate statistics over all stored results
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Show the most recently checked results
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },
    /// List recent batch runs
    Runs {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Database utilities
    Db {
        #[command(subcommand)]
        command: DbCommands,
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
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("pricewatch: no command given; run with --help for usage");
        return Ok(());
    };

    let config = pricewatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if let Commands::Process {
        records,
        dry_run: true,
        json,
    } = &command
    {
        let path = records.as_deref().unwrap_or(config.records_path.as_path());
        return process::run_process_dry(&config, path, *json, &shutdown_token()).await;
    }

    let pool_config = pricewatch_db::PoolConfig::from_app_config(&config);
    let pool = pricewatch_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Process { records, json, .. } => {
            let path = records.unwrap_or_else(|| config.records_path.clone());
            process::run_process(&pool, &config, &path, json, &shutdown_token()).await?;
        }
        Commands::Stats { json } => report::run_stats(&pool, json).await?,
        Commands::Recent { limit, json } => report::run_recent(&pool, limit, json).await?,
        Commands::Runs { limit } => report::run_runs(&pool, limit).await?,
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            pricewatch_db::ping(&pool).await?;
            println!("database ok");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = pricewatch_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
    }

    Ok(())
}

/// A token that is cancelled on Ctrl-C, so an in-flight batch stops cleanly.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; cancelling batch");
            trigger.cancel();
        }
    });
    token
}

/// Attempt to mark a batch run as failed, logging any secondary error.
async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: i64, message: String) {
    if let Err(mark_err) = pricewatch_db::fail_batch_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark batch run as failed"
        );
    }
}
