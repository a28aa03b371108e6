mod import;
mod runs;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "jobsink-cli")]
#[command(about = "Job feed ingestion command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one import sweep across the configured (or given) feed URLs
    Import(ImportArgs),
    /// Inspect recorded import runs
    Runs {
        #[command(subcommand)]
        command: RunsCommand,
    },
    /// Apply pending database migrations
    Migrate,
}

#[derive(Debug, Args)]
struct ImportArgs {
    /// Feed URL to sweep; repeatable. Defaults to the configured feeds file.
    #[arg(long = "url")]
    urls: Vec<String>,
    /// Reconcile candidates inline instead of through the queue
    #[arg(long)]
    sync: bool,
}

#[derive(Debug, Subcommand)]
enum RunsCommand {
    /// List runs, newest first
    List {
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long, default_value_t = 20)]
        page_size: i64,
    },
    /// Aggregate statistics across all runs
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = jobsink_core::load_app_config()?;

    match cli.command {
        Commands::Import(args) => import::run(&config, args.urls, args.sync).await,
        Commands::Runs { command } => match command {
            RunsCommand::List { page, page_size } => runs::list(&config, page, page_size).await,
            RunsCommand::Stats => runs::stats(&config).await,
        },
        Commands::Migrate => migrate(&config).await,
    }
}

async fn migrate(config: &jobsink_core::AppConfig) -> anyhow::Result<()> {
    let pool = jobsink_db::connect_pool(
        &config.database_url,
        jobsink_db::PoolConfig::from_app_config(config),
    )
    .await?;
    let applied = jobsink_db::run_migrations(&pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}
