use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod csv_source;

#[derive(Parser)]
#[command(name = "paper-trade")]
#[command(about = "Portfolio analytics and history maintenance", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh daily bar history for a set of symbols
    Refresh {
        /// Symbols to refresh, comma-separated
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,
        /// Also refresh the configured benchmark index
        #[arg(long)]
        benchmark: bool,
        /// Directory of per-symbol CSV quote files (offline quote source)
        #[arg(long)]
        data_dir: PathBuf,
    },
    /// Print chart analytics for a symbol as JSON
    Analytics {
        /// Symbol to analyze
        symbol: String,
    },
    /// Print a user's efficient-frontier payload as JSON
    Frontier {
        /// User whose holdings to optimize
        #[arg(long)]
        user: i64,
        /// Monte-Carlo trials (defaults to the configured value)
        #[arg(long)]
        trials: Option<usize>,
        /// Seed for reproducible simulation
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Refresh {
            symbols,
            benchmark,
            data_dir,
        } => commands::refresh(&symbols, benchmark, &data_dir).await,
        Commands::Analytics { symbol } => commands::analytics(&symbol).await,
        Commands::Frontier { user, trials, seed } => commands::frontier(user, trials, seed).await,
    }
}
