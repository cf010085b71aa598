//! Tallybook command-line client
//!
//! - `tallybook list`: print every expense record as JSON
//! - `tallybook add ...`: append one expense with a revision-checked write
//!
//! Exit codes: 0 on success, 2 when another writer committed first (re-run
//! the command), 1 on any other failure.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use tallybook_logging::{init_logging, LogConfig};
use tallybook_remote::{GithubContentsClient, ReqwestTransport};
use tallybook_store::{Expense, RecordStore, StoreConfig, StoreError};

const EXIT_FAILURE: u8 = 1;
const EXIT_CONFLICT: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "tallybook", version, about = "Shared travel budget kept in a GitHub repository")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, env = "TALLYBOOK_CONFIG", default_value = "tallybook.toml", global = true)]
    config: PathBuf,

    /// Debug-level logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs under ~/.tallybook/logs
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print all records as a JSON array
    List {
        /// Fail instead of printing an empty list when the document cannot be read
        #[arg(long)]
        strict: bool,
    },
    /// Append one expense
    Add(AddArgs),
}

#[derive(clap::Args, Debug)]
struct AddArgs {
    #[arg(long)]
    description: String,

    #[arg(long)]
    category: String,

    /// Amount in EUR
    #[arg(long)]
    eur: Decimal,

    /// Amount in USD
    #[arg(long)]
    usd: Decimal,

    /// Who paid; must be one of the configured parties
    #[arg(long)]
    payer: String,

    /// First party's share in EUR
    #[arg(long)]
    share_a: Decimal,

    /// Second party's share in EUR
    #[arg(long)]
    share_b: Decimal,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match init_logging(LogConfig {
        app_name: "tallybook",
        verbose: cli.verbose,
        log_to_file: cli.log_file,
    }) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Warning: logging unavailable: {:#}", err);
            None
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to start async runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<StoreError>() {
        Some(store_err) if store_err.is_conflict() => EXIT_CONFLICT,
        _ => EXIT_FAILURE,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = StoreConfig::load(&cli.config)?;
    let store = build_store(config)?;

    match cli.command {
        Commands::List { strict } => {
            let records = if strict {
                store.load_all().await?
            } else {
                store.load_all_or_empty().await
            };
            let json = serde_json::to_string_pretty(&records)
                .context("Failed to serialize records")?;
            println!("{}", json);
        }
        Commands::Add(args) => {
            let expense = expense_from_args(args, &store.config().parties)?;
            let commit = store.add_expense(&expense).await?;
            info!(
                "Committed {} after {} attempt(s)",
                commit.revision, commit.attempts
            );
            println!("{}", commit.revision);
        }
    }
    Ok(())
}

fn build_store(
    config: StoreConfig,
) -> Result<RecordStore<GithubContentsClient<ReqwestTransport>>> {
    let transport = match config.request_timeout() {
        Some(timeout) => ReqwestTransport::with_timeout(timeout)
            .context("Failed to build HTTP client")?,
        None => ReqwestTransport::new(),
    };
    let client = GithubContentsClient::new(transport, Arc::new(config.secret_provider()))
        .with_endpoints(config.endpoints());
    Ok(RecordStore::new(client, config)?)
}

fn expense_from_args(args: AddArgs, parties: &[String; 2]) -> Result<Expense> {
    if !parties.contains(&args.payer) {
        bail!(
            "Payer '{}' is not one of the configured parties ({} or {})",
            args.payer,
            parties[0],
            parties[1]
        );
    }
    Ok(Expense::new(
        args.description,
        args.category,
        args.eur,
        args.usd,
        args.payer,
        [args.share_a, args.share_b],
    ))
}
