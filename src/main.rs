use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use proposal_anchor::anchor::anchor_proposal;
use proposal_anchor::config::Config;
use proposal_anchor::error::{AnchorError, Result};
use proposal_anchor::ledger::ethereum::EthereumLedger;
use proposal_anchor::ledger::LedgerClient;
use proposal_anchor::proposal::Proposal;
use proposal_anchor::storage::build_store;
use proposal_anchor::verify::{verify_anchor, VerificationResult};

#[derive(Parser)]
#[command(name = "proposal-anchor")]
#[command(about = "Anchor community proposals to a ledger with off-chain content storage")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Anchor a proposal: store it off-chain, commit its fingerprint on-chain
    Anchor {
        /// Path to a JSON file containing the proposal
        #[arg(long, short)]
        file: Option<PathBuf>,
        /// Read the proposal from stdin
        #[arg(long)]
        stdin: bool,
        /// Use the built-in example proposal
        #[arg(long)]
        example: bool,
        /// Write the anchor record to a JSON file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Verify a previously anchored proposal against the ledger record
    Verify {
        /// Ledger transaction id to verify
        transaction_id: String,
        /// Print the recovered proposal content
        #[arg(long)]
        show_proposal: bool,
        /// Write the verification result to a JSON file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Report ledger confirmation and store availability for an anchor
    Status {
        /// Ledger transaction id to check
        transaction_id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::from_env()?;
    let store = build_store(&config)?;
    let ledger = EthereumLedger::new(config.ethereum())?;

    match cli.command {
        Commands::Anchor {
            file,
            stdin,
            example,
            output,
        } => {
            let proposal = load_proposal(file, stdin, example)?;
            let missing = proposal.missing_required_fields();
            if !missing.is_empty() {
                return Err(AnchorError::MalformedDocument(format!(
                    "missing required fields: {}",
                    missing.join(", ")
                )));
            }

            let record = anchor_proposal(&proposal, store.as_ref(), &ledger).await?;

            println!("Proposal anchored");
            println!("  Transaction ID: {}", record.transaction_id);
            println!("  Storage:        {} ({})", record.storage_locator, record.storage);
            println!("  Fingerprint:    {}", record.fingerprint);
            if let Some(path) = output {
                write_json(&path, &record)?;
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Verify {
            transaction_id,
            show_proposal,
            output,
        } => {
            let result = match verify_anchor(&transaction_id, store.as_ref(), &ledger).await {
                Ok(result) => result,
                Err(e) => {
                    if let Some(path) = &output {
                        write_json(path, &VerificationResult::failure(&transaction_id, &e))?;
                    }
                    return Err(e);
                }
            };

            println!(
                "Verification: {}",
                if result.matched { "MATCH" } else { "MISMATCH" }
            );
            if let Some(recorded) = &result.recorded_fingerprint {
                println!("  Recorded:  {recorded}");
            }
            if let Some(recovered) = &result.recovered_fingerprint {
                println!("  Recovered: {recovered}");
            }
            if let Some(note) = &result.error {
                println!("  Note: {note}");
            }
            if show_proposal {
                if let Some(proposal) = &result.proposal {
                    println!("Recovered proposal:");
                    println!("{}", to_pretty(proposal)?);
                }
            }
            if let Some(path) = output {
                write_json(&path, &result)?;
            }

            Ok(if result.matched {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Commands::Status { transaction_id } => {
            match ledger.confirmation(&transaction_id).await? {
                Some(block) => println!("Ledger: confirmed in block {block}"),
                None => println!("Ledger: pending or unknown"),
            }
            match ledger.lookup(&transaction_id).await {
                Ok(metadata) => {
                    let available = store
                        .exists(&metadata.storage_locator)
                        .await
                        .unwrap_or(false);
                    println!(
                        "Store:  {} at {} ({})",
                        if available { "available" } else { "not retrievable" },
                        metadata.storage_locator,
                        metadata.storage
                    );
                }
                Err(AnchorError::TransactionNotFound(_)) => {
                    println!("Store:  no anchor metadata found");
                }
                Err(e) => return Err(e),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_proposal(file: Option<PathBuf>, stdin: bool, example: bool) -> Result<Proposal> {
    if example {
        let proposal = Proposal::example();
        println!("Using example proposal:");
        println!("{}", to_pretty(&proposal)?);
        Ok(proposal)
    } else if let Some(path) = file {
        Proposal::from_file(&path)
    } else if stdin {
        Proposal::from_reader(io::stdin().lock())
    } else {
        Err(AnchorError::Config(
            "specify a proposal source: --file, --stdin, or --example".into(),
        ))
    }
}

fn to_pretty<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| AnchorError::Serialization(e.to_string()))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    std::fs::write(path, to_pretty(value)?)?;
    println!("Results saved to {}", path.display());
    Ok(())
}
