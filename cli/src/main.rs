// Copyright (c) 2026 Sweep Labs. MIT License.
// See LICENSE for details.

//! # SWEEP CLI
//!
//! Entry point for the `sweep` binary. Parses CLI arguments, initializes
//! logging, and drives the orchestrator library against its in-memory
//! collaborators. There is no real browser and no real network here; the
//! binary exists to demonstrate and smoke-test the library end to end.
//!
//! The binary supports three subcommands:
//!
//! - `demo`      — run a complete raw-keypair sweep on the in-memory ledger
//! - `deep-link` — print the outbound URL of a mobile connect round trip
//! - `version`   — print build version information

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use url::Url;

use sweep_orchestrator::browser::HeadlessBrowser;
use sweep_orchestrator::crypto::keys::AccountKeypair;
use sweep_orchestrator::ledger::{Address, InMemoryLedger, LedgerClient};
use sweep_orchestrator::orchestrator::{
    ConnectRequest, Orchestrator, OrchestratorConfig, TransferStatus,
};
use sweep_orchestrator::session::InMemorySessionStore;

use cli::{Commands, SweepCli};
use logging::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let args = SweepCli::parse();
    let format = LogFormat::from_str_lossy(&args.log_format);

    match args.command {
        Commands::Demo(args) => run_demo(args, format).await,
        Commands::DeepLink(args) => print_deep_link(args, format).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Seeds an account on the in-memory ledger, connects with its raw key,
/// and sweeps everything above the reserve to the destination.
async fn run_demo(args: cli::DemoArgs, format: LogFormat) -> Result<()> {
    logging::init_logging("sweep=info,sweep_orchestrator=info", format);

    let ledger = Arc::new(InMemoryLedger::new());
    let browser = Arc::new(HeadlessBrowser::new());
    let store = Arc::new(InMemorySessionStore::new());

    let account = AccountKeypair::generate();
    ledger.set_balance(account.address(), args.balance_lux);

    let destination = match &args.destination {
        Some(s) => Address::parse(s).context("destination is not a valid base58 address")?,
        None => AccountKeypair::generate().address(),
    };

    let orchestrator = Orchestrator::new(
        OrchestratorConfig {
            destination: Some(destination),
            ..OrchestratorConfig::default()
        },
        ledger.clone(),
        browser,
        store,
    );

    let pasted = serde_json::to_string(&account.to_secret_array().to_vec())
        .context("encoding demo key material")?;
    orchestrator
        .connect(ConnectRequest::RawKeypair { pasted })
        .await?;
    println!(
        "connected {} with {} lux",
        account.address().abbreviated(),
        orchestrator.balance_lux()
    );

    match orchestrator.transfer().await? {
        TransferStatus::Settled { tx_id } => {
            println!("swept at {}", chrono::Utc::now().to_rfc3339());
            println!("transaction: {}", tx_id.truncated());
            println!("remaining balance: {} lux", orchestrator.balance_lux());
            println!(
                "destination balance: {} lux",
                ledger.balance(&destination).await?
            );
        }
        TransferStatus::RedirectIssued => unreachable!("raw-keypair signing settles in-process"),
    }

    orchestrator.disconnect().await;
    Ok(())
}

/// Prints the deep-link URL a mobile connect would navigate to, using a
/// headless browser that records the navigation instead of performing it.
async fn print_deep_link(args: cli::DeepLinkArgs, format: LogFormat) -> Result<()> {
    logging::init_logging("sweep=warn,sweep_orchestrator=warn", format);

    let browser = HeadlessBrowser::new();
    browser.set_current_url(Url::parse(&args.page_url).context("invalid page URL")?);

    let orchestrator = Orchestrator::new(
        OrchestratorConfig::default(),
        Arc::new(InMemoryLedger::new()),
        Arc::new(browser.clone()),
        Arc::new(InMemorySessionStore::new()),
    );
    orchestrator.connect(ConnectRequest::DeepLink).await?;

    let url = browser
        .navigations()
        .first()
        .cloned()
        .context("no deep link was produced")?;
    println!("{}", url);
    Ok(())
}

fn print_version() {
    println!("sweep {}", env!("CARGO_PKG_VERSION"));
}
