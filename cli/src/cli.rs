//! # CLI Interface
//!
//! Defines the command-line argument structure for the `sweep` binary
//! using `clap` derive. Supports three subcommands: `demo`, `deep-link`,
//! and `version`.

use clap::{Parser, Subcommand};

/// SWEEP wallet session and transfer orchestrator.
///
/// Drives the orchestrator library against in-memory collaborators for
/// demonstration and smoke-testing: run a complete sweep end to end, or
/// inspect the deep link a mobile connect would navigate to.
#[derive(Parser, Debug)]
#[command(
    name = "sweep",
    about = "SWEEP wallet session & transfer orchestrator",
    version,
    propagate_version = true
)]
pub struct SweepCli {
    /// Log output format: "pretty" or "json".
    #[arg(long, env = "SWEEP_LOG_FORMAT", default_value = "pretty", global = true)]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the sweep binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a complete sweep against the in-memory ledger: seed an account,
    /// connect with a raw keypair, transfer, print the receipt.
    Demo(DemoArgs),
    /// Print the deep-link URL a mobile wallet connect would navigate to.
    DeepLink(DeepLinkArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `demo` subcommand.
#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Starting balance of the demo account, in lux.
    #[arg(long, default_value_t = 150_000)]
    pub balance_lux: u64,

    /// Destination address (base58). A throwaway address is generated
    /// when omitted.
    #[arg(long, env = "SWEEP_DESTINATION")]
    pub destination: Option<String>,
}

/// Arguments for the `deep-link` subcommand.
#[derive(Parser, Debug)]
pub struct DeepLinkArgs {
    /// The page URL the wallet should redirect back to.
    #[arg(long, default_value = "https://app.sweep.example/")]
    pub page_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        SweepCli::command().debug_assert();
    }
}
