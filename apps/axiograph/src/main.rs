//! # Axiograph - Formula Audit Tool
//!
//! The main binary for the Axiograph knowledge-graph audit pipeline.
//!
//! This application provides:
//! - Derivation-chain validation of a formula-database snapshot
//! - Equation extraction over a document corpus
//! - Cross-source reconciliation and stable report output
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                 apps/axiograph (THE BINARY)                │
//! │                                                            │
//! │  ┌─────────────┐   ┌──────────────┐   ┌────────────────┐  │
//! │  │    CLI      │   │ corpus walk  │   │ worker threads │  │
//! │  │   (clap)    │   │  (walkdir)   │   │  (extraction)  │  │
//! │  └──────┬──────┘   └──────┬───────┘   └────────┬───────┘  │
//! │         │                 │                    │          │
//! │         └─────────────────┼────────────────────┘          │
//! │                           ▼                               │
//! │                 ┌──────────────────┐                      │
//! │                 │  axiograph-core  │                      │
//! │                 │   (THE LOGIC)    │                      │
//! │                 └──────────────────┘                      │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Full audit: graph invariants plus corpus reconciliation
//! axiograph audit --database formulas.toml --corpus ./docs --format json
//!
//! # Graph invariants only
//! axiograph validate --database formulas.toml
//!
//! # Debug extraction of one document
//! axiograph extract --file docs/cosmology.md
//! ```

use axiograph::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Parse CLI arguments first so verbosity can shape the filter.
    let args = cli::Cli::parse();

    // Initialize tracing — AXIOGRAPH_LOG_FORMAT=json enables
    // machine-parseable output. The report goes to stdout; logs to stderr.
    let log_format = std::env::var("AXIOGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if args.verbose {
        "axiograph=debug,axiograph_core=debug"
    } else {
        "axiograph=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Execute command; the exit code carries the audit verdict.
    match cli::execute(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
