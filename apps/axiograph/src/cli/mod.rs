//! # Axiograph CLI Module
//!
//! This module implements the CLI interface for Axiograph.
//!
//! ## Available Commands
//!
//! - `audit` - Validate the graph and reconcile it against a corpus
//! - `validate` - Check graph invariants only
//! - `extract` - Show the equations extracted from one document
//!
//! Exit codes: `0` when the audit found no structural violation (and, under
//! `--strict`, no source-only equations); `1` otherwise. The report always
//! enumerates every finding — the exit code is a verdict, not a diagnostic.

mod commands;

use axiograph_core::AuditError;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Axiograph - Formula Audit Tool
///
/// Validates a formula knowledge graph against established physics and
/// reconciles document equations against the formula database.
#[derive(Parser, Debug)]
#[command(name = "axiograph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Report serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON (stable field order).
    Json,
    /// Markdown tables.
    Md,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full audit: graph validation plus corpus reconciliation
    Audit {
        /// Path to the formula-database snapshot (TOML)
        #[arg(short, long)]
        database: PathBuf,

        /// Directory holding the document corpus
        #[arg(short, long)]
        corpus: PathBuf,

        /// Output format
        #[arg(short = 't', long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Treat source-only equations as failures
        #[arg(long)]
        strict: bool,
    },

    /// Validate graph invariants of the snapshot only
    Validate {
        /// Path to the formula-database snapshot (TOML)
        #[arg(short, long)]
        database: PathBuf,

        /// Output format
        #[arg(short = 't', long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Extract equations from a single document (debug aid)
    Extract {
        /// Path to the document
        #[arg(short, long)]
        file: PathBuf,

        /// Output format
        #[arg(short = 't', long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments; returns the process exit code.
pub fn execute(cli: Cli) -> Result<i32, AuditError> {
    match cli.command {
        Commands::Audit {
            database,
            corpus,
            format,
            strict,
        } => cmd_audit(&database, &corpus, format, strict),
        Commands::Validate { database, format } => cmd_validate(&database, format),
        Commands::Extract { file, format } => cmd_extract(&file, format),
    }
}
