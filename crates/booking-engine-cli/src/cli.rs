//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};

/// Deterministic appointment scheduling from JSON snapshots.
///
/// Reads a snapshot (availability and busy bookings, or a recurrence pattern)
/// from `--input` or stdin and prints the result as JSON on stdout.
#[derive(Debug, Parser)]
#[command(name = "booking-engine", version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a TOML config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List bookable slots for one day.
    Slots {
        /// Day to generate slots for (YYYY-MM-DD).
        #[arg(long)]
        date: NaiveDate,

        /// Service duration in minutes.
        #[arg(long)]
        duration: u32,

        /// Current instant (YYYY-MM-DDTHH:MM:SS); enables advance-notice filtering.
        #[arg(long)]
        now: Option<NaiveDateTime>,

        #[command(flatten)]
        overrides: PolicyOverrides,

        #[command(flatten)]
        input: InputArgs,
    },

    /// Re-check a chosen start and suggest alternatives on conflict.
    Check {
        /// Proposed start (YYYY-MM-DDTHH:MM:SS).
        #[arg(long)]
        start: NaiveDateTime,

        /// Service duration in minutes.
        #[arg(long)]
        duration: u32,

        #[command(flatten)]
        overrides: PolicyOverrides,

        #[command(flatten)]
        input: InputArgs,
    },

    /// Expand a recurrence pattern up to a horizon date.
    Expand {
        /// Last date to generate, inclusive (YYYY-MM-DD).
        #[arg(long)]
        up_to: NaiveDate,

        /// Override the iteration ceiling.
        #[arg(long)]
        max_iterations: Option<u32>,

        #[command(flatten)]
        input: InputArgs,
    },
}

/// Per-invocation overrides of the loaded policy.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct PolicyOverrides {
    /// Buffer minutes around existing bookings.
    #[arg(long)]
    pub buffer: Option<u32>,

    /// Minutes between candidate starts.
    #[arg(long)]
    pub granularity: Option<u32>,

    /// Minimum minutes of advance notice.
    #[arg(long)]
    pub notice: Option<u32>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct InputArgs {
    /// Read the JSON snapshot from this file instead of stdin.
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}
