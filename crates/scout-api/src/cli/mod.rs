//! Command-line interface definitions.

pub mod job;

use clap::{Parser, Subcommand};

/// Scout: durable AI research pipeline service.
#[derive(Debug, Parser)]
#[command(name = "scout", version, about)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit machine-readable JSON instead of tables.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the REST API server.
    Serve {
        /// Address to bind, e.g. 127.0.0.1:7400 (defaults to config).
        #[arg(long)]
        bind: Option<String>,

        /// Database URL override, e.g. sqlite:///tmp/scout.db.
        #[arg(long)]
        database: Option<String>,
    },

    /// Inspect job records.
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum JobCommands {
    /// Show one job with its logs.
    Show { id: String },

    /// List recent jobs, newest first.
    List {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}
