//! CLI argument parsing for cargotruck

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ct")]
#[command(author, version, about = "Cross-process cargo exchange", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Channel name (overrides config)
    #[arg(long, global = true)]
    pub channel: Option<String>,

    /// Base directory for channels (overrides config)
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load values and deliver them to an address
    Send {
        /// Address to deliver to
        #[arg(required = true)]
        address: String,

        /// Integer values to load
        #[arg(short, long = "int")]
        ints: Vec<i64>,

        /// Text values to load
        #[arg(short, long = "text")]
        texts: Vec<String>,
    },

    /// Wait for a delivery at an address and print what arrived
    Receive {
        /// Address to wait on
        #[arg(required = true)]
        address: String,

        /// Timeout in milliseconds (default: from config, 5000)
        #[arg(short = 'w', long)]
        timeout: Option<u64>,
    },

    /// Show what is published at an address without consuming it
    Peek {
        /// Address to inspect
        #[arg(required = true)]
        address: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List published addresses
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete the snapshot at an address
    Clear {
        /// Address to clear
        #[arg(required = true)]
        address: String,
    },
}
