//! CLI module for agentplane
//!
//! Provides command-line interface parsing and handling for the agentplane binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "agentplane.toml";

/// agentplane - agent workflow graph executor
///
/// Runs workflow graphs exported by a visual builder against configured
/// language models, REST APIs and an intent classifier.
#[derive(Parser, Debug)]
#[command(
    name = "agentplane",
    version,
    about = "agentplane - agent workflow graph executor",
    long_about = "Executes workflow graphs of typed nodes (llm, intent_extractor, if_else,\n\
                  switch, rest_api) joined by edges, threading one run state through them.",
    after_help = "EXAMPLES:\n    \
                  agentplane run --workflow flow.json --prompt \"refund order 42\"\n    \
                  agentplane run --workflow flow.json --state input.json --trace\n    \
                  agentplane validate --workflow flow.json\n    \
                  agentplane nodes\n    \
                  agentplane --config prod.toml config --validate"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a workflow and print the final run state as JSON
    Run {
        /// Workflow definition (JSON with `nodes` and `edges`)
        #[arg(short, long)]
        workflow: PathBuf,

        /// Initial run state (JSON object)
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Prompt placed in the initial state under `prompt`
        #[arg(short, long)]
        prompt: Option<String>,

        /// Also print the per-node step trace
        #[arg(long)]
        trace: bool,

        /// Abort the run after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Check a workflow definition without executing it
    Validate {
        /// Workflow definition (JSON with `nodes` and `edges`)
        #[arg(short, long)]
        workflow: PathBuf,
    },

    /// List registered node types and the capabilities they require
    Nodes,

    /// Show configuration information
    Config {
        /// Validate the configuration file
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
