//! CLI command definitions
//!
//! Defines the clap commands for the scenario runner CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::common::config::BackendKind;

#[derive(Subcommand)]
pub enum Commands {
    /// Run scenarios from YAML files
    Run {
        /// Scenario files, or directories containing *.yml / *.yaml files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Run the built-in to-do app suite
    Suite {
        #[command(flatten)]
        options: RunOptions,
    },
}

/// Options shared by every run command; unset flags fall back to the config file
#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// Browser backend to drive
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Address of the app under test (default: http://localhost:5500/)
    #[arg(long)]
    pub base_url: Option<String>,

    /// WebDriver server address (default: http://localhost:4444)
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// How long each locate or check is retried, in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Write a JSON report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Configuration file to use instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(long, short)]
    pub verbose: bool,
}
