//! todo-e2e - End-to-end scenario runner for the to-do app
//!
//! Runs declarative scenarios against the app, either through an in-process
//! simulated browser or a real browser driven over WebDriver.

use clap::Parser;
use commands::Commands;
use todo_e2e::common::logging;
use todo_e2e::{cli, commands};

#[derive(Parser)]
#[command(name = "todo-e2e", about = "End-to-end scenario runner for the to-do app")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Run { options, .. } | Commands::Suite { options } => options.verbose,
    };
    logging::init_cli(verbose);

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
