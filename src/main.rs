mod cli;
mod config;
mod convert;
mod estimate_cmd;
mod identify_cmd;
mod logging;
mod simulate_cmd;
mod summarize_cmd;

use std::process;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Estimate(args) => estimate_cmd::run(args),
        Command::Identify(args) => identify_cmd::run(args),
        Command::Simulate(args) => simulate_cmd::run(args),
        Command::Summarize(args) => summarize_cmd::run(args),
    }
}
