//! fwsdk CLI - toolchain provisioning and firmware build wrapper

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Setup(args) => commands::setup::execute(args, cli.verbose),
        Commands::Build(args) => commands::build::execute(args, cli.verbose),
    }
}
