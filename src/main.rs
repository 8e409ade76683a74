//! `alter` command-line entry point.
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use alter_cli::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    let command = match &args.command {
        cli::Command::Provision(_) => "provision",
        cli::Command::Clean(_) => "clean",
        cli::Command::Version => {
            commands::version::run();
            return Ok(());
        }
    };
    logging::init_subscriber(args.verbose, command);
    let log = Arc::new(logging::Logger::new(command));

    match &args.command {
        cli::Command::Provision(opts) => commands::provision::run(&args.global, opts, &log),
        cli::Command::Clean(opts) => commands::clean::run(&args.global, opts, &log),
        cli::Command::Version => Ok(()),
    }
}
