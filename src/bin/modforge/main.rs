//! modforge CLI - block scaffolding for out-of-tree modules

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use modforge::util::Shell;

mod cli;
mod commands;

use cli::{Cli, Commands};

/// Options shared by every command.
pub struct GlobalOptions {
    pub shell: Shell,
}

fn main() {
    if let Err(e) = run() {
        // Diagnostics of library errors are printed where they occur
        if e.downcast_ref::<commands::Reported>().is_none() {
            eprintln!("error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("modforge=debug")
    } else if cli.quiet {
        EnvFilter::new("modforge=error")
    } else {
        EnvFilter::new("modforge=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let json = match &cli.command {
        Commands::Add(args) => args.json,
        Commands::Info(args) => args.json,
        Commands::Completions(_) => false,
    };
    let global_opts = GlobalOptions {
        shell: Shell::from_flags(cli.quiet, cli.verbose, cli.color, json),
    };

    // Execute command
    match cli.command {
        Commands::Add(args) => commands::add::execute(args, &global_opts),
        Commands::Info(args) => commands::info::execute(args, &global_opts),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
