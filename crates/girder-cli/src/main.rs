//! girder CLI — architecture rule checking over a persistent code graph.
//!
//! Subcommands: `lint` validates rule files, `check` evaluates them against
//! an analysis database, `stats` reports database counts. `RUST_LOG`
//! controls diagnostic output.

use clap::Parser;

mod cli_args;
mod commands;

use cli_args::{Cli, Commands};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("girder: {e:#}");
            2
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Lint { files } => commands::lint::run(&files, cli.json),
        Commands::Check { db, files } => {
            commands::check::run(&commands::resolve_db(db)?, &files, cli.json)
        }
        Commands::Stats { db } => commands::stats::run(&commands::resolve_db(db)?, cli.json),
    }
}
