use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "girder",
    version,
    about = "Architecture rule checking over a persistent code graph"
)]
pub struct Cli {
    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse and validate rule files without evaluating them
    Lint {
        /// Rule files (textual DSL or declarative JSON)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Evaluate rule files against an analysis database
    Check {
        /// Path to the analysis database; defaults to the current
        /// directory's database under the OS user cache directory
        #[arg(long, env = "GIRDER_DB")]
        db: Option<PathBuf>,
        /// Rule files (textual DSL or declarative JSON)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print analysis database statistics
    Stats {
        /// Path to the analysis database; defaults to the current
        /// directory's database under the OS user cache directory
        #[arg(long, env = "GIRDER_DB")]
        db: Option<PathBuf>,
    },
}
