use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arx")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Fetch code and data from anywhere, then place and run it", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Place a manifest's data, then run its code
    Run {
        /// Manifest file (.json or .toml)
        manifest: PathBuf,
    },

    /// Print a manifest in its simplest form
    Show {
        /// Manifest file (.json or .toml)
        manifest: PathBuf,
    },

    /// Interpret a single source and print its kind and literal form
    Source {
        /// URL, or a JSON one-key mapping such as '{"text": "echo hi"}'
        literal: String,

        /// Print a presigned HTTPS equivalent instead (S3 sources)
        #[arg(long)]
        sign: bool,

        /// Lifetime of the presigned URL in seconds
        #[arg(long, requires = "sign", value_name = "SECS")]
        expires: Option<u64>,
    },

    /// Fetch a single source and place it at a path
    Fetch {
        /// URL, or a JSON one-key mapping such as '{"text": "echo hi"}'
        literal: String,

        /// Where to place the content
        dest: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
