mod cli;
mod commands;
mod manifest;
mod paths;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use sourcekit::ErrorCategory;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    if let Err(err) = dispatch(&ctx, cli.command) {
        let hint = category(&err)
            .map(|category| format!("{}: {}", category.description(), category.advice()));
        ui::failure(&format!("{err:#}"), hint.as_deref());
        std::process::exit(1);
    }
}

fn dispatch(ctx: &Context, command: Command) -> Result<()> {
    match command {
        Command::Run { manifest } => commands::run::run(ctx, &manifest),
        Command::Show { manifest } => commands::show::run(&manifest),
        Command::Source {
            literal,
            sign,
            expires,
        } => commands::source::run(ctx, &literal, sign, expires),
        Command::Fetch { literal, dest } => commands::fetch::run(ctx, &literal, &dest),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "arx", &mut io::stdout());
            Ok(())
        }
    }
}

/// The error category of the first typed error in the chain, if any.
fn category(err: &anyhow::Error) -> Option<ErrorCategory> {
    err.chain().find_map(|cause| {
        cause
            .downcast_ref::<bundle::Error>()
            .map(bundle::Error::category)
            .or_else(|| {
                cause
                    .downcast_ref::<sourcekit::Error>()
                    .map(sourcekit::Error::category)
            })
    })
}
