mod binding;
mod cli;
mod commands;
mod config;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use declarative::{BackoffConfig, ProviderConfig};
use state::StateFile;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub manifest_path: PathBuf,
    pub state_path: PathBuf,
    pub provider: ProviderConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
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

    let backoff =
        BackoffConfig::default().with_max_delay(Duration::from_millis(cli.max_backoff_ms));
    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        manifest_path: cli.manifest,
        state_path: StateFile::resolve_path(cli.state.as_deref())?,
        provider: ProviderConfig::default()
            .with_find_before_create(cli.find_before_create)
            .with_backoff(backoff),
    };

    match cli.command {
        Command::Plan(args) => commands::plan::run(&ctx, args.target.as_deref()).await,
        Command::Apply(args) => {
            commands::apply::run(&ctx, args.target.as_deref(), args.dry_run).await
        }
        Command::Refresh(args) => commands::refresh::run(&ctx, args.target.as_deref()).await,
        Command::Destroy(args) => commands::destroy::run(&ctx, args.target.as_deref()).await,
        Command::Status => commands::status::run(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "converge", &mut io::stdout());
            Ok(())
        }
    }
}
