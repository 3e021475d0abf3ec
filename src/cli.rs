use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "converge")]
#[command(version)]
#[command(about = "Declaratively reconcile remote API resources", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manifest listing the desired resources (TOML or JSON)
    #[arg(
        short,
        long,
        global = true,
        env = "CONVERGE_MANIFEST",
        default_value = "converge.toml"
    )]
    pub manifest: PathBuf,

    /// State file [default: ~/.local/state/converge/state.json]
    #[arg(long, global = true, env = "CONVERGE_STATE")]
    pub state: Option<String>,

    /// Adopt existing remote objects by uniqueName/friendlyName instead of creating duplicates
    #[arg(long, global = true, env = "FIND_BEFORE_CREATE")]
    pub find_before_create: bool,

    /// Give up on rate-limited calls once the next backoff would exceed this many milliseconds
    #[arg(
        long,
        global = true,
        env = "CONVERGE_MAX_BACKOFF_MS",
        default_value_t = 120_000
    )]
    pub max_backoff_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Preview what apply would change
    Plan(TargetArgs),

    /// Make remote resources match the manifest
    Apply(ApplyArgs),

    /// Re-read bound resources from the remote
    Refresh(TargetArgs),

    /// Delete every bound resource (supplied sids and replaceAndNotDelete are left in place)
    Destroy(TargetArgs),

    /// Show what the state file knows
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Only this resource: a name, a collection kind, or Kind.name
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only this resource: a name, a collection kind, or Kind.name
    pub target: Option<String>,

    /// Dry run - show what would be done
    #[arg(short, long)]
    pub dry_run: bool,
}
