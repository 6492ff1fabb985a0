use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "trail",
    about = "Trail: object-graph audit and diff engine",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with engine settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compare two snapshot files
    Diff(DiffArgs),
    /// Show the change history of one object
    Changelog(LogQueryArgs),
    /// Show the snapshot history of one object
    History(LogQueryArgs),
    /// Check the history of every object in a commit log
    Validate(LogArgs),
    /// List the objects recorded in a commit log
    Ids(LogArgs),
}

#[derive(Args)]
pub struct DiffArgs {
    /// Older snapshots: a JSON array of snapshots, a single snapshot or a commit
    pub left: PathBuf,
    /// Newer snapshots, same formats
    pub right: PathBuf,
    /// Also list the property values of new objects
    #[arg(long)]
    pub new_object_snapshot: bool,
}

#[derive(Args)]
pub struct LogArgs {
    /// Commit log written by a file repository
    #[arg(long, default_value = "trail.log")]
    pub log: PathBuf,
}

#[derive(Args)]
pub struct LogQueryArgs {
    #[command(flatten)]
    pub log: LogArgs,
    /// Global id, e.g. `Person/bob` or `Person/bob#address`
    pub id: String,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}
