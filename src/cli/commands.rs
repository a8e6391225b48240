use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sw", about = concat!("stepwise v", env!("CARGO_PKG_VERSION"), " - one small step at a time"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: $STEPWISE_CONFIG, then ./stepwise.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Task service base URL (overrides config and $STEPWISE_URL)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long = "log-file", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the task tree
    List(ListArgs),
    /// Add a task (as a root, or under --parent)
    Add(AddArgs),
    /// Change a task's title
    Title(TitleArgs),
    /// Mark a task and all its subtasks complete
    Done(IdArg),
    /// Mark a task and all its subtasks incomplete
    Undone(IdArg),
    /// Delete a task and its subtasks
    Rm(IdArg),
    /// Ask the service to break a task into subtasks
    Split(SplitArgs),
    /// Generate notes for a task
    Notes(IdArg),
    /// Delete every task
    Clear(ClearArgs),
    /// Check that the task service is reachable
    Status,
    /// Show or edit configuration
    Config(ConfigCmd),
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArgs {
    /// Print the last snapshot instead of asking the service
    #[arg(long)]
    pub cached: bool,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct IdArg {
    /// Task ID
    pub id: String,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// Parent task ID (default: add as a root task)
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Args)]
pub struct TitleArgs {
    /// Task ID
    pub id: String,
    /// New title
    pub title: String,
}

#[derive(Args)]
pub struct SplitArgs {
    /// Task ID
    pub id: String,
    /// Extra context passed to the service
    #[arg(long)]
    pub context: Option<String>,
}

#[derive(Args)]
pub struct ClearArgs {
    /// Confirm deleting every task
    #[arg(long)]
    pub yes: bool,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Set the task service base URL in the config file
    SetUrl(SetUrlArgs),
}

#[derive(Args)]
pub struct SetUrlArgs {
    /// Base URL, e.g. http://localhost:8000
    pub url: String,
}
