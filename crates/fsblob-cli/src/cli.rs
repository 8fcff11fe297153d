use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "fsblob",
    about = "Inspect and modify durable filesystem blob containers",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Store root directory
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Container path below the root, segments separated by '/'
    #[arg(long, global = true)]
    pub path: Option<String>,

    /// TOML configuration file (overrides --root)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Read/write buffer size in bytes
    #[arg(long, global = true)]
    pub buffer_size: Option<usize>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List blobs in the container
    Ls(LsArgs),
    /// Check whether a blob exists
    Exists(NameArgs),
    /// Write a blob's contents to stdout
    Cat(NameArgs),
    /// Durably write a blob from a file or stdin
    Put(PutArgs),
    /// Delete blobs (missing blobs are ignored)
    Rm(RmArgs),
    /// Atomically rename a blob; fails if the target exists
    Mv(MvArgs),
}

#[derive(Args)]
pub struct LsArgs {
    /// Only list blobs whose names start with this prefix
    #[arg(long)]
    pub prefix: Option<String>,
}

#[derive(Args)]
pub struct NameArgs {
    pub name: String,
}

#[derive(Args)]
pub struct PutArgs {
    pub name: String,
    /// Source file; stdin when omitted
    pub file: Option<PathBuf>,
    /// Stage under a temporary name and move into place
    #[arg(long)]
    pub atomic: bool,
}

#[derive(Args)]
pub struct RmArgs {
    #[arg(required = true)]
    pub names: Vec<String>,
}

#[derive(Args)]
pub struct MvArgs {
    pub source: String,
    pub target: String,
}
