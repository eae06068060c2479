use std::path::PathBuf;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct CLI {
    /// Recipe file describing `[buildout]` locations and the parts to install
    #[clap(short, long, default_value = "recipe.toml", global = true)]
    pub(crate) config: PathBuf,
    /// Log debug output (overridden by `RUST_LOG`)
    #[clap(short, long, global = true)]
    pub(crate) verbose: bool,
    #[command(subcommand)]
    pub(crate) command: RecipeCommand,
}

#[derive(Debug, Subcommand, Clone, PartialEq)]
pub enum RecipeCommand {
    /// Fetches and unpacks the server if its install path is missing, then applies all configuration
    Install(PartArgs),
    /// Re-applies the `fms.ini` directives to an existing install
    Update(PartArgs),
    /// Removes the cached release archive and any leftover scratch directory
    Clean(LocationArgs),
}

#[derive(Debug, Args, Clone, PartialEq)]
pub struct PartArgs {
    /// Part (recipe table) to act on. Defaults to the only part, or `fms`
    #[clap(long)]
    pub part: Option<String>,
    #[command(flatten)]
    pub locations: LocationArgs,
}

/// Overrides for the `[buildout]` table.
#[derive(Debug, Args, Clone, PartialEq, Default)]
pub struct LocationArgs {
    /// Directory holding one install directory per part
    #[clap(long)]
    pub parts_dir: Option<PathBuf>,
    /// Directory the control script is published to
    #[clap(long)]
    pub bin_dir: Option<PathBuf>,
    /// Directory the release archive is cached and unpacked in
    #[clap(long)]
    pub download_cache: Option<PathBuf>,
}
