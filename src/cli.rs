use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::CommandKind;

/// Index and explore the aliases, functions and exports buried in your dotfiles
///
/// Configure the files to scan and the categories to classify them with, then run `dotdex index` whenever your
/// dotfiles change; user edits like hidden commands or custom descriptions survive re-indexing.
#[derive(Parser)]
#[cfg_attr(debug_assertions, derive(Debug))]
#[command(author, version, verbatim_doc_comment, infer_subcommands = true, subcommand_required = true)]
pub struct Cli {
    /// Path to an alternative configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Command to be executed
    #[command(subcommand)]
    pub process: CliProcess,
}

#[derive(Subcommand)]
#[cfg_attr(debug_assertions, derive(Debug))]
pub enum CliProcess {
    /// Scans the configured files and reconciles the index
    ///
    /// New constructs are added, changed ones updated and disappeared ones removed (or tombstoned, per config), while
    /// hidden flags and custom descriptions or categories are preserved
    Index(IndexProcess),

    /// Lists indexed commands
    List(ListProcess),

    /// Searches indexed commands with a regex
    Search(SearchProcess),

    /// Hides commands so they don't show up on listings
    Hide(SelectArgs),

    /// Unhides previously hidden commands
    Unhide(SelectArgs),

    /// Edits the description or category of a command
    ///
    /// Values set here are marked as custom and survive re-indexing; clearing them reverts to the auto-derived value
    /// on the next run
    Edit(EditProcess),

    /// Shows everything known about a command
    ///
    /// When the command is not on the index, an explanation is looked up on mankier.com instead
    Explain(ExplainProcess),

    /// Shows the configuration file in use
    Config(ConfigProcess),
}

/// Scans the configured files and reconciles the index
#[derive(Args, Debug)]
pub struct IndexProcess {}

/// Lists indexed commands
#[derive(Args, Debug)]
pub struct ListProcess {
    /// Only list commands assigned to this category
    #[arg(short = 'c', long)]
    pub category: Option<String>,

    /// Only list commands of this kind
    #[arg(short = 'k', long, value_enum)]
    pub kind: Option<CommandKind>,

    /// List hidden commands only
    #[arg(long, conflicts_with = "all")]
    pub hidden: bool,

    /// Include hidden and orphaned commands
    #[arg(short = 'a', long)]
    pub all: bool,
}

/// Searches indexed commands with a regex
#[derive(Args, Debug)]
pub struct SearchProcess {
    /// Regex to search with
    pub pattern: String,

    /// Which command field to search on
    #[arg(short = 't', long, value_enum, default_value_t = SearchTarget::Code)]
    pub target: SearchTarget,

    /// Include hidden commands on the results
    #[arg(long)]
    pub hidden: bool,
}

/// The command field a search runs against
#[derive(ValueEnum, Copy, Clone, PartialEq, Eq, Debug)]
pub enum SearchTarget {
    /// The command code
    Code,
    /// The command name
    Name,
}

/// Selects one or more commands by name
#[derive(Args, Debug)]
pub struct SelectArgs {
    /// Name of the command
    pub name: String,

    /// Narrow down to commands of this kind
    #[arg(short = 'k', long, value_enum)]
    pub kind: Option<CommandKind>,

    /// Narrow down to commands defined on this file
    #[arg(short = 'f', long)]
    pub file: Option<String>,
}

/// Edits the description or category of a command
#[derive(Args, Debug)]
#[command(group(
    clap::ArgGroup::new("action")
        .required(true)
        .multiple(true)
        .args(["description", "category", "clear_description", "clear_category"]),
))]
pub struct EditProcess {
    /// The command to edit
    #[command(flatten)]
    pub select: SelectArgs,

    /// Sets a custom description
    #[arg(short = 'd', long, conflicts_with = "clear_description")]
    pub description: Option<String>,

    /// Assigns a custom category
    #[arg(short = 'c', long, conflicts_with = "clear_category")]
    pub category: Option<String>,

    /// Reverts the description to the auto-derived one on the next indexing run
    #[arg(long)]
    pub clear_description: bool,

    /// Reverts the category to the auto-derived one on the next indexing run
    #[arg(long)]
    pub clear_category: bool,
}

/// Shows everything known about a command
#[derive(Args, Debug)]
pub struct ExplainProcess {
    /// Name of the command
    pub name: String,
}

/// Shows the configuration file in use
#[derive(Args, Debug)]
pub struct ConfigProcess {}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_asserts() {
        Cli::command().debug_assert()
    }
}
