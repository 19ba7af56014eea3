//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};

use crate::ports::cache::{SortDirection, SortField};

/// Top-level CLI parser for `gitdiagram`.
#[derive(Debug, Parser)]
#[command(
    name = "gitdiagram",
    version,
    about = "Turn a GitHub repository into an architecture diagram"
)]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// A repository on GitHub.
#[derive(Debug, Clone, Args)]
pub struct RepoArgs {
    /// Repository owner (user or organisation).
    pub owner: String,
    /// Repository name.
    pub repo: String,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the diagram for a repository, generating it if the cache is stale.
    Generate(RepoArgs),
    /// Change an existing diagram according to instructions.
    Modify {
        #[command(flatten)]
        repo: RepoArgs,
        /// What to change.
        instructions: String,
    },
    /// Generate the diagram again from scratch.
    Regenerate {
        #[command(flatten)]
        repo: RepoArgs,
        /// Extra instructions for the new generation.
        #[arg(long, default_value = "")]
        instructions: String,
    },
    /// List cached diagrams.
    Cache {
        /// Column to sort by (`repository` or `updated_at`).
        #[arg(long, default_value = "updated_at")]
        sort: SortField,
        /// Sort direction (`asc` or `desc`).
        #[arg(long, default_value = "desc")]
        direction: SortDirection,
        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Rows per page.
        #[arg(long, default_value_t = 20)]
        page_size: usize,
        /// Only show repositories whose `owner/repo` contains this text.
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Manage locally stored keys.
    #[command(subcommand)]
    Key(KeyCommand),
}

/// `gitdiagram key` subcommands.
#[derive(Debug, Subcommand)]
pub enum KeyCommand {
    /// Store a model API key; with `--retry`, regenerate a repository with it.
    SetApiKey {
        /// The API key.
        key: String,
        /// Repository to regenerate with the new key (`OWNER REPO`).
        #[arg(long, num_args = 2, value_names = ["OWNER", "REPO"])]
        retry: Option<Vec<String>>,
    },
    /// Store a GitHub personal access token for private repositories.
    SetPat {
        /// The token.
        pat: String,
    },
    /// Forget all stored keys.
    Clear,
}
