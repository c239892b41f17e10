//! Clap derive structures for the `emrscope` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. This file
//! is also compiled by `build.rs` for man page generation, so it may only
//! depend on `clap` and `clap_complete`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// emrscope -- browse EMR and Glue resources from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "emrscope",
    version,
    about = "Browse EMR clusters, serverless applications, and Glue catalogs",
    long_about = "Explore EMR on EC2 clusters, EMR on EKS virtual clusters, EMR Serverless\n\
        applications, and the Glue Data Catalog as one lazily expanded tree.\n\n\
        Resources are addressed by domain key and id path, for example:\n  \
        emrscope ls emr-ec2 j-2AXXXXXXGAPLF steps",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// AWS region (overrides config and AWS_REGION)
    #[arg(long, short = 'r', env = "EMRSCOPE_REGION", global = true)]
    pub region: Option<String>,

    /// Named AWS credential profile (overrides config and AWS_PROFILE)
    #[arg(long, short = 'p', env = "EMRSCOPE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Output format [default: table]
    #[arg(long, short = 'o', env = "EMRSCOPE_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Maximum items fetched per listing
    #[arg(long, env = "EMRSCOPE_PAGE_CAP", global = true)]
    pub page_cap: Option<usize>,

    /// Service endpoint override (local emulators)
    #[arg(long, env = "EMRSCOPE_ENDPOINT_URL", global = true, hide = true)]
    pub endpoint_url: Option<String>,

    /// Config file to use instead of the platform default
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List resource domains and their state filters
    #[command(alias = "d")]
    Domains,

    /// List the children of a node addressed by domain and id path
    Ls(LsArgs),

    /// Expand domains recursively and print the tree
    Tree(TreeArgs),

    /// Show detail for a single resource
    #[command(alias = "desc")]
    Describe(DescribeArgs),

    /// Show or edit the persisted per-domain state filters
    Filter(FilterArgs),

    /// Manage the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Browsing ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LsArgs {
    /// Domain key (see `emrscope domains`)
    pub domain: String,

    /// Id or name of each node below the domain root
    pub path: Vec<String>,
}

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Domain keys to expand (all domains when omitted)
    pub domains: Vec<String>,

    /// Levels to expand below each domain root
    #[arg(long, short = 'd', default_value = "2")]
    pub depth: usize,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Domain key (see `emrscope domains`)
    pub domain: String,

    /// Resource id (Glue tables are addressed as <database>/<table>)
    pub id: String,
}

// ── Filters ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FilterArgs {
    #[command(subcommand)]
    pub command: FilterCommand,
}

#[derive(Debug, Subcommand)]
pub enum FilterCommand {
    /// Show the effective filter of one or all filterable domains
    Show {
        /// Domain key
        domain: Option<String>,
    },

    /// Replace the allowed states (no states hides every resource)
    Set {
        /// Domain key
        domain: String,
        /// Allowed states
        states: Vec<String>,
    },

    /// Add states to the allowed set
    Allow {
        /// Domain key
        domain: String,
        /// States to allow
        #[arg(required = true)]
        states: Vec<String>,
    },

    /// Remove states from the allowed set
    Deny {
        /// Domain key
        domain: String,
        /// States to hide
        #[arg(required = true)]
        states: Vec<String>,
    },

    /// Forget the persisted filter and use the domain default
    Reset {
        /// Domain key
        domain: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the effective configuration
    Show,

    /// Write a starter config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
