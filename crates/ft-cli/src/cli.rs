//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Focus tracker usage statistics.
///
/// Consolidates the focus tracker's day logs into activity records and
/// reports time per app, site, and category.
#[derive(Debug, Parser)]
#[command(name = "ft", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show loaded day logs and record counts.
    Status,

    /// Aggregate tracked time.
    Report {
        /// Dimension to group by (repeatable). Defaults to category.
        #[arg(short, long = "group-by", value_name = "TAG")]
        group_by: Vec<String>,

        /// Restrict records, e.g. `start_date=20240101` (repeatable).
        #[arg(short, long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
        filter: Vec<(String, String)>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage categories.
    #[command(subcommand)]
    Categories(CategoriesAction),
}

/// Category subcommands.
#[derive(Debug, Subcommand)]
pub enum CategoriesAction {
    /// List categories in display order.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Create an empty category.
    Create { name: String },

    /// Assign a site or app to a category.
    Set {
        identifier: String,
        category: String,

        /// The identifier is an app rather than a site.
        #[arg(long)]
        app: bool,
    },

    /// Remove a site or app from its category.
    Unset { identifier: String },

    /// Replace the display order. Every category must be named once.
    Reorder {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}
