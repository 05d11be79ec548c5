//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "avscout")]
#[command(about = "Identify video files and gather their catalog metadata", long_about = None)]
pub(crate) struct Cli {
    /// Settings file (defaults to the per-user config location)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Only show warnings and errors (suppress normal output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Show the catalog identity derived from file names or paths
    Id {
        /// File names or paths
        #[arg(required = true)]
        names: Vec<PathBuf>,
    },

    /// Group the video files under a directory into movies
    Scan {
        dir: PathBuf,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve the base URL a site would use this run
    Mirrors {
        site: String,

        /// URL to fall back to when no mirror answers
        #[arg(long)]
        default: Option<String>,
    },

    /// Scan a directory and collect metadata for every movie
    Aggregate {
        dir: PathBuf,

        /// Print every aggregation as JSON
        #[arg(long)]
        json: bool,

        /// Do not write a run log
        #[arg(long)]
        no_log: bool,
    },

    /// Manage the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Print the settings file path
    Path,

    /// Print the effective settings
    Show,

    /// Write a commented default settings file
    Init,
}
