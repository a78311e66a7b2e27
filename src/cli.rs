//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// inkpost - A small markdown blog
#[derive(Debug, Parser)]
#[command(name = "inkpost")]
#[command(version)]
#[command(about = "A small markdown blog with a staff admin API", long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(long, short = 'c', global = true, default_value = "config.yml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Debug, Clone, Subcommand, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Apply pending database migrations and exit
    Migrate,

    /// Create a staff account for the admin API
    CreateStaff {
        #[arg(long)]
        username: String,

        #[arg(long, default_value = "")]
        email: String,

        /// Password, at least 8 characters
        #[arg(long, env = "INKPOST_STAFF_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

impl Cli {
    /// The subcommand to run, `serve` when none was given
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}
