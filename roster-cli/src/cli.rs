//! Command-line arguments.

use crate::config::Overrides;
use clap::{Parser, Subcommand, ValueEnum};
use roster_types::RecordForm;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(about = "Employee roster synced with a hosted database")]
pub struct Args {
    /// Path to a JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base URL of the hosted project
    #[arg(long, env = "ROSTER_URL")]
    pub url: Option<String>,

    /// Public API key
    #[arg(long, env = "ROSTER_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Table holding the roster
    #[arg(long)]
    pub table: Option<String>,

    /// Directory for the fallback cache
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// The config values this invocation overrides.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            url: self.url.clone(),
            key: self.key.clone(),
            table: self.table.clone(),
            cache_dir: self.cache_dir.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the roster
    List {
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },

    /// Add an employee
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        custom_id: String,

        #[arg(long, default_value = "")]
        age: String,

        #[arg(long, default_value = "")]
        salary: String,

        #[arg(long, default_value = "")]
        gender: String,
    },

    /// Delete an employee by id
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Print the roster and reprint it on every change
    Watch,
}

impl Command {
    /// The entry form of an `add` command.
    pub fn form(&self) -> Option<RecordForm> {
        match self {
            Self::Add {
                name,
                custom_id,
                age,
                salary,
                gender,
            } => Some(RecordForm {
                name: name.clone(),
                age: age.clone(),
                salary: salary.clone(),
                gender: gender.clone(),
                custom_id: custom_id.clone(),
            }),
            _ => None,
        }
    }
}

/// Output format of `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Table,
    Html,
}
