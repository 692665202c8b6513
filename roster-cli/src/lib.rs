//! Command-line client for Roster.
//!
//! The `roster` binary lists, adds and deletes employees in the hosted
//! table, or watches it and reprints the roster on every change.

pub mod cli;
pub mod commands;
pub mod config;
pub mod prompt;

pub use cli::{Args, Command, Format};
pub use config::{Overrides, RosterConfig};
pub use prompt::TerminalPrompt;
