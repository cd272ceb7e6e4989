//! # folio-cli
//!
//! Command-line surface for Folio: clap command definitions, dispatch onto
//! the folder services, and table or JSON output.

pub mod commands;
pub mod output;

pub use commands::Cli;
