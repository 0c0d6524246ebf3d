//! Subcommand implementations.

pub mod fees;
pub mod migrate;
