//! Command-line interface module
//!
//! Argument parsing and command dispatch for the `kvc` binary.

pub mod commands;

pub use commands::*;
