//! Configuration management module
//!
//! This module handles configuration loading, validation, and persistence
//! from environment variables, configuration files and default values.

pub mod settings;

pub use settings::*;
