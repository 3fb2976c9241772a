//! Utility functions module
//!
//! HTTP client construction, network error classification, retry logic and
//! table formatting for the CLI.

pub mod format;
pub mod network;
pub mod retry;

pub use format::*;
pub use network::*;
pub use retry::*;
