//! Command handlers
//!
//! One module per user-facing command. Handlers take the resolved
//! configuration and report errors through `anyhow`.

pub mod audit;
pub mod canonicalize;
pub mod enrich;

// Re-export all command functions for easy access
pub use audit::*;
pub use canonicalize::*;
pub use enrich::*;
