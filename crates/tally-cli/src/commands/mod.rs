//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - init/accounts/status and shared utilities (open_db)
//! - `import` - Statement import command
//! - `recurring` - Recurring transaction processing
//! - `serve` - Web server command

pub mod core;
pub mod import;
pub mod recurring;
pub mod serve;

// Re-export command functions for main.rs
pub use core::*;
pub use import::*;
pub use recurring::*;
pub use serve::*;
