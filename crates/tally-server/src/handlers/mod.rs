//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod accounts;
pub mod categories;
pub mod imports;
pub mod recurring;
pub mod rules;
pub mod transactions;

// Re-export all handlers for use in router
pub use accounts::*;
pub use categories::*;
pub use imports::*;
pub use recurring::*;
pub use rules::*;
pub use transactions::*;
