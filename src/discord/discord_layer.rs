// Discord layer - commands and event handlers.

#[path = "spam_filter/mod.rs"]
pub mod spam_filter;

// Re-export command types for convenience
pub use spam_filter::commands::{Data, Error};
