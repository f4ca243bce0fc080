// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "spam_filter/mod.rs"]
pub mod spam_filter;
