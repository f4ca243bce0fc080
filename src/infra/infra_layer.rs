// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "spam_filter/mod.rs"]
pub mod spam_filter;
