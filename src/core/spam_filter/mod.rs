// Core username spam filter module - impersonation detection business logic.
// Same layout as the other core features: models, ports, service.

pub mod config_workflow;
pub mod confusables;
pub mod directory;
pub mod match_engine;
pub mod moderation_actuator;
pub mod normalizer;
pub mod resolvers;
pub mod settings;
pub mod spam_filter_models;
pub mod spam_filter_service;
pub mod spam_filter_store;

#[cfg(test)]
pub mod test_support;

pub use config_workflow::*;
pub use confusables::ConfusableTable;
pub use directory::*;
pub use match_engine::MatchEngine;
pub use normalizer::NameNormalizer;
pub use resolvers::{ConfiguredRoleSource, FixedRoleSource, ProtectedRoleSource};
pub use settings::SpamFilterSettings;
pub use spam_filter_models::*;
pub use spam_filter_service::*;
pub use spam_filter_store::*;
