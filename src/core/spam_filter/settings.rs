// Runtime settings for the username spam filter, read from the environment.

use std::time::Duration;

/// The two people an auto-banned user is told to contact.
pub const DEFAULT_ESCALATION_CONTACTS: [u64; 2] = [198981821147381760, 197852493537869824];
pub const DEFAULT_DATABASE_PATH: &str = "data/spam_filter.db";
const DEFAULT_PROMPT_TIMEOUT_MINS: u64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct SpamFilterSettings {
    pub database_path: String,
    pub escalation_contacts: [u64; 2],
    pub prompt_timeout: Duration,
    /// When set, these roles are protected instead of the store-configured ones.
    pub fixed_roles: Option<Vec<u64>>,
    /// Limits the fixed role list to one server.
    pub fixed_guild: Option<u64>,
}

impl Default for SpamFilterSettings {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            escalation_contacts: DEFAULT_ESCALATION_CONTACTS,
            prompt_timeout: Duration::from_secs(DEFAULT_PROMPT_TIMEOUT_MINS * 60),
            fixed_roles: None,
            fixed_guild: None,
        }
    }
}

impl SpamFilterSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Malformed values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(path) = lookup("SPAM_FILTER_DATABASE").filter(|p| !p.trim().is_empty()) {
            settings.database_path = path.trim().to_string();
        }

        if let Some(raw) = lookup("SPAM_FILTER_ESCALATION_CONTACTS") {
            match parse_ids(&raw).as_deref() {
                Some([first, second]) => settings.escalation_contacts = [*first, *second],
                _ => tracing::warn!(
                    "SPAM_FILTER_ESCALATION_CONTACTS must be two comma-separated user ids, got {:?}",
                    raw
                ),
            }
        }

        if let Some(raw) = lookup("SPAM_FILTER_PROMPT_TIMEOUT_MINS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|mins| *mins > 0)
                .and_then(|mins| mins.checked_mul(60));
            match secs {
                Some(secs) => settings.prompt_timeout = Duration::from_secs(secs),
                None => tracing::warn!(
                    "Invalid SPAM_FILTER_PROMPT_TIMEOUT_MINS {:?}, using {} minutes",
                    raw,
                    DEFAULT_PROMPT_TIMEOUT_MINS
                ),
            }
        }

        if let Some(raw) = lookup("SPAM_FILTER_FIXED_ROLES").filter(|r| !r.trim().is_empty()) {
            match parse_ids(&raw) {
                Some(ids) if !ids.is_empty() => settings.fixed_roles = Some(ids),
                _ => tracing::warn!("Ignoring malformed SPAM_FILTER_FIXED_ROLES {:?}", raw),
            }
        }

        if let Some(raw) = lookup("SPAM_FILTER_FIXED_GUILD") {
            match raw.trim().parse::<u64>() {
                Ok(id) => settings.fixed_guild = Some(id),
                Err(_) => tracing::warn!("Ignoring malformed SPAM_FILTER_FIXED_GUILD {:?}", raw),
            }
        }

        settings
    }
}

fn parse_ids(raw: &str) -> Option<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> SpamFilterSettings {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SpamFilterSettings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        assert_eq!(settings_from(&[]), SpamFilterSettings::default());
    }

    #[test]
    fn reads_every_key() {
        let settings = settings_from(&[
            ("SPAM_FILTER_DATABASE", "/tmp/filter.db"),
            ("SPAM_FILTER_ESCALATION_CONTACTS", "1, 2"),
            ("SPAM_FILTER_PROMPT_TIMEOUT_MINS", "5"),
            ("SPAM_FILTER_FIXED_ROLES", "10,20,30"),
            ("SPAM_FILTER_FIXED_GUILD", "99"),
        ]);

        assert_eq!(settings.database_path, "/tmp/filter.db");
        assert_eq!(settings.escalation_contacts, [1, 2]);
        assert_eq!(settings.prompt_timeout, Duration::from_secs(300));
        assert_eq!(settings.fixed_roles, Some(vec![10, 20, 30]));
        assert_eq!(settings.fixed_guild, Some(99));
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let settings = settings_from(&[
            ("SPAM_FILTER_ESCALATION_CONTACTS", "1,2,3"),
            ("SPAM_FILTER_PROMPT_TIMEOUT_MINS", "soon"),
            ("SPAM_FILTER_FIXED_ROLES", "10,abc"),
            ("SPAM_FILTER_FIXED_GUILD", "-"),
        ]);

        assert_eq!(settings, SpamFilterSettings::default());
    }

    #[test]
    fn timeout_too_large_to_express_in_seconds_falls_back() {
        let settings = settings_from(&[("SPAM_FILTER_PROMPT_TIMEOUT_MINS", "18446744073709551615")]);
        assert_eq!(settings.prompt_timeout, SpamFilterSettings::default().prompt_timeout);

        let settings = settings_from(&[("SPAM_FILTER_PROMPT_TIMEOUT_MINS", "0")]);
        assert_eq!(settings.prompt_timeout, SpamFilterSettings::default().prompt_timeout);
    }
}
