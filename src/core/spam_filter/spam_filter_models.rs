// Username spam filter domain models.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer converts serenity members/roles into these.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Snapshot of a server member as seen by the filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: u64,
    pub username: String,
    pub nickname: Option<String>,
    /// `name#1234`, or the bare name for accounts without a discriminator.
    pub tag: String,
    pub role_ids: HashSet<u64>,
    /// Whether the bot is able to ban this member.
    pub bannable: bool,
}

impl Member {
    /// The name other users see: nickname if set, otherwise username.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.username)
    }

    pub fn has_any_role(&self, role_ids: &HashSet<u64>) -> bool {
        self.role_ids.iter().any(|id| role_ids.contains(id))
    }
}

/// A server role resolved through the membership directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleRef {
    pub id: u64,
    pub name: String,
}

/// Server identity passed alongside every filter call.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerRef {
    pub id: u64,
    pub name: String,
}

/// Kind of row stored in the username spam filter collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterObjectType {
    /// Role whose holders form the impersonation reference set
    HighRankingRole,
    /// User that is never evaluated
    AllowlistUser,
    /// Role whose holders are never evaluated
    AllowlistRole,
}

impl FilterObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterObjectType::HighRankingRole => "HIGH_RANKING_ROLE",
            FilterObjectType::AllowlistUser => "ALLOWLIST_USER",
            FilterObjectType::AllowlistRole => "ALLOWLIST_ROLE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "HIGH_RANKING_ROLE" => Some(FilterObjectType::HighRankingRole),
            "ALLOWLIST_USER" => Some(FilterObjectType::AllowlistUser),
            "ALLOWLIST_ROLE" => Some(FilterObjectType::AllowlistRole),
            _ => None,
        }
    }
}

impl std::fmt::Display for FilterObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of filter configuration.
///
/// Unique per `(server_id, object_type, object_id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterEntry {
    pub server_id: u64,
    pub server_name: String,
    pub object_type: FilterObjectType,
    pub object_id: u64,
    pub object_name: String,
    pub created_at: DateTime<Utc>,
}

impl FilterEntry {
    pub fn new(
        server: &ServerRef,
        object_type: FilterObjectType,
        object_id: u64,
        object_name: impl Into<String>,
    ) -> Self {
        Self {
            server_id: server.id,
            server_name: server.name.clone(),
            object_type,
            object_id,
            object_name: object_name.into(),
            created_at: Utc::now(),
        }
    }

    /// A protected role row.
    pub fn protected_role(server: &ServerRef, role: &RoleRef) -> Self {
        Self::new(server, FilterObjectType::HighRankingRole, role.id, &role.name)
    }
}

/// Who an allowlist entry exempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowlistSubject {
    User,
    Role,
}

impl AllowlistSubject {
    pub fn object_type(&self) -> FilterObjectType {
        match self {
            AllowlistSubject::User => FilterObjectType::AllowlistUser,
            AllowlistSubject::Role => FilterObjectType::AllowlistRole,
        }
    }
}

/// Query against the config store. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFilter {
    pub server_id: Option<u64>,
    pub object_type: Option<FilterObjectType>,
    pub object_id: Option<u64>,
}

impl EntryFilter {
    pub fn server(server_id: u64) -> Self {
        Self {
            server_id: Some(server_id),
            ..Default::default()
        }
    }

    pub fn of_type(server_id: u64, object_type: FilterObjectType) -> Self {
        Self {
            server_id: Some(server_id),
            object_type: Some(object_type),
            object_id: None,
        }
    }

    pub fn exact(server_id: u64, object_type: FilterObjectType, object_id: u64) -> Self {
        Self {
            server_id: Some(server_id),
            object_type: Some(object_type),
            object_id: Some(object_id),
        }
    }

    pub fn matches(&self, entry: &FilterEntry) -> bool {
        self.server_id.map_or(true, |id| id == entry.server_id)
            && self.object_type.map_or(true, |t| t == entry.object_type)
            && self.object_id.map_or(true, |id| id == entry.object_id)
    }
}

/// Options for `insert_many`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertOptions {
    /// Treat a row that already exists as skipped instead of failed.
    pub tolerate_duplicate_key: bool,
}

/// Per-row result of an unordered bulk insert.
#[derive(Debug, Clone, Default)]
pub struct InsertReport {
    pub inserted: usize,
    pub duplicates: Vec<FilterEntry>,
    pub failed: Vec<(FilterEntry, String)>,
}

/// Which candidate field collided with a protected name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedField {
    Nickname,
    Username,
}

impl std::fmt::Display for MatchedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchedField::Nickname => write!(f, "nickname"),
            MatchedField::Username => write!(f, "username"),
        }
    }
}

/// Why a candidate was considered an impersonator.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchEvidence {
    pub field: MatchedField,
    pub normalized: String,
}

/// Everything configured for a server, for the status command.
#[derive(Debug, Clone, Default)]
pub struct FilterOverview {
    pub protected_roles: Vec<FilterEntry>,
    pub allowlisted_users: Vec<FilterEntry>,
    pub allowlisted_roles: Vec<FilterEntry>,
}

impl FilterOverview {
    pub fn from_entries(entries: Vec<FilterEntry>) -> Self {
        let mut overview = Self::default();
        for entry in entries {
            match entry.object_type {
                FilterObjectType::HighRankingRole => overview.protected_roles.push(entry),
                FilterObjectType::AllowlistUser => overview.allowlisted_users.push(entry),
                FilterObjectType::AllowlistRole => overview.allowlisted_roles.push(entry),
            }
        }
        overview
    }

    pub fn is_active(&self) -> bool {
        !self.protected_roles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_type_round_trips_through_its_stored_name() {
        for t in [
            FilterObjectType::HighRankingRole,
            FilterObjectType::AllowlistUser,
            FilterObjectType::AllowlistRole,
        ] {
            assert_eq!(FilterObjectType::parse(t.as_str()), Some(t));
        }
        assert_eq!(FilterObjectType::parse("SOMETHING_ELSE"), None);
    }

    #[test]
    fn entry_filter_ignores_unset_fields() {
        let server = ServerRef {
            id: 1,
            name: "Guild".to_string(),
        };
        let entry = FilterEntry::new(&server, FilterObjectType::AllowlistUser, 42, "joe");

        assert!(EntryFilter::server(1).matches(&entry));
        assert!(EntryFilter::of_type(1, FilterObjectType::AllowlistUser).matches(&entry));
        assert!(!EntryFilter::of_type(1, FilterObjectType::AllowlistRole).matches(&entry));
        assert!(!EntryFilter::exact(2, FilterObjectType::AllowlistUser, 42).matches(&entry));
    }

    #[test]
    fn display_name_prefers_nickname() {
        let mut member = Member {
            id: 1,
            username: "Pioneer".to_string(),
            nickname: None,
            tag: "Pioneer#1559".to_string(),
            role_ids: HashSet::new(),
            bannable: true,
        };
        assert_eq!(member.display_name(), "Pioneer");
        member.nickname = Some("0xLucas".to_string());
        assert_eq!(member.display_name(), "0xLucas");
    }
}
