// Read-side lookups: who is exempt, and whose names are protected.

use super::directory::{DirectoryError, MemberDirectory};
use super::spam_filter_models::{EntryFilter, FilterObjectType, Member};
use super::spam_filter_store::{FilterConfigStore, StoreError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

pub struct AllowlistResolver<S: FilterConfigStore> {
    store: Arc<S>,
}

impl<S: FilterConfigStore> AllowlistResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn is_user_allowlisted(
        &self,
        server_id: u64,
        member_id: u64,
    ) -> Result<bool, StoreError> {
        let filter = EntryFilter::exact(server_id, FilterObjectType::AllowlistUser, member_id);
        Ok(!self.store.find_many(&filter).await?.is_empty())
    }

    pub async fn is_role_allowlisted(
        &self,
        server_id: u64,
        role_ids: &HashSet<u64>,
    ) -> Result<bool, StoreError> {
        if role_ids.is_empty() {
            return Ok(false);
        }
        let filter = EntryFilter::of_type(server_id, FilterObjectType::AllowlistRole);
        let allowlisted = self.store.find_many(&filter).await?;
        Ok(allowlisted.iter().any(|e| role_ids.contains(&e.object_id)))
    }
}

/// Where the set of high-ranking roles for a server comes from.
#[async_trait]
pub trait ProtectedRoleSource: Send + Sync {
    async fn protected_role_ids(&self, server_id: u64) -> Result<HashSet<u64>, StoreError>;
}

/// Roles configured per server through the configuration workflow.
pub struct ConfiguredRoleSource<S: FilterConfigStore> {
    store: Arc<S>,
}

impl<S: FilterConfigStore> ConfiguredRoleSource<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: FilterConfigStore> ProtectedRoleSource for ConfiguredRoleSource<S> {
    async fn protected_role_ids(&self, server_id: u64) -> Result<HashSet<u64>, StoreError> {
        let filter = EntryFilter::of_type(server_id, FilterObjectType::HighRankingRole);
        Ok(self
            .store
            .find_many(&filter)
            .await?
            .into_iter()
            .map(|e| e.object_id)
            .collect())
    }
}

/// A fixed role list, optionally limited to a single server.
pub struct FixedRoleSource {
    role_ids: HashSet<u64>,
    only_server: Option<u64>,
}

impl FixedRoleSource {
    pub fn new(role_ids: impl IntoIterator<Item = u64>, only_server: Option<u64>) -> Self {
        Self {
            role_ids: role_ids.into_iter().collect(),
            only_server,
        }
    }
}

#[async_trait]
impl ProtectedRoleSource for FixedRoleSource {
    async fn protected_role_ids(&self, server_id: u64) -> Result<HashSet<u64>, StoreError> {
        match self.only_server {
            Some(id) if id != server_id => Ok(HashSet::new()),
            _ => Ok(self.role_ids.clone()),
        }
    }
}

pub struct ProtectedRoleResolver<D: MemberDirectory> {
    source: Arc<dyn ProtectedRoleSource>,
    directory: Arc<D>,
}

impl<D: MemberDirectory> ProtectedRoleResolver<D> {
    pub fn new(source: Arc<dyn ProtectedRoleSource>, directory: Arc<D>) -> Self {
        Self { source, directory }
    }

    /// Empty means the filter is inactive for this server.
    pub async fn get_protected_role_ids(&self, server_id: u64) -> Result<HashSet<u64>, StoreError> {
        self.source.protected_role_ids(server_id).await
    }

    /// Current holders of any of `role_ids`.
    ///
    /// One fetch of the whole member list, filtered locally.
    pub async fn get_holders(
        &self,
        server_id: u64,
        role_ids: &HashSet<u64>,
    ) -> Result<Vec<Member>, DirectoryError> {
        let members = self.directory.fetch_all_members(server_id).await?;
        Ok(members
            .into_iter()
            .filter(|m| m.has_any_role(role_ids))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spam_filter::spam_filter_models::FilterEntry;
    use crate::core::spam_filter::test_support::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn user_allowlist_is_scoped_to_server() {
        let store = Arc::new(MockFilterStore::new());
        store.seed(FilterEntry::new(
            &server(),
            FilterObjectType::AllowlistUser,
            42,
            "joe",
        ));
        let resolver = AllowlistResolver::new(Arc::clone(&store));

        assert!(resolver.is_user_allowlisted(GUILD_ID, 42).await.unwrap());
        assert!(!resolver.is_user_allowlisted(GUILD_ID, 43).await.unwrap());
        assert!(!resolver.is_user_allowlisted(GUILD_ID + 1, 42).await.unwrap());
    }

    #[tokio::test]
    async fn role_allowlist_matches_any_held_role() {
        let store = Arc::new(MockFilterStore::new());
        store.seed(FilterEntry::new(
            &server(),
            FilterObjectType::AllowlistRole,
            LEVEL_2,
            "level 2",
        ));
        let resolver = AllowlistResolver::new(Arc::clone(&store));

        let held: HashSet<u64> = [LEVEL_4, LEVEL_2].into_iter().collect();
        assert!(resolver.is_role_allowlisted(GUILD_ID, &held).await.unwrap());

        let held: HashSet<u64> = [LEVEL_4].into_iter().collect();
        assert!(!resolver.is_role_allowlisted(GUILD_ID, &held).await.unwrap());
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let store = Arc::new(MockFilterStore::new());
        store.unavailable.store(true, Ordering::SeqCst);
        let resolver = AllowlistResolver::new(Arc::clone(&store));

        let result = resolver.is_user_allowlisted(GUILD_ID, 42).await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn configured_source_reads_high_ranking_rows_only() {
        let store = Arc::new(MockFilterStore::new());
        store.protect_roles(&server(), &[GENESIS_SQUAD, ADMIN_ROLE]);
        store.seed(FilterEntry::new(
            &server(),
            FilterObjectType::AllowlistRole,
            LEVEL_2,
            "level 2",
        ));
        let source = ConfiguredRoleSource::new(Arc::clone(&store));

        let ids = source.protected_role_ids(GUILD_ID).await.unwrap();
        assert_eq!(ids, [GENESIS_SQUAD, ADMIN_ROLE].into_iter().collect());
        assert!(source.protected_role_ids(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fixed_source_respects_server_scope() {
        let source = FixedRoleSource::new([GENESIS_SQUAD], Some(GUILD_ID));
        assert_eq!(source.protected_role_ids(GUILD_ID).await.unwrap().len(), 1);
        assert!(source.protected_role_ids(7).await.unwrap().is_empty());

        let unscoped = FixedRoleSource::new([GENESIS_SQUAD], None);
        assert_eq!(unscoped.protected_role_ids(7).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn holders_are_filtered_from_one_member_fetch() {
        let directory = Arc::new(MockDirectory::new(high_ranking_members()));
        let source: Arc<dyn ProtectedRoleSource> =
            Arc::new(FixedRoleSource::new([GENESIS_SQUAD, LEVEL_2], None));
        let resolver = ProtectedRoleResolver::new(source, Arc::clone(&directory));

        let roles = resolver.get_protected_role_ids(GUILD_ID).await.unwrap();
        let holders = resolver.get_holders(GUILD_ID, &roles).await.unwrap();

        let names: HashSet<String> = holders.into_iter().map(|m| m.username).collect();
        assert_eq!(
            names,
            ["0xLucas".to_string(), "ffffbanks".to_string()]
                .into_iter()
                .collect()
        );
        assert_eq!(directory.fetch_all_calls.load(Ordering::SeqCst), 1);
    }
}
