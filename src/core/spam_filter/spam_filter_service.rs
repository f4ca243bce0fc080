// Username spam filter service - entry point for membership events.
//
// This service handles:
// - Skip checks (not bannable, allowlisted user, allowlisted role)
// - Resolving the protected cohort for the server
// - Matching and enforcement
// - Allowlist maintenance (manual, and automatic on unban)
//
// NO Discord dependencies here - just pure domain logic.

use super::directory::{DirectoryError, MemberDirectory};
use super::match_engine::MatchEngine;
use super::moderation_actuator::ModerationActuator;
use super::resolvers::{AllowlistResolver, ProtectedRoleResolver, ProtectedRoleSource};
use super::spam_filter_models::{
    AllowlistSubject, EntryFilter, FilterEntry, FilterOverview, InsertOptions, Member, ServerRef,
};
use super::spam_filter_store::{FilterConfigStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
}

/// Why a member was not evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotBannable,
    AllowlistedUser,
    AllowlistedRole,
    FilterInactive,
    ProtectedRoleHolder,
}

/// What the filter decided for one membership event.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterVerdict {
    Skipped(SkipReason),
    Clean,
    /// A match was found and enforcement attempted.
    Banned,
}

impl FilterVerdict {
    /// The entry point's boolean: `true` iff the member was matched and enforcement attempted.
    pub fn banned(&self) -> bool {
        matches!(self, FilterVerdict::Banned)
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct UsernameSpamFilter<S: FilterConfigStore, D: MemberDirectory> {
    store: Arc<S>,
    allowlist: AllowlistResolver<S>,
    protected_roles: ProtectedRoleResolver<D>,
    engine: MatchEngine,
    actuator: ModerationActuator<D>,
}

impl<S: FilterConfigStore, D: MemberDirectory> UsernameSpamFilter<S, D> {
    pub fn new(
        store: Arc<S>,
        directory: Arc<D>,
        role_source: Arc<dyn ProtectedRoleSource>,
        engine: MatchEngine,
        escalation_contacts: [u64; 2],
    ) -> Self {
        Self {
            allowlist: AllowlistResolver::new(Arc::clone(&store)),
            protected_roles: ProtectedRoleResolver::new(role_source, Arc::clone(&directory)),
            actuator: ModerationActuator::new(directory, escalation_contacts),
            store,
            engine,
        }
    }

    /// Run the filter for a member who just joined or changed their nickname.
    ///
    /// Store or directory failures abort the run without banning anyone.
    pub async fn run(&self, server: &ServerRef, member: &Member) -> Result<FilterVerdict, FilterError> {
        if let Some(reason) = self.skip_reason(server, member).await? {
            tracing::info!(
                guild_id = server.id,
                user_id = member.id,
                reason = ?reason,
                "Skipping username spam filter for {}",
                member.tag
            );
            return Ok(FilterVerdict::Skipped(reason));
        }

        let role_ids = self.protected_roles.get_protected_role_ids(server.id).await?;

        // No protected roles means the filter has not been configured here
        if role_ids.is_empty() {
            return Ok(FilterVerdict::Skipped(SkipReason::FilterInactive));
        }

        if member.has_any_role(&role_ids) {
            return Ok(FilterVerdict::Skipped(SkipReason::ProtectedRoleHolder));
        }

        let holders = self.protected_roles.get_holders(server.id, &role_ids).await?;

        match self.engine.evaluate(member, &holders) {
            Some(evidence) => {
                self.actuator.apply(server, member, &evidence).await;
                Ok(FilterVerdict::Banned)
            }
            None => Ok(FilterVerdict::Clean),
        }
    }

    async fn skip_reason(
        &self,
        server: &ServerRef,
        member: &Member,
    ) -> Result<Option<SkipReason>, FilterError> {
        if !member.bannable {
            return Ok(Some(SkipReason::NotBannable));
        }

        if self.allowlist.is_user_allowlisted(server.id, member.id).await? {
            return Ok(Some(SkipReason::AllowlistedUser));
        }

        if self
            .allowlist
            .is_role_allowlisted(server.id, &member.role_ids)
            .await?
        {
            return Ok(Some(SkipReason::AllowlistedRole));
        }

        Ok(None)
    }

    /// Allowlist a user who was just unbanned so the filter does not ban them again.
    pub async fn grant_unban_allowlist(
        &self,
        server: &ServerRef,
        user_id: u64,
        username: &str,
    ) -> Result<(), FilterError> {
        tracing::debug!(guild_id = server.id, user_id, "Allowlisting unbanned user");
        self.add_allowlist(server, AllowlistSubject::User, user_id, username)
            .await
            .map(|_| ())
    }

    /// Add an allowlist entry. Returns `false` if it was already present.
    pub async fn add_allowlist(
        &self,
        server: &ServerRef,
        subject: AllowlistSubject,
        subject_id: u64,
        subject_name: &str,
    ) -> Result<bool, FilterError> {
        let entry = FilterEntry::new(server, subject.object_type(), subject_id, subject_name);
        let report = self
            .store
            .insert_many(
                vec![entry],
                InsertOptions {
                    tolerate_duplicate_key: true,
                },
            )
            .await?;

        if let Some((_, reason)) = report.failed.into_iter().next() {
            return Err(StoreError::Backend(reason).into());
        }
        Ok(report.inserted == 1)
    }

    /// Remove an allowlist entry. Returns `false` if there was none.
    pub async fn remove_allowlist(
        &self,
        server: &ServerRef,
        subject: AllowlistSubject,
        subject_id: u64,
    ) -> Result<bool, FilterError> {
        let filter = EntryFilter::exact(server.id, subject.object_type(), subject_id);
        Ok(self.store.delete_one(&filter).await?)
    }

    /// Everything configured for a server.
    pub async fn overview(&self, server_id: u64) -> Result<FilterOverview, FilterError> {
        let entries = self.store.find_many(&EntryFilter::server(server_id)).await?;
        Ok(FilterOverview::from_entries(entries))
    }
}

// ============================================================================
// TESTS
// ============================================================================
