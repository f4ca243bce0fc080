// Admin-driven configuration of the protected (high-ranking) roles.
//
// begin() ──▶ AWAITING_DECISION ──decide()──▶ ADDED | REMOVED | EDIT_REQUESTED | TIMED_OUT
//
// `begin` validates the caller, resolves the roles and sends the prompt.
// `decide` performs the single deadline-bound wait and applies the answer.
// Nothing is written to the store unless the caller approves or denies.

use super::directory::{
    ChannelError, DirectoryError, InteractiveChannel, MemberDirectory, PromptHandle,
    PromptSection, ReactionChoice,
};
use super::spam_filter_models::{
    EntryFilter, FilterEntry, FilterObjectType, InsertOptions, InsertReport, RoleRef, ServerRef,
};
use super::spam_filter_store::{FilterConfigStore, StoreError};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const MAX_CANDIDATE_ROLES: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Bad input or missing authorization. Shown to the caller as-is.
    #[error("{0}")]
    Validation(String),
    /// The caller walked away or ran out of time. Shown to the caller as-is.
    #[error("{0}")]
    EarlyTermination(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    AwaitingDecision,
    Added,
    Removed,
    EditRequested,
    TimedOut,
}

/// Whoever invoked the configuration command.
#[derive(Debug, Clone)]
pub struct WorkflowCaller {
    pub user_id: u64,
    pub is_administrator: bool,
    pub can_manage_server: bool,
}

impl WorkflowCaller {
    fn is_authorized(&self) -> bool {
        self.is_administrator || self.can_manage_server
    }
}

#[derive(Debug, Clone)]
pub enum WorkflowOutcome {
    Added {
        roles: Vec<RoleRef>,
        report: InsertReport,
    },
    Removed {
        roles: Vec<RoleRef>,
        removed: usize,
    },
}

impl WorkflowOutcome {
    pub fn state(&self) -> WorkflowState {
        match self {
            WorkflowOutcome::Added { .. } => WorkflowState::Added,
            WorkflowOutcome::Removed { .. } => WorkflowState::Removed,
        }
    }

    /// Roles the caller answered for.
    pub fn roles(&self) -> &[RoleRef] {
        match self {
            WorkflowOutcome::Added { roles, .. } | WorkflowOutcome::Removed { roles, .. } => roles,
        }
    }
}

pub struct ConfigurationWorkflow<S, D, C>
where
    S: FilterConfigStore,
    D: MemberDirectory,
    C: InteractiveChannel,
{
    store: Arc<S>,
    directory: Arc<D>,
    channel: Arc<C>,
    decision_timeout: Duration,
}

impl<S, D, C> ConfigurationWorkflow<S, D, C>
where
    S: FilterConfigStore,
    D: MemberDirectory,
    C: InteractiveChannel,
{
    pub fn new(store: Arc<S>, directory: Arc<D>, channel: Arc<C>) -> Self {
        Self {
            store,
            directory,
            channel,
            decision_timeout: DEFAULT_DECISION_TIMEOUT,
        }
    }

    pub fn with_decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout = timeout;
        self
    }

    /// Begin and decide in one go.
    #[allow(dead_code)]
    pub async fn run(
        &self,
        server: &ServerRef,
        caller: &WorkflowCaller,
        candidate_role_ids: &[u64],
    ) -> Result<WorkflowOutcome, WorkflowError> {
        self.begin(server, caller, candidate_role_ids)
            .await?
            .decide()
            .await
    }

    /// Authorize, resolve roles and send the prompt.
    pub async fn begin(
        &self,
        server: &ServerRef,
        caller: &WorkflowCaller,
        candidate_role_ids: &[u64],
    ) -> Result<PendingDecision<'_, S, D, C>, WorkflowError> {
        if !caller.is_authorized() {
            return Err(WorkflowError::Validation(
                "Sorry, only discord admins and managers can configure spam filter settings."
                    .to_string(),
            ));
        }

        if candidate_role_ids.len() > MAX_CANDIDATE_ROLES {
            return Err(WorkflowError::Validation(format!(
                "Please configure at most {} roles at a time.",
                MAX_CANDIDATE_ROLES
            )));
        }

        let roles = self.resolve_roles(server.id, candidate_role_ids).await;
        if roles.is_empty() {
            return Err(WorkflowError::Validation(
                "Please try again with at least 1 role.".to_string(),
            ));
        }

        let sections = [intro_section(), question_section(&roles, self.decision_timeout)];
        let handle = self
            .channel
            .send_prompt_with_reactions(caller.user_id, &sections, &ReactionChoice::ALL)
            .await?;

        log_transition(server, caller.user_id, WorkflowState::AwaitingDecision);

        Ok(PendingDecision {
            workflow: self,
            server: server.clone(),
            caller_id: caller.user_id,
            roles,
            handle,
        })
    }

    /// Unresolvable ids are dropped without complaint.
    async fn resolve_roles(&self, server_id: u64, role_ids: &[u64]) -> Vec<RoleRef> {
        let mut roles: Vec<RoleRef> = Vec::new();
        for &role_id in role_ids {
            if roles.iter().any(|r| r.id == role_id) {
                continue;
            }
            match self.directory.fetch_role(server_id, role_id).await {
                Ok(Some(role)) => roles.push(role),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(guild_id = server_id, role_id, "Failed to retrieve role: {}", e);
                }
            }
        }
        roles
    }

    async fn add_roles(
        &self,
        server: &ServerRef,
        roles: &[RoleRef],
    ) -> Result<InsertReport, WorkflowError> {
        let rows: Vec<FilterEntry> = roles
            .iter()
            .map(|role| FilterEntry::protected_role(server, role))
            .collect();

        let report = self
            .store
            .insert_many(
                rows,
                InsertOptions {
                    tolerate_duplicate_key: true,
                },
            )
            .await
            .map_err(|e| {
                tracing::error!(
                    guild_id = server.id,
                    "Failed to store username spam filter roles: {}",
                    e
                );
                e
            })?;

        for dup in &report.duplicates {
            tracing::info!(
                guild_id = server.id,
                role_id = dup.object_id,
                "Role already protected, proceeding"
            );
        }
        for (row, reason) in &report.failed {
            tracing::error!(
                guild_id = server.id,
                role_id = row.object_id,
                "Failed to store username spam filter role: {}",
                reason
            );
        }

        Ok(report)
    }

    /// Deletes each role independently; returns how many rows went away.
    async fn remove_roles(&self, server: &ServerRef, roles: &[RoleRef]) -> usize {
        let mut removed = 0;
        for role in roles {
            let filter =
                EntryFilter::exact(server.id, FilterObjectType::HighRankingRole, role.id);
            match self.store.delete_one(&filter).await {
                Ok(true) => removed += 1,
                Ok(false) => {
                    tracing::debug!(
                        guild_id = server.id,
                        role_id = role.id,
                        "Role was not protected"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        guild_id = server.id,
                        role_id = role.id,
                        "Failed to remove username spam filter role: {}",
                        e
                    );
                }
            }
        }
        removed
    }

    async fn notify(&self, recipient: u64, section: PromptSection) {
        if let Err(e) = self.channel.send_notice(recipient, &[section]).await {
            tracing::warn!(user_id = recipient, "Failed to send configuration notice: {}", e);
        }
    }
}

/// AWAITING_DECISION: the prompt is out, nothing has been written yet.
pub struct PendingDecision<'a, S, D, C>
where
    S: FilterConfigStore,
    D: MemberDirectory,
    C: InteractiveChannel,
{
    workflow: &'a ConfigurationWorkflow<S, D, C>,
    server: ServerRef,
    caller_id: u64,
    roles: Vec<RoleRef>,
    handle: PromptHandle,
}

impl<'a, S, D, C> PendingDecision<'a, S, D, C>
where
    S: FilterConfigStore,
    D: MemberDirectory,
    C: InteractiveChannel,
{
    pub fn roles(&self) -> &[RoleRef] {
        &self.roles
    }

    /// Wait for the first reaction, bounded by the decision timeout, and apply it.
    pub async fn decide(self) -> Result<WorkflowOutcome, WorkflowError> {
        let wf = self.workflow;
        let wait = wf
            .channel
            .await_single_reaction(&self.handle, &ReactionChoice::ALL);

        // Dropping the wait on expiry tears down its listener.
        let choice = match tokio::time::timeout(wf.decision_timeout, wait).await {
            Ok(reaction) => reaction?,
            Err(_) => {
                log_transition(&self.server, self.caller_id, WorkflowState::TimedOut);
                return Err(WorkflowError::EarlyTermination(
                    "Timed out waiting for a reaction. Please re-initiate spam-filter configuration."
                        .to_string(),
                ));
            }
        };

        match choice {
            ReactionChoice::Approve => {
                let report = wf.add_roles(&self.server, &self.roles).await?;
                log_transition(&self.server, self.caller_id, WorkflowState::Added);
                wf.notify(
                    self.caller_id,
                    PromptSection {
                        title: "Configuration Added".to_string(),
                        description: "The roles are now protected by the username spam filter."
                            .to_string(),
                        ..Default::default()
                    },
                )
                .await;
                Ok(WorkflowOutcome::Added {
                    roles: self.roles,
                    report,
                })
            }
            ReactionChoice::Deny => {
                let removed = wf.remove_roles(&self.server, &self.roles).await;
                log_transition(&self.server, self.caller_id, WorkflowState::Removed);
                wf.notify(
                    self.caller_id,
                    PromptSection {
                        title: "Configuration Removed".to_string(),
                        description:
                            "The roles are no longer protected by the username spam filter."
                                .to_string(),
                        ..Default::default()
                    },
                )
                .await;
                Ok(WorkflowOutcome::Removed {
                    roles: self.roles,
                    removed,
                })
            }
            ReactionChoice::Edit => {
                log_transition(&self.server, self.caller_id, WorkflowState::EditRequested);
                wf.notify(
                    self.caller_id,
                    PromptSection {
                        title: "Configuration setup ended.".to_string(),
                        ..Default::default()
                    },
                )
                .await;
                Err(WorkflowError::Validation(
                    "Please re-initiate spam-filter configuration.".to_string(),
                ))
            }
        }
    }
}

fn log_transition(server: &ServerRef, caller_id: u64, state: WorkflowState) {
    tracing::debug!(
        guild_id = server.id,
        user_id = caller_id,
        state = ?state,
        "Spam filter configuration state changed"
    );
}

fn intro_section() -> PromptSection {
    PromptSection {
        title: "Username Spam Filter Configuration".to_string(),
        description: "Welcome to Username Spam Filter configuration.\n\n\
            This is used as a first-time setup of the username spam filter. I can help assign or \
            remove high-ranking roles to be used by the username spam filter.\n\n\
            The username spam filter will auto-ban any user that joins with or changes their \
            nickname to a username or nickname of a member with a high-ranking role."
            .to_string(),
        fields: Vec::new(),
        footer: None,
    }
}

/// Rounded down to whole minutes; anything shorter is shown in seconds.
fn reply_window(timeout: Duration) -> String {
    let secs = timeout.as_secs();
    match secs / 60 {
        0 if secs <= 1 => "1 second".to_string(),
        0 => format!("{} seconds", secs),
        1 => "1 minute".to_string(),
        mins => format!("{} minutes", mins),
    }
}

fn question_section(roles: &[RoleRef], timeout: Duration) -> PromptSection {
    PromptSection {
        title: "Add or remove from username spam filter?".to_string(),
        description:
            "Should the given list of roles be added or removed from the username spam filter?"
                .to_string(),
        fields: roles
            .iter()
            .map(|r| ("Role".to_string(), r.name.clone()))
            .collect(),
        footer: Some(format!(
            "👍 - approve | ❌ - remove | 📝 - edit | Please reply within {}",
            reply_window(timeout)
        )),
    }
}
