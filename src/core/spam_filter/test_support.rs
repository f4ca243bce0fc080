// In-memory ports for unit tests.

use super::directory::{
    BanError, ChannelError, DeliveryError, DirectoryError, InteractiveChannel, MemberDirectory,
    PromptHandle, PromptSection, ReactionChoice,
};
use super::spam_filter_models::{
    EntryFilter, FilterEntry, FilterObjectType, InsertOptions, InsertReport, Member, RoleRef,
    ServerRef,
};
use super::spam_filter_store::{FilterConfigStore, StoreError};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub const GUILD_ID: u64 = 834499078434979890;
pub const GENESIS_SQUAD: u64 = 1001;
pub const ADMIN_ROLE: u64 = 1002;
pub const LEVEL_2: u64 = 1003;
pub const LEVEL_4: u64 = 1004;
pub const DEVELOPERS_GUILD: u64 = 1005;

pub fn server() -> ServerRef {
    ServerRef {
        id: GUILD_ID,
        name: "BanklessDAO".to_string(),
    }
}

/// The default candidate: a bannable "Pioneer" with no roles and no nickname.
pub fn pioneer() -> Member {
    Member {
        id: 930362313029460717,
        username: "Pioneer".to_string(),
        nickname: None,
        tag: "Pioneer#1559".to_string(),
        role_ids: HashSet::new(),
        bannable: true,
    }
}

pub fn member_with_roles(id: u64, username: &str, roles: &[u64]) -> Member {
    Member {
        id,
        username: username.to_string(),
        nickname: None,
        tag: format!("{username}#1559"),
        role_ids: roles.iter().copied().collect(),
        bannable: true,
    }
}

/// High-ranking members of the test guild.
pub fn high_ranking_members() -> Vec<Member> {
    vec![
        member_with_roles(830462333029460010, "0xLucas", &[GENESIS_SQUAD]),
        member_with_roles(
            830462333029460011,
            "Above Average Joe",
            &[ADMIN_ROLE, LEVEL_4],
        ),
        member_with_roles(
            830462333029460012,
            "Vitalik Buterin",
            &[DEVELOPERS_GUILD, LEVEL_4],
        ),
        member_with_roles(830462333029460013, "ffffbanks", &[LEVEL_2]),
    ]
}

/// Rows are unique per server, type and object.
fn row_key(entry: &FilterEntry) -> (u64, FilterObjectType, u64) {
    (entry.server_id, entry.object_type, entry.object_id)
}

#[derive(Default)]
pub struct MockFilterStore {
    rows: DashMap<(u64, FilterObjectType, u64), FilterEntry>,
    pub unavailable: AtomicBool,
    /// Object ids whose insert/delete fails with a backend error.
    pub failing_ids: DashSet<u64>,
}

impl MockFilterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, entry: FilterEntry) {
        self.rows.insert(row_key(&entry), entry);
    }

    pub fn protect_roles(&self, server: &ServerRef, role_ids: &[u64]) {
        for id in role_ids {
            self.seed(FilterEntry::new(
                server,
                FilterObjectType::HighRankingRole,
                *id,
                format!("role-{id}"),
            ));
        }
    }

    pub fn ids_of(&self, server_id: u64, object_type: FilterObjectType) -> HashSet<u64> {
        self.rows
            .iter()
            .filter(|r| r.server_id == server_id && r.object_type == object_type)
            .map(|r| r.object_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FilterConfigStore for MockFilterStore {
    async fn find_many(&self, filter: &EntryFilter) -> Result<Vec<FilterEntry>, StoreError> {
        self.check_available()?;
        Ok(self
            .rows
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect())
    }

    async fn insert_many(
        &self,
        rows: Vec<FilterEntry>,
        options: InsertOptions,
    ) -> Result<InsertReport, StoreError> {
        self.check_available()?;
        let mut report = InsertReport::default();
        for row in rows {
            if self.failing_ids.contains(&row.object_id) {
                report.failed.push((row, "write rejected".to_string()));
            } else if self.rows.contains_key(&row_key(&row)) {
                if options.tolerate_duplicate_key {
                    report.duplicates.push(row);
                } else {
                    report.failed.push((row, "duplicate key".to_string()));
                }
            } else {
                self.rows.insert(row_key(&row), row);
                report.inserted += 1;
            }
        }
        Ok(report)
    }

    async fn delete_one(&self, filter: &EntryFilter) -> Result<bool, StoreError> {
        self.check_available()?;
        if filter
            .object_id
            .map_or(false, |id| self.failing_ids.contains(&id))
        {
            return Err(StoreError::Backend("write rejected".to_string()));
        }
        let key = self
            .rows
            .iter()
            .find(|r| filter.matches(r.value()))
            .map(|r| *r.key());
        Ok(key.map_or(false, |k| self.rows.remove(&k).is_some()))
    }
}

#[derive(Default)]
pub struct MockDirectory {
    pub members: Mutex<Vec<Member>>,
    pub roles: DashMap<u64, RoleRef>,
    pub bans: Mutex<Vec<(u64, String)>>,
    pub messages: Mutex<Vec<(u64, String)>>,
    pub fetch_all_calls: AtomicUsize,
    pub dm_blocked: AtomicBool,
    pub ban_fails: AtomicBool,
}

impl MockDirectory {
    pub fn new(members: Vec<Member>) -> Self {
        Self {
            members: Mutex::new(members),
            ..Default::default()
        }
    }

    pub fn with_role(self, id: u64, name: &str) -> Self {
        self.roles.insert(
            id,
            RoleRef {
                id,
                name: name.to_string(),
            },
        );
        self
    }

    pub fn ban_count(&self) -> usize {
        self.bans.lock().unwrap().len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl MemberDirectory for MockDirectory {
    async fn fetch_member(&self, _server_id: u64, member_id: u64) -> Result<Member, DirectoryError> {
        self.members
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == member_id)
            .cloned()
            .ok_or(DirectoryError::MemberNotFound(member_id))
    }

    async fn fetch_all_members(&self, _server_id: u64) -> Result<Vec<Member>, DirectoryError> {
        self.fetch_all_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.members.lock().unwrap().clone())
    }

    async fn fetch_role(
        &self,
        _server_id: u64,
        role_id: u64,
    ) -> Result<Option<RoleRef>, DirectoryError> {
        Ok(self.roles.get(&role_id).map(|r| r.clone()))
    }

    async fn ban(&self, _server_id: u64, member: &Member, reason: &str) -> Result<(), BanError> {
        // Record the attempt either way so tests can count it
        self.bans
            .lock()
            .unwrap()
            .push((member.id, reason.to_string()));
        if self.ban_fails.load(Ordering::SeqCst) {
            return Err(BanError::InsufficientPrivilege(member.id));
        }
        Ok(())
    }

    async fn direct_message(&self, member_id: u64, text: &str) -> Result<(), DeliveryError> {
        self.messages
            .lock()
            .unwrap()
            .push((member_id, text.to_string()));
        if self.dm_blocked.load(Ordering::SeqCst) {
            return Err(DeliveryError::Blocked(member_id));
        }
        Ok(())
    }
}

/// Channel that answers every prompt with a scripted reaction, or never answers.
pub struct MockChannel {
    reaction: Option<ReactionChoice>,
    pub prompts: Mutex<Vec<(u64, Vec<PromptSection>)>>,
    pub notices: Mutex<Vec<(u64, Vec<PromptSection>)>>,
}

impl MockChannel {
    pub fn answering(reaction: ReactionChoice) -> Self {
        Self {
            reaction: Some(reaction),
            prompts: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
        }
    }

    pub fn silent() -> Self {
        Self {
            reaction: None,
            prompts: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn notice_titles(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, sections)| sections.iter().map(|s| s.title.clone()))
            .collect()
    }
}

#[async_trait]
impl InteractiveChannel for MockChannel {
    async fn send_prompt_with_reactions(
        &self,
        recipient: u64,
        sections: &[PromptSection],
        _reactions: &[ReactionChoice],
    ) -> Result<PromptHandle, ChannelError> {
        self.prompts
            .lock()
            .unwrap()
            .push((recipient, sections.to_vec()));
        Ok(PromptHandle {
            channel_id: recipient,
            message_id: 1,
        })
    }

    async fn await_single_reaction(
        &self,
        _handle: &PromptHandle,
        allowed: &[ReactionChoice],
    ) -> Result<ReactionChoice, ChannelError> {
        match self.reaction {
            Some(choice) if allowed.contains(&choice) => Ok(choice),
            _ => std::future::pending().await,
        }
    }

    async fn send_notice(
        &self,
        recipient: u64,
        sections: &[PromptSection],
    ) -> Result<(), ChannelError> {
        self.notices
            .lock()
            .unwrap()
            .push((recipient, sections.to_vec()));
        Ok(())
    }
}
