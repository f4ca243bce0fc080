// Ports onto the chat platform: who is in the server, how to reach them, and
// how to ask an admin a question.

use super::spam_filter_models::{Member, RoleRef};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Member {0} not found")]
    MemberNotFound(u64),
    #[error("Platform error: {0}")]
    Platform(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BanError {
    #[error("Missing permission to ban member {0}")]
    InsufficientPrivilege(u64),
    #[error("Member {0} is already gone")]
    MemberGone(u64),
    #[error("Platform error: {0}")]
    Platform(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Member {0} does not accept direct messages")]
    Blocked(u64),
    #[error("Platform error: {0}")]
    Platform(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Could not deliver prompt: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("Reaction listener closed before a reaction arrived")]
    Closed,
    #[error("Platform error: {0}")]
    Platform(String),
}

/// Read and enforcement access to a server's members.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn fetch_member(&self, server_id: u64, member_id: u64) -> Result<Member, DirectoryError>;

    /// Every member of the server.
    async fn fetch_all_members(&self, server_id: u64) -> Result<Vec<Member>, DirectoryError>;

    /// Resolve a role id, `None` when the server has no such role.
    async fn fetch_role(&self, server_id: u64, role_id: u64)
        -> Result<Option<RoleRef>, DirectoryError>;

    async fn ban(&self, server_id: u64, member: &Member, reason: &str) -> Result<(), BanError>;

    async fn direct_message(&self, member_id: u64, text: &str) -> Result<(), DeliveryError>;
}

/// A reaction button offered on a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChoice {
    Approve,
    Deny,
    Edit,
}

impl ReactionChoice {
    pub const ALL: [ReactionChoice; 3] = [
        ReactionChoice::Approve,
        ReactionChoice::Deny,
        ReactionChoice::Edit,
    ];

    pub fn emoji(&self) -> &'static str {
        match self {
            ReactionChoice::Approve => "👍",
            ReactionChoice::Deny => "❌",
            ReactionChoice::Edit => "📝",
        }
    }

    pub fn from_emoji(emoji: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|choice| choice.emoji() == emoji)
    }
}

/// One embed-like section of a prompt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptSection {
    pub title: String,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub footer: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptHandle {
    pub channel_id: u64,
    pub message_id: u64,
}

/// Private, reaction-driven conversation with one user.
#[async_trait]
pub trait InteractiveChannel: Send + Sync {
    /// Send `sections` privately to `recipient` and attach one reaction per choice.
    async fn send_prompt_with_reactions(
        &self,
        recipient: u64,
        sections: &[PromptSection],
        reactions: &[ReactionChoice],
    ) -> Result<PromptHandle, ChannelError>;

    /// Wait for the first reaction from a non-bot user that is one of `allowed`.
    ///
    /// Waits indefinitely; the caller bounds it with a deadline and drops the
    /// future on expiry, which must release any listener.
    async fn await_single_reaction(
        &self,
        handle: &PromptHandle,
        allowed: &[ReactionChoice],
    ) -> Result<ReactionChoice, ChannelError>;

    /// Plain private notice to `recipient`.
    async fn send_notice(&self, recipient: u64, sections: &[PromptSection])
        -> Result<(), ChannelError>;
}
