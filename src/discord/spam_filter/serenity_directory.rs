// Serenity-backed implementations of the spam filter's platform ports.
//
// One `SerenityDirectory` wraps a gateway context and serves both member
// lookups/bans and the DM prompt used by the configuration workflow.

use crate::core::spam_filter::{
    BanError, ChannelError, DeliveryError, DirectoryError, InteractiveChannel, Member,
    MemberDirectory, PromptHandle, PromptSection, ReactionChoice, RoleRef,
};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::collections::HashSet;

/// Page size for the guild member list endpoint.
const MEMBER_PAGE_SIZE: u64 = 1000;

#[derive(Clone)]
pub struct SerenityDirectory {
    ctx: serenity::Context,
}

impl SerenityDirectory {
    pub fn new(ctx: &serenity::Context) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Convert a serenity member into the filter's snapshot.
    pub fn to_member(&self, member: &serenity::Member) -> Member {
        Member {
            id: member.user.id.get(),
            username: member.user.name.clone(),
            nickname: member.nick.clone(),
            tag: member.user.tag(),
            role_ids: member.roles.iter().map(|r| r.get()).collect(),
            bannable: self.is_bannable(member),
        }
    }

    /// Whether the bot outranks `member` and holds the ban permission.
    fn is_bannable(&self, member: &serenity::Member) -> bool {
        let bot_id = self.ctx.cache.current_user().id;
        let Some(guild) = self.ctx.cache.guild(member.guild_id) else {
            tracing::debug!(
                guild_id = member.guild_id.get(),
                "Guild not cached, treating member as not bannable"
            );
            return false;
        };

        if member.user.id == guild.owner_id || member.user.id == bot_id {
            return false;
        }
        if guild.owner_id == bot_id {
            return true;
        }

        let Some(bot_member) = guild.members.get(&bot_id) else {
            return false;
        };

        // @everyone shares the guild's id
        let everyone = serenity::RoleId::new(guild.id.get());
        let mut permissions = guild
            .roles
            .get(&everyone)
            .map(|r| r.permissions)
            .unwrap_or_else(serenity::Permissions::empty);
        for role_id in &bot_member.roles {
            if let Some(role) = guild.roles.get(role_id) {
                permissions |= role.permissions;
            }
        }
        if !permissions.administrator() && !permissions.ban_members() {
            return false;
        }

        let top_position = |roles: &[serenity::RoleId]| -> u16 {
            roles
                .iter()
                .filter_map(|id| guild.roles.get(id))
                .map(|r| r.position)
                .max()
                .unwrap_or(0)
        };

        top_position(&bot_member.roles) > top_position(&member.roles)
    }

    fn embed(section: &PromptSection) -> serenity::CreateEmbed {
        let mut embed = serenity::CreateEmbed::default().color(serenity::Color::BLURPLE);
        if !section.title.is_empty() {
            embed = embed.title(&section.title);
        }
        if !section.description.is_empty() {
            embed = embed.description(&section.description);
        }
        for (name, value) in &section.fields {
            embed = embed.field(name, value, false);
        }
        if let Some(footer) = &section.footer {
            embed = embed.footer(serenity::CreateEmbedFooter::new(footer));
        }
        embed
    }

    async fn send_dm(
        &self,
        recipient: u64,
        message: serenity::CreateMessage,
    ) -> Result<serenity::Message, DeliveryError> {
        let user_id = serenity::UserId::new(recipient);
        let channel = user_id
            .create_dm_channel(&self.ctx)
            .await
            .map_err(|e| DeliveryError::Platform(e.to_string()))?;

        channel
            .send_message(&self.ctx, message)
            .await
            .map_err(|e| match status_code(&e) {
                Some(403) => DeliveryError::Blocked(recipient),
                _ => DeliveryError::Platform(e.to_string()),
            })
    }
}

/// HTTP status of a failed Discord API call, if that is what failed.
fn status_code(error: &serenity::Error) -> Option<u16> {
    match error {
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response)) => {
            Some(response.status_code.as_u16())
        }
        _ => None,
    }
}

#[async_trait]
impl MemberDirectory for SerenityDirectory {
    async fn fetch_member(&self, server_id: u64, member_id: u64) -> Result<Member, DirectoryError> {
        let member = serenity::GuildId::new(server_id)
            .member(&self.ctx, serenity::UserId::new(member_id))
            .await
            .map_err(|e| match status_code(&e) {
                Some(404) => DirectoryError::MemberNotFound(member_id),
                _ => DirectoryError::Platform(e.to_string()),
            })?;

        Ok(self.to_member(&member))
    }

    async fn fetch_all_members(&self, server_id: u64) -> Result<Vec<Member>, DirectoryError> {
        let guild_id = serenity::GuildId::new(server_id);
        let mut members = Vec::new();
        let mut after: Option<serenity::UserId> = None;

        loop {
            let page = guild_id
                .members(&self.ctx.http, Some(MEMBER_PAGE_SIZE), after)
                .await
                .map_err(|e| DirectoryError::Platform(e.to_string()))?;

            let page_len = page.len() as u64;
            after = page.last().map(|m| m.user.id);
            members.extend(page.iter().map(|m| self.to_member(m)));

            if page_len < MEMBER_PAGE_SIZE {
                break;
            }
        }

        tracing::debug!(guild_id = server_id, count = members.len(), "Fetched guild members");
        Ok(members)
    }

    async fn fetch_role(
        &self,
        server_id: u64,
        role_id: u64,
    ) -> Result<Option<RoleRef>, DirectoryError> {
        let roles = serenity::GuildId::new(server_id)
            .roles(&self.ctx.http)
            .await
            .map_err(|e| DirectoryError::Platform(e.to_string()))?;

        Ok(roles
            .get(&serenity::RoleId::new(role_id))
            .map(|role| RoleRef {
                id: role_id,
                name: role.name.clone(),
            }))
    }

    async fn ban(&self, server_id: u64, member: &Member, reason: &str) -> Result<(), BanError> {
        serenity::GuildId::new(server_id)
            .ban_with_reason(&self.ctx.http, serenity::UserId::new(member.id), 0, reason)
            .await
            .map_err(|e| match status_code(&e) {
                Some(403) => BanError::InsufficientPrivilege(member.id),
                Some(404) => BanError::MemberGone(member.id),
                _ => BanError::Platform(e.to_string()),
            })
    }

    async fn direct_message(&self, member_id: u64, text: &str) -> Result<(), DeliveryError> {
        self.send_dm(member_id, serenity::CreateMessage::new().content(text))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl InteractiveChannel for SerenityDirectory {
    async fn send_prompt_with_reactions(
        &self,
        recipient: u64,
        sections: &[PromptSection],
        reactions: &[ReactionChoice],
    ) -> Result<PromptHandle, ChannelError> {
        let embeds: Vec<serenity::CreateEmbed> = sections.iter().map(Self::embed).collect();
        let message = self
            .send_dm(recipient, serenity::CreateMessage::new().embeds(embeds))
            .await?;

        for choice in reactions {
            message
                .react(
                    &self.ctx,
                    serenity::ReactionType::Unicode(choice.emoji().to_string()),
                )
                .await
                .map_err(|e| ChannelError::Platform(e.to_string()))?;
        }

        Ok(PromptHandle {
            channel_id: message.channel_id.get(),
            message_id: message.id.get(),
        })
    }

    async fn await_single_reaction(
        &self,
        handle: &PromptHandle,
        allowed: &[ReactionChoice],
    ) -> Result<ReactionChoice, ChannelError> {
        let bot_id = self.ctx.cache.current_user().id;
        let allowed: HashSet<&'static str> = allowed.iter().map(|c| c.emoji()).collect();

        let reaction = serenity::ReactionCollector::new(&self.ctx)
            .message_id(serenity::MessageId::new(handle.message_id))
            .filter(move |reaction| {
                let offered = match &reaction.emoji {
                    serenity::ReactionType::Unicode(emoji) => allowed.contains(emoji.as_str()),
                    _ => false,
                };
                offered && reaction.user_id.is_some_and(|id| id != bot_id)
            })
            .next()
            .await
            .ok_or(ChannelError::Closed)?;

        match &reaction.emoji {
            serenity::ReactionType::Unicode(emoji) => {
                ReactionChoice::from_emoji(emoji).ok_or(ChannelError::Closed)
            }
            _ => Err(ChannelError::Closed),
        }
    }

    async fn send_notice(
        &self,
        recipient: u64,
        sections: &[PromptSection],
    ) -> Result<(), ChannelError> {
        let embeds: Vec<serenity::CreateEmbed> = sections.iter().map(Self::embed).collect();
        self.send_dm(recipient, serenity::CreateMessage::new().embeds(embeds))
            .await?;
        Ok(())
    }
}
