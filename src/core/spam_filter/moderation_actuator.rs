// Enforcement for a detected impersonator: tell them why, then ban them.
//
// Neither step's failure is propagated. A member who blocks DMs must still be
// banned, and a failed ban is only logged.

use super::directory::{BanError, MemberDirectory};
use super::spam_filter_models::{MatchEvidence, Member, ServerRef};
use std::sync::Arc;

pub struct ModerationActuator<D: MemberDirectory> {
    directory: Arc<D>,
    escalation_contacts: [u64; 2],
}

impl<D: MemberDirectory> ModerationActuator<D> {
    pub fn new(directory: Arc<D>, escalation_contacts: [u64; 2]) -> Self {
        Self {
            directory,
            escalation_contacts,
        }
    }

    /// Notify and ban `candidate`.
    ///
    /// Returns `true` once enforcement was attempted. That does not mean the
    /// ban went through.
    pub async fn apply(
        &self,
        server: &ServerRef,
        candidate: &Member,
        evidence: &MatchEvidence,
    ) -> bool {
        let debug_message = format!(
            "Nickname: {}. Username: {}.",
            candidate.display_name(),
            candidate.tag
        );

        // The bot cannot DM a user once they are banned, so notify first.
        let notice = self.ban_notice(server);
        if let Err(e) = self.directory.direct_message(candidate.id, &notice).await {
            tracing::warn!(
                guild_id = server.id,
                user_id = candidate.id,
                "Unable to message user before auto-banning them. {} {}",
                debug_message,
                e
            );
        }

        let reason = format!("Auto-banned by username spam filter. {}", debug_message);
        match self.directory.ban(server.id, candidate, &reason).await {
            Ok(()) => {
                tracing::info!(
                    guild_id = server.id,
                    user_id = candidate.id,
                    matched_field = %evidence.field,
                    matched_name = %evidence.normalized,
                    "Auto-banned user. {}",
                    debug_message
                );
            }
            Err(BanError::MemberGone(_)) => {
                tracing::info!(
                    guild_id = server.id,
                    user_id = candidate.id,
                    "Member already gone, nothing to ban. {}",
                    debug_message
                );
            }
            Err(e) => {
                tracing::error!(
                    guild_id = server.id,
                    user_id = candidate.id,
                    "Unable to auto-ban user. {} {}",
                    debug_message,
                    e
                );
            }
        }

        true
    }

    fn ban_notice(&self, server: &ServerRef) -> String {
        let [first, second] = self.escalation_contacts;
        format!(
            "You were auto-banned from the {} server. If you believe this was a mistake, \
             please contact <@{}> or <@{}>.",
            server.name, first, second
        )
    }
}
