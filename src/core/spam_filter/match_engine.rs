use super::normalizer::{NameNormalizer, NormalizedName};
use super::spam_filter_models::{MatchEvidence, MatchedField, Member};
use std::collections::HashSet;

/// Compares a candidate's names against the names of protected members.
///
/// The protected-name pool is rebuilt on every call; nicknames and role
/// membership change too often to cache it.
#[derive(Debug, Clone)]
pub struct MatchEngine {
    normalizer: NameNormalizer,
}

impl MatchEngine {
    pub fn new(normalizer: NameNormalizer) -> Self {
        Self { normalizer }
    }

    /// `Some` when the candidate's nickname or username collides with a
    /// protected member's display name. Either field is enough.
    pub fn evaluate(&self, candidate: &Member, protected: &[Member]) -> Option<MatchEvidence> {
        let pool: HashSet<NormalizedName> = protected
            .iter()
            .filter(|m| m.id != candidate.id)
            .map(|m| self.normalizer.normalize(m.display_name()))
            .filter(|name| !name.is_empty())
            .collect();

        if pool.is_empty() {
            return None;
        }

        let nickname = candidate
            .nickname
            .as_deref()
            .map(|n| (MatchedField::Nickname, self.normalizer.normalize(n)));
        let username = Some((
            MatchedField::Username,
            self.normalizer.normalize(&candidate.username),
        ));

        nickname
            .into_iter()
            .chain(username)
            .filter(|(_, name)| !name.is_empty())
            .find(|(_, name)| pool.contains(name))
            .map(|(field, name)| MatchEvidence {
                field,
                normalized: name.into_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spam_filter::confusables::ConfusableTable;
    use crate::core::spam_filter::test_support::*;
    use std::sync::Arc;

    fn engine() -> MatchEngine {
        MatchEngine::new(NameNormalizer::new(Arc::new(ConfusableTable::new())))
    }

    fn with_nickname(nickname: &str) -> Member {
        Member {
            nickname: Some(nickname.to_string()),
            ..pioneer()
        }
    }

    #[test]
    fn no_match_for_unrelated_names() {
        let result = engine().evaluate(&pioneer(), &high_ranking_members());
        assert_eq!(result, None);
    }

    #[test]
    fn matches_on_nickname() {
        let result = engine()
            .evaluate(&with_nickname("0xLucas"), &high_ranking_members())
            .unwrap();
        assert_eq!(result.field, MatchedField::Nickname);
        assert_eq!(result.normalized, "0xlucas");
    }

    #[test]
    fn matches_on_username_even_with_unrelated_nickname() {
        let candidate = Member {
            username: "0xLucas".to_string(),
            nickname: Some("someone else".to_string()),
            ..pioneer()
        };
        let result = engine()
            .evaluate(&candidate, &high_ranking_members())
            .unwrap();
        assert_eq!(result.field, MatchedField::Username);
    }

    #[test]
    fn protected_nickname_takes_precedence_over_username() {
        let mut protected = high_ranking_members();
        protected[0].nickname = Some("Lucas the Great".to_string());

        assert!(engine()
            .evaluate(&with_nickname("0xLucas"), &protected)
            .is_none());
        assert!(engine()
            .evaluate(&with_nickname("LucasTheGreat"), &protected)
            .is_some());
    }

    #[test]
    fn lookalike_names_match() {
        let protected = high_ranking_members();
        for nickname in [
            "0xlucas",
            "0xLucàs",
            "0xLucas🏴",
            "AboveAverageJoe",
            "\u{0391}bove Average Joe",
            "\u{0410}bove Average Joe",
            "ﬀﬀbanks",
            "0xLuc\u{0430}\u{0301}s",
        ] {
            assert!(
                engine().evaluate(&with_nickname(nickname), &protected).is_some(),
                "{nickname:?} should match"
            );
        }
    }

    #[test]
    fn trailing_digits_do_not_match() {
        let result = engine().evaluate(&with_nickname("0xLucas2"), &high_ranking_members());
        assert!(result.is_none());
    }

    #[test]
    fn empty_pool_never_matches() {
        assert!(engine().evaluate(&with_nickname("0xLucas"), &[]).is_none());
    }

    #[test]
    fn candidate_is_not_compared_with_itself() {
        let protected = high_ranking_members();
        let lucas = protected[0].clone();
        assert!(engine().evaluate(&lucas, &protected).is_none());
    }

    #[test]
    fn names_that_normalize_to_nothing_never_match() {
        let mut protected = high_ranking_members();
        protected[0].nickname = Some("🏴🏴".to_string());

        assert!(engine()
            .evaluate(&with_nickname("🔥"), &protected)
            .is_none());
    }
}
