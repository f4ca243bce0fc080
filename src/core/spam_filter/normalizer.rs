// Display-name canonicalization.
//
// Two names that render the same should normalize to the same string:
//   1. NFKC (ligatures, width variants)
//   2. drop "symbol, other" codepoints (emoji, pictographs)
//   3. drop whitespace
//   4. fold look-alikes via the confusable table
//   5. lowercase

use super::confusables::ConfusableTable;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;
use unicode_properties::{GeneralCategory, GeneralCategoryGroup, UnicodeGeneralCategory};

/// Currency glyph kept as-is even though it is a Greek letter.
const ALLOWED_SYMBOL: char = 'Ξ';

/// Extra passes after the first; each one only fires when the previous changed the name.
const MAX_PASSES: usize = 4;

/// A name after normalization. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedName(String);

impl NormalizedName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NormalizedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct NameNormalizer {
    table: Arc<ConfusableTable>,
}

impl NameNormalizer {
    pub fn new(table: Arc<ConfusableTable>) -> Self {
        Self { table }
    }

    /// Normalize a raw nickname or username. Total and idempotent.
    ///
    /// Folding can turn a look-alike base into a Latin letter that composes
    /// with a following combining mark, so passes repeat until stable.
    pub fn normalize(&self, raw: &str) -> NormalizedName {
        let mut current = self.fold_once(raw);
        for _ in 0..MAX_PASSES {
            let next = self.fold_once(&current);
            if next == current {
                break;
            }
            current = next;
        }
        NormalizedName(current)
    }

    fn fold_once(&self, raw: &str) -> String {
        let mut folded = String::with_capacity(raw.len());

        for c in raw.nfkc() {
            if c.general_category() == GeneralCategory::OtherSymbol || c.is_whitespace() {
                continue;
            }

            if is_standard_char(c) {
                folded.push(c);
                continue;
            }

            match self.table.get(c) {
                Some(latin) => folded.push_str(latin),
                None => folded.push(c),
            }
        }

        folded.to_lowercase()
    }
}

/// ASCII word characters, punctuation, symbols and `Ξ` are never folded.
fn is_standard_char(c: char) -> bool {
    if c.is_ascii_alphanumeric() || c == '_' || c == ALLOWED_SYMBOL {
        return true;
    }

    matches!(
        c.general_category_group(),
        GeneralCategoryGroup::Punctuation | GeneralCategoryGroup::Symbol
    )
}
