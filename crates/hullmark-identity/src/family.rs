use std::collections::BTreeSet;

use crate::edition::EditionRules;
use crate::manufacturer::MatchingPolicy;
use crate::tokens::{designation_tokens, sanitize_token};
use crate::vocabulary::VariantVocabulary;

/// Filters applied to a designation to reduce it to its hull family.
#[derive(Debug, Clone, Copy)]
pub struct FamilyFilter<'a> {
    pub vocabulary: &'a VariantVocabulary,
    pub editions: &'a EditionRules,
    pub policy: MatchingPolicy,
}

impl FamilyFilter<'_> {
    /// Drop variant, vocabulary, edition-span and manufacturer tokens from
    /// the designation. Never empty for non-empty input: when every token is
    /// filtered out, the whole designation is sanitized instead.
    pub fn clean_family_name(
        &self,
        designation: &str,
        variant_code: &str,
        manufacturer_tokens: &BTreeSet<String>,
    ) -> String {
        let tokens = designation_tokens(designation);
        let mask = self.editions.edition_span_mask(&tokens);

        let kept: Vec<&str> = tokens
            .iter()
            .zip(mask)
            .filter(|(_, in_edition_span)| !in_edition_span)
            .map(|(token, _)| token.as_str())
            .filter(|token| {
                *token != variant_code
                    && !self.vocabulary.contains(token)
                    && !self.policy.matches_any(token, manufacturer_tokens)
            })
            .collect();

        if kept.is_empty() {
            return sanitize_token(designation);
        }
        kept.join("_")
    }
}
