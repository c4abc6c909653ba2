//! Curated, versioned variant vocabulary and the matcher that picks a
//! variant code out of free text.

use std::collections::BTreeSet;

use hullmark_core::config::LATEST_VOCABULARY_VERSION;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IdentityError, Result};
use crate::tokens::{sanitize_token, tokenize};

/// Sentinel variant code for a hull with no configuration qualifier.
pub const BASE_VARIANT: &str = "BASE";

const V1_TOKENS: &[&str] = &[
    "A1", "A2", "BLACK", "BLUE", "C1", "C2", "CL", "ES", "F7A", "F7C", "F7CM", "F7CR", "F7CS",
    "GT", "LN", "LX", "M2", "MR", "PRO", "RED", "RENEGADE", "STALKER", "STEEL", "SUPER", "TITAN",
    "WARLOCK",
];

const V2_TOKENS: &[&str] = &[
    "CARGO",
    "COMBAT",
    "EXECUTIVE",
    "EXPEDITION",
    "EXPLORER",
    "GOLD",
    "HEARTSEEKER",
    "MEDICAL",
    "MINER",
    "RACER",
    "RESCUE",
    "SCOUT",
    "SILVER",
    "STEALTH",
    "TOURING",
    "TRADER",
];

const V3_TOKENS: &[&str] = &[
    "C8R",
    "C8X",
    "DUR",
    "F8C",
    "FURY",
    "INTERCEPTOR",
    "MAX",
    "P52",
    "P72",
    "PLUS",
    "SE",
];

/// Where a variant code came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// The text carried an explicit `BASE` marker.
    Explicit,
    Vocabulary,
    /// Unrecognized word promoted to variant status.
    FirstToken,
    /// Nothing usable in the text.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantMatch {
    pub code: String,
    pub source: MatchSource,
}

impl VariantMatch {
    pub fn base(source: MatchSource) -> Self {
        Self {
            code: BASE_VARIANT.to_string(),
            source,
        }
    }

    pub fn is_base(&self) -> bool {
        self.code == BASE_VARIANT
    }

    /// False when the code is a heuristic first-token guess that callers
    /// needing strict vocabulary membership should treat as unverified.
    pub fn is_verified(&self) -> bool {
        self.source != MatchSource::FirstToken
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantVocabulary {
    version: u32,
    tokens: BTreeSet<String>,
}

impl VariantVocabulary {
    /// Built-in vocabulary at `version`; each version extends the previous one.
    pub fn builtin(version: u32) -> Result<Self> {
        let layers: &[&[&str]] = match version {
            1 => &[V1_TOKENS],
            2 => &[V1_TOKENS, V2_TOKENS],
            3 => &[V1_TOKENS, V2_TOKENS, V3_TOKENS],
            other => {
                return Err(IdentityError::InvalidConfig(format!(
                    "unknown vocabulary version {other}"
                )));
            }
        };

        let tokens = layers
            .iter()
            .flat_map(|layer| layer.iter())
            .map(|t| t.to_string())
            .collect();
        Ok(Self { version, tokens })
    }

    pub fn latest() -> Self {
        let tokens = [V1_TOKENS, V2_TOKENS, V3_TOKENS]
            .iter()
            .flat_map(|layer| layer.iter())
            .map(|t| t.to_string())
            .collect();
        Self {
            version: LATEST_VOCABULARY_VERSION,
            tokens,
        }
    }

    /// Extend with site-specific tokens. Tokens are sanitized; `BASE` and
    /// tokens that sanitize to nothing are rejected.
    pub fn with_extra_tokens<I, S>(mut self, extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in extra {
            let token = sanitize_token(raw.as_ref());
            if token.is_empty() || token.contains('_') {
                return Err(IdentityError::InvalidConfig(format!(
                    "variant token {:?} is not a single alphanumeric token",
                    raw.as_ref()
                )));
            }
            if token == BASE_VARIANT {
                return Err(IdentityError::InvalidConfig(
                    "BASE is reserved and cannot be a vocabulary token".to_string(),
                ));
            }
            self.tokens.insert(token);
        }
        Ok(self)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// Full two-tier match over free text: explicit `BASE`, best vocabulary
    /// token, first token, then `BASE`.
    pub fn extract_variant_code(&self, source: &str) -> VariantMatch {
        self.match_tokens(&tokenize(source), true)
    }

    /// Match over already tokenized input. With `first_token_fallback` off,
    /// unmatched input resolves to `BASE`.
    pub fn match_tokens(&self, tokens: &[String], first_token_fallback: bool) -> VariantMatch {
        let mut best: Option<&str> = None;
        let mut first: Option<String> = None;

        for raw in tokens {
            let token = sanitize_token(raw);
            if token.is_empty() {
                continue;
            }
            if token == BASE_VARIANT {
                return VariantMatch::base(MatchSource::Explicit);
            }
            if let Some(known) = self.tokens.get(&token) {
                best = Some(match best {
                    Some(current) if !prefer(known, current) => current,
                    _ => known.as_str(),
                });
            }
            if first.is_none() {
                first = Some(token);
            }
        }

        if let Some(code) = best {
            return VariantMatch {
                code: code.to_string(),
                source: MatchSource::Vocabulary,
            };
        }

        match first {
            Some(code) if first_token_fallback => {
                debug!(code = %code, "variant code not in vocabulary, using first token");
                VariantMatch {
                    code,
                    source: MatchSource::FirstToken,
                }
            }
            _ => VariantMatch::base(MatchSource::Fallback),
        }
    }
}

/// Longer token wins; equal lengths fall back to the lexicographically
/// smaller token.
fn prefer(candidate: &str, current: &str) -> bool {
    match candidate.len().cmp(&current.len()) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate < current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> VariantVocabulary {
        VariantVocabulary::latest()
    }

    #[test]
    fn latest_matches_configured_latest_version() {
        let builtin = VariantVocabulary::builtin(LATEST_VOCABULARY_VERSION).unwrap();
        assert_eq!(vocab(), builtin);
        assert!(VariantVocabulary::builtin(LATEST_VOCABULARY_VERSION + 1).is_err());
    }

    #[test]
    fn picks_vocabulary_token() {
        let m = vocab().extract_variant_code("RSI Zeus Mk II CL");
        assert_eq!(m.code, "CL");
        assert_eq!(m.source, MatchSource::Vocabulary);
        assert!(m.is_verified());
    }

    #[test]
    fn explicit_base_short_circuits() {
        let m = vocab().extract_variant_code("Cutlass Black base");
        assert!(m.is_base());
        assert_eq!(m.source, MatchSource::Explicit);
    }

    #[test]
    fn longer_token_wins() {
        assert_eq!(vocab().extract_variant_code("Hornet F7C F7CM").code, "F7CM");
        assert_eq!(vocab().extract_variant_code("Hornet F7CM F7C").code, "F7CM");
    }

    #[test]
    fn equal_length_prefers_lexicographically_smaller() {
        assert_eq!(vocab().extract_variant_code("Aurora MR CL").code, "CL");
        assert_eq!(vocab().extract_variant_code("Aurora CL MR").code, "CL");
    }

    #[test]
    fn unknown_words_fall_back_to_first_token() {
        let m = vocab().extract_variant_code("nomad, special");
        assert_eq!(m.code, "NOMAD");
        assert!(!m.is_verified());
    }

    #[test]
    fn strict_matching_falls_back_to_base() {
        let tokens = tokenize("Nomad");
        let m = vocab().match_tokens(&tokens, false);
        assert!(m.is_base());
        assert_eq!(m.source, MatchSource::Fallback);
    }

    #[test]
    fn empty_input_is_base() {
        let m = vocab().extract_variant_code("  -- ");
        assert_eq!(m.code, BASE_VARIANT);
    }

    #[test]
    fn versions_are_supersets() {
        let v1 = VariantVocabulary::builtin(1).unwrap();
        let v2 = VariantVocabulary::builtin(2).unwrap();
        let v3 = VariantVocabulary::builtin(3).unwrap();
        assert!(v1.tokens().all(|t| v2.contains(t)));
        assert!(v2.tokens().all(|t| v3.contains(t)));
        assert!(v1.len() < v2.len() && v2.len() < v3.len());
        assert_eq!(v3, VariantVocabulary::latest());
        assert!(VariantVocabulary::builtin(4).is_err());
    }

    #[test]
    fn older_version_does_not_know_newer_tokens() {
        let v1 = VariantVocabulary::builtin(1).unwrap();
        assert_eq!(v1.extract_variant_code("Cutlass Red").code, "RED");
        assert_eq!(v1.extract_variant_code("Cutlass Cargo").code, "CUTLASS");
        assert_eq!(vocab().extract_variant_code("Cutlass Cargo").code, "CARGO");
    }

    #[test]
    fn extra_tokens_are_sanitized_and_validated() {
        let v = vocab().with_extra_tokens(["nomad"]).unwrap();
        assert!(v.contains("NOMAD"));

        assert!(vocab().with_extra_tokens(["base"]).is_err());
        assert!(vocab().with_extra_tokens(["--"]).is_err());
        assert!(vocab().with_extra_tokens(["two words"]).is_err());
    }
}
