//! Promotional edition and livery detection. Nothing found here ever takes
//! part in a canonical identity.

use std::collections::BTreeSet;

use hullmark_core::EditionConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, Result};
use crate::tokens::{is_year_token, sanitize_token, title_case, tokenize};

/// Edition/livery qualifiers attached to a member record.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EditionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub livery: Option<String>,
}

impl EditionMetadata {
    pub fn is_empty(&self) -> bool {
        self.edition_code.is_none() && self.livery.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct EditionRules {
    keywords: BTreeSet<String>,
    priority: Vec<String>,
    livery_keywords: BTreeSet<String>,
    livery_label_max_tokens: usize,
    edition_regex: Option<Regex>,
    livery_regex: Option<Regex>,
}

impl EditionRules {
    pub fn new<K, P, L>(
        keywords: K,
        priority: P,
        livery_keywords: L,
        livery_label_max_tokens: usize,
    ) -> Result<Self>
    where
        K: IntoIterator,
        K::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
        L: IntoIterator,
        L::Item: AsRef<str>,
    {
        let keywords = keyword_set(keywords)?;
        let livery_keywords = keyword_set(livery_keywords)?;
        let priority = priority
            .into_iter()
            .map(|p| sanitize_token(p.as_ref()))
            .filter(|p| !p.is_empty())
            .collect();

        let mut all: BTreeSet<String> = keywords.clone();
        all.extend(livery_keywords.iter().cloned());

        Ok(Self {
            edition_regex: build_regex(&all, r"(?:[0-9]{3,4})?")?,
            livery_regex: build_regex(&livery_keywords, "")?,
            keywords,
            priority,
            livery_keywords,
            livery_label_max_tokens: livery_label_max_tokens.max(1),
        })
    }

    pub fn from_config(config: &EditionConfig) -> Result<Self> {
        Self::new(
            &config.keywords,
            &config.priority,
            &config.livery_keywords,
            config.livery_label_max_tokens,
        )
    }

    pub fn is_keyword(&self, token: &str) -> bool {
        self.keywords.contains(token)
    }

    pub fn is_livery_keyword(&self, token: &str) -> bool {
        self.livery_keywords.contains(token)
    }

    /// A keyword, or a keyword with a fused event year (`IAE2954`).
    pub fn is_edition_token(&self, token: &str) -> bool {
        self.is_keyword(token) || self.compound_base(token).is_some()
    }

    fn compound_base<'a>(&self, token: &'a str) -> Option<&'a str> {
        let base = token.trim_end_matches(|c: char| c.is_ascii_digit());
        let digits = &token[base.len()..];
        (is_year_token(digits) && self.is_keyword(base)).then_some(base)
    }

    /// True when the text mentions any edition or livery keyword.
    pub fn mentions_edition(&self, text: &str) -> bool {
        self.edition_regex
            .as_ref()
            .is_some_and(|re| re.is_match(text))
    }

    pub fn detect(&self, name: &str) -> EditionMetadata {
        EditionMetadata {
            edition_code: self.edition_code(name),
            livery: self.livery_label(name),
        }
    }

    fn edition_code(&self, name: &str) -> Option<String> {
        let tokens = tokenize(name);
        let mut collected: Vec<String> = Vec::new();

        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            if self.is_keyword(token) {
                match tokens.get(i + 1).filter(|next| is_year_token(next)) {
                    Some(year) => {
                        collected.push(format!("{token}{year}"));
                        i += 1;
                    }
                    None => collected.push(token.clone()),
                }
            } else if self.compound_base(token).is_some() {
                collected.push(token.clone());
            }
            i += 1;
        }

        self.join_ordered(collected)
    }

    /// Union of two edition codes, ordered the same way `detect` orders a
    /// single name's keywords.
    pub fn merge_codes(&self, first: Option<&str>, second: Option<&str>) -> Option<String> {
        let parts = first
            .into_iter()
            .chain(second)
            .flat_map(|code| code.split('_'))
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();
        self.join_ordered(parts)
    }

    fn join_ordered(&self, mut collected: Vec<String>) -> Option<String> {
        if collected.is_empty() {
            return None;
        }

        collected.sort_by(|a, b| {
            self.priority_rank(a)
                .cmp(&self.priority_rank(b))
                .then_with(|| a.cmp(b))
        });
        collected.dedup();

        let code = sanitize_token(&collected.join("_"));
        (!code.is_empty()).then_some(code)
    }

    fn priority_rank(&self, token: &str) -> usize {
        let base = self.compound_base(token).unwrap_or(token);
        self.priority
            .iter()
            .position(|p| p == base)
            .unwrap_or(self.priority.len())
    }

    fn livery_label(&self, name: &str) -> Option<String> {
        let re = self.livery_regex.as_ref()?;
        let caps = re.captures(name)?;
        let keyword = caps.get(1)?;

        let label: Vec<String> = tokenize(&name[keyword.end()..])
            .into_iter()
            .take(self.livery_label_max_tokens)
            .map(|t| title_case(&t))
            .collect();

        (!label.is_empty()).then(|| label.join(" "))
    }

    /// Marks the tokens that belong to an edition or livery qualifier: the
    /// keywords, a year trailing an edition keyword, and the livery label.
    pub fn edition_span_mask(&self, tokens: &[String]) -> Vec<bool> {
        let mut mask = vec![false; tokens.len()];
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            if self.is_livery_keyword(token) {
                let end = (i + 1 + self.livery_label_max_tokens).min(tokens.len());
                mask[i..end].iter_mut().for_each(|m| *m = true);
                i = end;
                continue;
            }
            if self.is_edition_token(token) {
                mask[i] = true;
                if self.is_keyword(token)
                    && tokens.get(i + 1).is_some_and(|next| is_year_token(next))
                {
                    mask[i + 1] = true;
                    i += 1;
                }
            }
            i += 1;
        }
        mask
    }

    /// Tokens with every edition/livery span removed.
    pub fn strip_spans(&self, tokens: &[String]) -> Vec<String> {
        let mask = self.edition_span_mask(tokens);
        tokens
            .iter()
            .zip(mask)
            .filter(|(_, masked)| !masked)
            .map(|(t, _)| t.clone())
            .collect()
    }
}

fn keyword_set<I>(raw: I) -> Result<BTreeSet<String>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    raw.into_iter()
        .map(|k| {
            let token = sanitize_token(k.as_ref());
            if token.is_empty() || token.contains('_') {
                Err(IdentityError::InvalidConfig(format!(
                    "edition keyword {:?} is not a single alphanumeric token",
                    k.as_ref()
                )))
            } else {
                Ok(token)
            }
        })
        .collect()
}

fn build_regex(keywords: &BTreeSet<String>, suffix: &str) -> Result<Option<Regex>> {
    if keywords.is_empty() {
        return Ok(None);
    }

    let mut ordered: Vec<&String> = keywords.iter().collect();
    ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let alternation = ordered
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");

    let pattern = format!(r"(?i)(?:^|[^\p{{L}}\p{{N}}])({alternation}){suffix}(?:$|[^\p{{L}}\p{{N}}])");
    Regex::new(&pattern)
        .map(Some)
        .map_err(|e| IdentityError::InvalidConfig(format!("edition pattern: {e}")))
}
