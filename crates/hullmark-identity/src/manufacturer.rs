//! Manufacturer directory and the token filter that keeps manufacturer
//! names out of hull family names.

use std::collections::{BTreeMap, BTreeSet};

use hullmark_core::{ManufacturerEntry, ManufacturerRef};

use crate::tokens::{sanitize_token, tokenize};

/// A manufacturer reference resolved to a code plus whatever names are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedManufacturer {
    pub code: String,
    pub name: Option<String>,
    pub aliases: Vec<String>,
}

impl ResolvedManufacturer {
    fn bare(code: String) -> Self {
        Self {
            code,
            name: None,
            aliases: Vec::new(),
        }
    }

    /// Every token a family name must not repeat.
    pub fn tokens(&self) -> BTreeSet<String> {
        let mut others: Vec<&str> = self.aliases.iter().map(String::as_str).collect();
        if let Some(name) = self.name.as_deref() {
            others.push(name);
        }
        collect_manufacturer_tokens(&self.code, &others)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManufacturerDirectory {
    entries: Vec<ManufacturerEntry>,
    by_code: BTreeMap<String, usize>,
    by_id: BTreeMap<u64, usize>,
    by_name: BTreeMap<String, usize>,
}

impl ManufacturerDirectory {
    pub fn new(entries: Vec<ManufacturerEntry>) -> Self {
        let mut directory = Self::default();
        for entry in entries {
            directory.insert(entry);
        }
        directory
    }

    /// First entry wins on a code, id or name collision.
    fn insert(&mut self, entry: ManufacturerEntry) {
        let code = sanitize_token(&entry.code);
        if code.is_empty() {
            return;
        }
        let idx = self.entries.len();

        self.by_code.entry(code.clone()).or_insert(idx);
        if let Some(id) = entry.id {
            self.by_id.entry(id).or_insert(idx);
        }
        let names = entry
            .name
            .iter()
            .chain(entry.aliases.iter())
            .map(|n| sanitize_token(n))
            .chain(std::iter::once(code));
        for name in names.filter(|n| !n.is_empty()) {
            self.by_name.entry(name).or_insert(idx);
        }
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a record's reference. Unknown codes and names still resolve
    /// (to their sanitized form); an unknown numeric id does not.
    pub fn resolve(&self, reference: &ManufacturerRef) -> Option<ResolvedManufacturer> {
        match reference {
            ManufacturerRef::Code(code) => {
                let code = sanitize_token(code);
                if code.is_empty() {
                    return None;
                }
                Some(
                    self.by_code
                        .get(&code)
                        .map(|idx| self.resolved(*idx))
                        .unwrap_or_else(|| ResolvedManufacturer::bare(code)),
                )
            }
            ManufacturerRef::Name(name) => {
                let key = sanitize_token(name);
                if key.is_empty() {
                    return None;
                }
                Some(match self.by_name.get(&key) {
                    Some(idx) => self.resolved(*idx),
                    None => ResolvedManufacturer {
                        code: key,
                        name: Some(name.trim().to_string()),
                        aliases: Vec::new(),
                    },
                })
            }
            ManufacturerRef::Id(id) => self.by_id.get(id).map(|idx| self.resolved(*idx)),
        }
    }

    /// Resolve a bare code only when the directory knows it. Used for the
    /// fallback code taken from an external id or a designation.
    pub fn resolve_known_code(&self, code: &str) -> Option<ResolvedManufacturer> {
        self.by_code
            .get(&sanitize_token(code))
            .map(|idx| self.resolved(*idx))
    }

    fn resolved(&self, idx: usize) -> ResolvedManufacturer {
        let entry = &self.entries[idx];
        ResolvedManufacturer {
            code: sanitize_token(&entry.code),
            name: entry.name.clone(),
            aliases: entry.aliases.clone(),
        }
    }
}

/// Sanitized and tokenized forms of the code and every other manufacturer
/// string. A code ending in `S` also contributes its singular form.
pub fn collect_manufacturer_tokens(code: &str, others: &[&str]) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();

    let sanitized_code = sanitize_token(code);
    if let Some(singular) = sanitized_code.strip_suffix('S')
        && !singular.is_empty()
    {
        tokens.insert(singular.to_string());
    }

    for value in std::iter::once(code).chain(others.iter().copied()) {
        let whole = sanitize_token(value);
        if !whole.is_empty() {
            tokens.insert(whole);
        }
        tokens.extend(tokenize(value));
    }
    tokens
}

/// Token-overlap rules used when stripping manufacturer tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchingPolicy {
    /// Both tokens must be at least this long before prefix matching
    /// applies; exact equality always matches. Zero disables the limit.
    pub prefix_min_len: usize,
}

impl MatchingPolicy {
    pub fn new(prefix_min_len: usize) -> Self {
        Self { prefix_min_len }
    }

    /// Equal, or one is a prefix of the other. Short tokens over-match
    /// here (a one-letter alias swallows every family token starting with
    /// that letter); `prefix_min_len` is the knob that tightens it.
    pub fn overlaps_manufacturer_token(&self, token: &str, candidate: &str) -> bool {
        if token == candidate {
            return true;
        }
        if token.len() < self.prefix_min_len || candidate.len() < self.prefix_min_len {
            return false;
        }
        token.starts_with(candidate) || candidate.starts_with(token)
    }

    pub fn matches_any(&self, token: &str, manufacturer_tokens: &BTreeSet<String>) -> bool {
        manufacturer_tokens
            .iter()
            .any(|candidate| self.overlaps_manufacturer_token(token, candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> ManufacturerDirectory {
        ManufacturerDirectory::new(vec![
            ManufacturerEntry::new("RSI", "Roberts Space Industries").with_id(1),
            ManufacturerEntry::new("AEGS", "Aegis Dynamics")
                .with_id(2)
                .with_aliases(&["Aegis"]),
        ])
    }

    #[test]
    fn collects_code_name_and_singular_forms() {
        let tokens = collect_manufacturer_tokens("AEGS", &["Aegis Dynamics"]);
        for expected in ["AEGS", "AEG", "AEGIS", "DYNAMICS", "AEGIS_DYNAMICS"] {
            assert!(tokens.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn single_s_code_has_no_empty_singular() {
        let tokens = collect_manufacturer_tokens("S", &[]);
        assert_eq!(tokens.into_iter().collect::<Vec<_>>(), vec!["S"]);
    }

    #[test]
    fn resolves_code_name_and_id() {
        let dir = directory();
        let by_code = dir.resolve(&ManufacturerRef::Code("rsi".into())).unwrap();
        let by_name = dir
            .resolve(&ManufacturerRef::Name("Roberts Space Industries".into()))
            .unwrap();
        let by_id = dir.resolve(&ManufacturerRef::Id(1)).unwrap();
        assert_eq!(by_code, by_name);
        assert_eq!(by_code, by_id);
        assert_eq!(by_code.code, "RSI");

        let by_alias = dir.resolve(&ManufacturerRef::Name("aegis".into())).unwrap();
        assert_eq!(by_alias.code, "AEGS");
    }

    #[test]
    fn unknown_code_and_name_resolve_bare_but_unknown_id_does_not() {
        let dir = directory();
        assert_eq!(
            dir.resolve(&ManufacturerRef::Code("Gama".into())).unwrap().code,
            "GAMA"
        );
        assert_eq!(
            dir.resolve(&ManufacturerRef::Name("Gatac Manufacture".into()))
                .unwrap()
                .code,
            "GATAC_MANUFACTURE"
        );
        assert!(dir.resolve(&ManufacturerRef::Id(99)).is_none());
        assert!(dir.resolve_known_code("GAMA").is_none());
        assert!(dir.resolve_known_code("aegs").is_some());
    }

    #[test]
    fn prefix_overlap_is_bidirectional() {
        let policy = MatchingPolicy::default();
        assert!(policy.overlaps_manufacturer_token("AEGIS", "AEG"));
        assert!(policy.overlaps_manufacturer_token("AEG", "AEGIS"));
        assert!(!policy.overlaps_manufacturer_token("ZEUS", "RSI"));
    }

    #[test]
    fn prefix_min_len_tightens_short_tokens() {
        let loose = MatchingPolicy::default();
        let tight = MatchingPolicy::new(3);
        assert!(loose.overlaps_manufacturer_token("ANDROMEDA", "A"));
        assert!(!tight.overlaps_manufacturer_token("ANDROMEDA", "A"));
        assert!(tight.overlaps_manufacturer_token("A", "A"));
        assert!(tight.overlaps_manufacturer_token("AEGIS", "AEG"));
    }
}
