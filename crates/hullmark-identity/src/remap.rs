//! Old identity → canonical identity table, and the cascade that repoints
//! dependent records through it.

use std::collections::{BTreeMap, BTreeSet};

use hullmark_core::DependentRecord;
use serde::Serialize;
use tracing::warn;

use crate::dedup::DuplicateMetadata;

/// Every raw identifier seen in a pass, keeper or duplicate, mapped to the
/// canonical variant id it resolved to. Prior external ids and the
/// canonical ids themselves are carried as aliases of a raw identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemapTable {
    entries: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    aliases: BTreeMap<String, String>,
}

impl RemapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous canonical id if `raw_id` was already mapped.
    pub fn insert(
        &mut self,
        raw_id: impl Into<String>,
        canonical_id: impl Into<String>,
    ) -> Option<String> {
        let raw_id = raw_id.into();
        self.aliases.remove(&raw_id);
        self.entries.insert(raw_id, canonical_id.into())
    }

    /// Alias an extra identifier to `raw_id`. Never shadows an existing raw
    /// identifier or alias; returns whether the alias was added.
    pub fn insert_alias(&mut self, alias: &str, raw_id: &str) -> bool {
        if self.entries.contains_key(alias) || self.aliases.contains_key(alias) {
            return false;
        }
        if !self.entries.contains_key(raw_id) {
            return false;
        }
        self.aliases.insert(alias.to_string(), raw_id.to_string());
        true
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        let raw_id = self.source_of(id);
        self.entries.get(raw_id).map(String::as_str)
    }

    /// The raw identifier behind `id` (itself unless it is an alias).
    pub fn source_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.aliases.get(id).map(String::as_str).unwrap_or(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Number of raw identifiers (aliases not counted).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A record holding a variant identity reference plus optional
/// edition/livery values of its own.
pub trait VariantLinked {
    fn variant_ref(&self) -> &str;
    fn set_variant_ref(&mut self, canonical_id: String);
    fn edition_code_mut(&mut self) -> &mut Option<String>;
    fn livery_mut(&mut self) -> &mut Option<String>;
    fn label(&self) -> String;
}

impl VariantLinked for DependentRecord {
    fn variant_ref(&self) -> &str {
        &self.variant_ref
    }

    fn set_variant_ref(&mut self, canonical_id: String) {
        self.variant_ref = canonical_id;
    }

    fn edition_code_mut(&mut self) -> &mut Option<String> {
        &mut self.edition_code
    }

    fn livery_mut(&mut self) -> &mut Option<String> {
        &mut self.livery
    }

    fn label(&self) -> String {
        format!("{}:{}", self.kind.as_str(), self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub rewritten: usize,
    pub unchanged: usize,
    /// Dependents that received edition or livery metadata from a duplicate.
    pub metadata_carried: usize,
    /// Dependents whose reference is not in the remap table; left as-is.
    pub misses: Vec<String>,
    /// Dependents removed because their variant failed resolution entirely.
    pub dropped: Vec<String>,
}

/// Repoint `dependents` at canonical ids.
///
/// Metadata recorded against a duplicate only fills empty fields on the
/// dependent. Dependents whose reference is in `unresolved` are removed;
/// any other reference missing from the table is reported and kept.
pub fn cascade<T: VariantLinked>(
    table: &RemapTable,
    duplicates: &BTreeMap<String, DuplicateMetadata>,
    unresolved: &BTreeSet<String>,
    dependents: &mut Vec<T>,
) -> CascadeReport {
    let mut report = CascadeReport::default();

    dependents.retain_mut(|dependent| {
        let reference = dependent.variant_ref().to_string();

        let Some(canonical) = table.get(&reference) else {
            if unresolved.contains(&reference) {
                warn!(
                    dependent = %dependent.label(),
                    reference = %reference,
                    "dropping dependent of unresolved record"
                );
                report.dropped.push(dependent.label());
                return false;
            }
            warn!(
                dependent = %dependent.label(),
                reference = %reference,
                "reference missing from remap table"
            );
            report.misses.push(dependent.label());
            return true;
        };

        if canonical != reference {
            dependent.set_variant_ref(canonical.to_string());
            report.rewritten += 1;
        } else {
            report.unchanged += 1;
        }

        if let Some(meta) = duplicates.get(table.source_of(&reference))
            && carry_metadata(dependent, meta)
        {
            report.metadata_carried += 1;
        }
        true
    });

    report
}

fn carry_metadata<T: VariantLinked>(dependent: &mut T, meta: &DuplicateMetadata) -> bool {
    let mut carried = false;

    let edition = dependent.edition_code_mut();
    if edition.is_none() && meta.edition_code.is_some() {
        *edition = meta.edition_code.clone();
        carried = true;
    }

    let livery = dependent.livery_mut();
    if livery.is_none()
        && let Some(label) = meta.livery_label()
    {
        *livery = Some(label);
        carried = true;
    }

    carried
}

#[cfg(test)]
mod tests {
    use super::*;
    use hullmark_core::DependentKind;

    fn table() -> RemapTable {
        let mut table = RemapTable::new();
        table.insert("A", "RSI_AURORA_MR");
        table.insert("B", "RSI_AURORA_MR");
        assert!(table.insert_alias("RSI_AURORA_MR", "B"));
        table
    }

    fn duplicates() -> BTreeMap<String, DuplicateMetadata> {
        let mut map = BTreeMap::new();
        map.insert(
            "A".to_string(),
            DuplicateMetadata {
                canonical_id: "RSI_AURORA_MR".to_string(),
                edition_code: Some("IAE2954".to_string()),
                liveries: ["Crimson Star".to_string()].into_iter().collect(),
                names: ["Aurora MR IAE 2954".to_string()].into_iter().collect(),
                descriptions: BTreeSet::new(),
            },
        );
        map
    }

    fn stats(id: &str, reference: &str) -> DependentRecord {
        DependentRecord::new(id, DependentKind::Statistics, reference)
    }

    #[test]
    fn alias_requires_known_raw_id_and_never_shadows() {
        let mut table = table();
        assert!(!table.insert_alias("A", "B"));
        assert!(!table.insert_alias("X", "missing"));
        assert_eq!(table.get("RSI_AURORA_MR"), Some("RSI_AURORA_MR"));
        assert_eq!(table.source_of("RSI_AURORA_MR"), "B");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn rewrites_and_carries_metadata_from_duplicate() {
        let mut deps = vec![stats("s1", "A")];
        let report = cascade(&table(), &duplicates(), &BTreeSet::new(), &mut deps);

        assert_eq!(report.rewritten, 1);
        assert_eq!(report.metadata_carried, 1);
        assert_eq!(deps[0].variant_ref, "RSI_AURORA_MR");
        assert_eq!(deps[0].edition_code.as_deref(), Some("IAE2954"));
        assert_eq!(deps[0].livery.as_deref(), Some("Crimson Star"));
    }

    #[test]
    fn explicit_values_are_never_overwritten() {
        let mut dep = stats("s1", "A");
        dep.edition_code = Some("WARBOND".to_string());
        let mut deps = vec![dep];
        cascade(&table(), &duplicates(), &BTreeSet::new(), &mut deps);

        assert_eq!(deps[0].edition_code.as_deref(), Some("WARBOND"));
        assert_eq!(deps[0].livery.as_deref(), Some("Crimson Star"));
    }

    #[test]
    fn canonical_reference_is_unchanged_and_idempotent() {
        let mut deps = vec![stats("s1", "RSI_AURORA_MR"), stats("s2", "A")];
        let first = cascade(&table(), &duplicates(), &BTreeSet::new(), &mut deps);
        assert_eq!(first.unchanged, 1);
        assert_eq!(first.rewritten, 1);

        let snapshot = deps.clone();
        let second = cascade(&table(), &duplicates(), &BTreeSet::new(), &mut deps);
        assert_eq!(second.rewritten, 0);
        assert_eq!(second.unchanged, 2);
        assert_eq!(deps, snapshot);
    }

    #[test]
    fn misses_are_kept_and_unresolved_are_dropped() {
        let unresolved: BTreeSet<String> = ["E".to_string()].into_iter().collect();
        let mut deps = vec![
            stats("s1", "UNKNOWN_REF"),
            DependentRecord::new("h1", DependentKind::Hardpoint, "E"),
        ];
        let report = cascade(&table(), &duplicates(), &unresolved, &mut deps);

        assert_eq!(report.misses, vec!["statistics:s1"]);
        assert_eq!(report.dropped, vec!["hardpoint:h1"]);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].variant_ref, "UNKNOWN_REF");
    }
}
