//! Grouping and merge resolver: buckets raw records by canonical variant id,
//! picks one keeper per bucket and folds the rest into it.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use hullmark_core::{IdentityConfig, RawRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::edition::EditionRules;
use crate::keys::canonical_variant_name;
use crate::remap::{CascadeReport, RemapTable, VariantLinked, cascade};
use crate::rules::{CanonicalIdentity, IdentityRules};
use crate::tokens::title_case;
use crate::vocabulary::{BASE_VARIANT, MatchSource};
use crate::Result;

/// Per-record problems. They never abort a pass; the record is left out
/// and the rest of the batch resolves normally.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionIssue {
    #[error("record {designation:?} has no usable identifier")]
    MissingIdentifier { designation: Option<String> },

    #[error("record {id} has no name, class name or external id")]
    MissingDesignation { id: String },

    #[error("record {id} has no resolvable manufacturer reference")]
    MissingManufacturerReference { id: String },

    #[error("record {id} resolved to variant code {code}, which is not in the vocabulary")]
    AmbiguousVariantMatch { id: String, code: String },

    /// Records sharing a raw identifier disagreed on its canonical id. The
    /// smallest canonical id is kept; records resolving elsewhere are left out.
    #[error("record {id} also resolved to {dropped}; kept {kept}")]
    ConflictingIdentifier {
        id: String,
        kept: String,
        dropped: String,
    },
}

/// One raw identifier's contribution to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupMember {
    pub raw_id: String,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub external_ids: BTreeSet<String>,
    /// The record already claimed the canonical variant id as its identity.
    pub exact_match: bool,
    pub edition_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edition_code: Option<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub liveries: BTreeSet<String>,
    pub variant_source: MatchSource,
    pub names: BTreeSet<String>,
    pub descriptions: BTreeSet<String>,
    pub class_names: BTreeSet<String>,
    #[serde(skip)]
    pub record: RawRecord,
}

impl GroupMember {
    fn new(raw_id: &str, record: &RawRecord, identity: &CanonicalIdentity) -> Self {
        Self {
            raw_id: raw_id.to_string(),
            external_ids: record
                .external_id
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty() && *e != raw_id)
                .map(str::to_string)
                .into_iter()
                .collect(),
            exact_match: record.claims_identity(&identity.variant_id),
            edition_only: identity.edition_only,
            edition_code: identity.edition.edition_code.clone(),
            liveries: identity.edition.livery.iter().cloned().collect(),
            variant_source: identity.variant.source,
            names: record.display_name().map(str::to_string).into_iter().collect(),
            descriptions: record
                .description_text()
                .map(str::to_string)
                .into_iter()
                .collect(),
            class_names: record
                .class_name
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .into_iter()
                .collect(),
            record: record.clone(),
        }
    }

    /// Fold another record carrying the same raw identifier into this one.
    /// Nothing the other record carried is dropped.
    fn absorb(&mut self, other: GroupMember, editions: &EditionRules) {
        self.exact_match |= other.exact_match;
        self.edition_only &= other.edition_only;
        self.external_ids.extend(other.external_ids);
        self.edition_code =
            editions.merge_codes(self.edition_code.as_deref(), other.edition_code.as_deref());
        self.liveries.extend(other.liveries);
        if self.variant_source > other.variant_source {
            self.variant_source = other.variant_source;
        }
        self.names.extend(other.names);
        self.descriptions.extend(other.descriptions);
        self.class_names.extend(other.class_names);
    }

    pub fn display_name(&self) -> Option<&str> {
        self.names.iter().next().map(String::as_str)
    }
}

/// Keeper first: a record already carrying the canonical id, then records
/// that are not edition-only, then the smallest raw identifier.
fn keeper_order(a: &GroupMember, b: &GroupMember) -> Ordering {
    b.exact_match
        .cmp(&a.exact_match)
        .then_with(|| a.edition_only.cmp(&b.edition_only))
        .then_with(|| a.raw_id.cmp(&b.raw_id))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalVariantGroup {
    pub variant_id: String,
    pub hull_key: String,
    pub manufacturer_code: String,
    pub family_name: String,
    pub variant_code: String,
    pub variant_verified: bool,
    pub base_name: String,
    pub names: BTreeSet<String>,
    pub descriptions: BTreeSet<String>,
    pub class_names: BTreeSet<String>,
    /// Sorted by keeper order; never empty, the keeper is first.
    pub members: Vec<GroupMember>,
}

impl CanonicalVariantGroup {
    pub fn keeper(&self) -> &GroupMember {
        &self.members[0]
    }

    pub fn duplicates(&self) -> &[GroupMember] {
        &self.members[1..]
    }

    /// The keeper's own name unless it only names an edition, else the
    /// canonical name built from family and variant code.
    pub fn display_name(&self) -> String {
        let keeper = self.keeper();
        match keeper.display_name() {
            Some(name) if !keeper.edition_only => name.to_string(),
            _ => self.base_name.clone(),
        }
    }

    pub fn description(&self) -> Option<String> {
        longest(&self.descriptions)
    }
}

/// What a duplicate leaves behind once merged, keyed by its raw identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateMetadata {
    pub canonical_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition_code: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub liveries: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub names: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub descriptions: BTreeSet<String>,
}

impl DuplicateMetadata {
    /// Every livery label, comma-joined in sorted order.
    pub fn livery_label(&self) -> Option<String> {
        if self.liveries.is_empty() {
            return None;
        }
        Some(
            self.liveries
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

/// Upsert-ready view of one canonical variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantProjection {
    pub variant_id: String,
    pub hull_key: String,
    pub variant_code: String,
    pub display_name: String,
    pub description: Option<String>,
    pub vocabulary_version: u32,
    pub keeper_id: String,
    pub duplicate_ids: Vec<String>,
}

/// Upsert-ready view of one hull family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HullProjection {
    pub hull_key: String,
    pub manufacturer_code: String,
    pub family_name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub class_name: Option<String>,
    pub variant_ids: Vec<String>,
}

/// Output of one resolution pass. Every collection is sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub vocabulary_version: u32,
    pub groups: Vec<CanonicalVariantGroup>,
    pub hulls: Vec<HullProjection>,
    pub remap: RemapTable,
    pub duplicates: BTreeMap<String, DuplicateMetadata>,
    /// Raw identifiers skipped because no manufacturer could be resolved.
    pub unresolved: BTreeSet<String>,
    pub issues: Vec<ResolutionIssue>,
}

impl Resolution {
    pub fn group(&self, variant_id: &str) -> Option<&CanonicalVariantGroup> {
        self.groups
            .binary_search_by(|g| g.variant_id.as_str().cmp(variant_id))
            .ok()
            .map(|idx| &self.groups[idx])
    }

    pub fn variants(&self) -> Vec<VariantProjection> {
        self.groups
            .iter()
            .map(|group| VariantProjection {
                variant_id: group.variant_id.clone(),
                hull_key: group.hull_key.clone(),
                variant_code: group.variant_code.clone(),
                display_name: group.display_name(),
                description: group.description(),
                vocabulary_version: self.vocabulary_version,
                keeper_id: group.keeper().raw_id.clone(),
                duplicate_ids: group.duplicates().iter().map(|m| m.raw_id.clone()).collect(),
            })
            .collect()
    }

    /// Every non-keeper raw identifier, for deleting redundant rows.
    pub fn redundant_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .groups
            .iter()
            .flat_map(|g| g.duplicates().iter().map(|m| m.raw_id.clone()))
            .collect();
        ids.sort();
        ids
    }

    /// The raw record each group kept, in variant-id order.
    pub fn keeper_records(&self) -> Vec<RawRecord> {
        self.groups.iter().map(|g| g.keeper().record.clone()).collect()
    }

    pub fn cascade<T: VariantLinked>(&self, dependents: &mut Vec<T>) -> CascadeReport {
        cascade(&self.remap, &self.duplicates, &self.unresolved, dependents)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

struct GroupBuilder {
    identity: CanonicalIdentity,
    members: BTreeMap<String, GroupMember>,
}

#[derive(Default)]
struct Pass {
    groups: BTreeMap<String, GroupBuilder>,
    unresolved: BTreeSet<String>,
    issues: Vec<ResolutionIssue>,
}

impl Pass {
    fn skip(&mut self, record: &RawRecord, issue: ResolutionIssue) {
        warn!(issue = %issue, "skipping record");
        if let ResolutionIssue::MissingManufacturerReference { id } = &issue {
            self.unresolved.insert(id.clone());
            if let Some(ext) = record.external_id.as_deref().map(str::trim)
                && !ext.is_empty()
            {
                self.unresolved.insert(ext.to_string());
            }
        }
        self.issues.push(issue);
    }
}

#[derive(Debug, Clone)]
pub struct Resolver {
    rules: IdentityRules,
}

impl Resolver {
    pub fn new(rules: IdentityRules) -> Self {
        Self { rules }
    }

    pub fn from_config(config: &IdentityConfig) -> Result<Self> {
        Ok(Self::new(IdentityRules::from_config(config)?))
    }

    pub fn rules(&self) -> &IdentityRules {
        &self.rules
    }

    /// Canonical identity of a single record, or why it has none.
    pub fn identify(
        &self,
        record: &RawRecord,
    ) -> std::result::Result<(String, CanonicalIdentity), ResolutionIssue> {
        let Some(raw_id) = record.identifier() else {
            return Err(ResolutionIssue::MissingIdentifier {
                designation: record.designation().map(str::to_string),
            });
        };
        let Some(designation) = record.designation() else {
            return Err(ResolutionIssue::MissingDesignation {
                id: raw_id.to_string(),
            });
        };
        let Some(manufacturer) = self.rules.manufacturer_for(record) else {
            return Err(ResolutionIssue::MissingManufacturerReference {
                id: raw_id.to_string(),
            });
        };

        let identity =
            self.rules
                .identify(designation, record.variant_code.as_deref(), &manufacturer);
        Ok((raw_id.to_string(), identity))
    }

    /// Resolve a batch. The result depends only on the set of distinct
    /// records, not on their order. Dirty records are reported as issues
    /// and never stop the rest of the batch.
    pub fn resolve(&self, records: &[RawRecord]) -> Resolution {
        let mut unique: Vec<&RawRecord> = records.iter().collect();
        unique.sort();
        unique.dedup();

        let mut pass = Pass::default();
        let mut identified = Vec::with_capacity(unique.len());
        for record in &unique {
            match self.identify(record) {
                Ok((raw_id, identity)) => identified.push((*record, raw_id, identity)),
                Err(issue) => pass.skip(record, issue),
            }
        }

        // Each raw identifier keeps the smallest canonical id it resolved to.
        let mut chosen: BTreeMap<String, String> = BTreeMap::new();
        for (_, raw_id, identity) in &identified {
            chosen
                .entry(raw_id.clone())
                .and_modify(|kept| {
                    if identity.variant_id < *kept {
                        kept.clone_from(&identity.variant_id);
                    }
                })
                .or_insert_with(|| identity.variant_id.clone());
        }

        for (record, raw_id, identity) in identified {
            let kept = &chosen[&raw_id];
            if *kept != identity.variant_id {
                let issue = ResolutionIssue::ConflictingIdentifier {
                    id: raw_id,
                    kept: kept.clone(),
                    dropped: identity.variant_id,
                };
                warn!(issue = %issue, "skipping conflicting record");
                pass.issues.push(issue);
                continue;
            }
            self.collect(record, raw_id, identity, &mut pass);
        }

        let resolution = self.finish(pass);
        info!(
            records = unique.len(),
            groups = resolution.groups.len(),
            hulls = resolution.hulls.len(),
            duplicates = resolution.duplicates.len(),
            unresolved = resolution.unresolved.len(),
            issues = resolution.issues.len(),
            "resolution pass complete"
        );
        resolution
    }

    fn collect(
        &self,
        record: &RawRecord,
        raw_id: String,
        identity: CanonicalIdentity,
        pass: &mut Pass,
    ) {
        if !identity.variant.is_verified() {
            debug!(id = %raw_id, code = %identity.variant.code, "unverified variant code");
            pass.issues.push(ResolutionIssue::AmbiguousVariantMatch {
                id: raw_id.clone(),
                code: identity.variant.code.clone(),
            });
        }

        let member = GroupMember::new(&raw_id, record, &identity);
        let builder = pass
            .groups
            .entry(identity.variant_id.clone())
            .or_insert_with(|| GroupBuilder {
                identity,
                members: BTreeMap::new(),
            });
        match builder.members.get_mut(&raw_id) {
            Some(existing) => existing.absorb(member, &self.rules.editions),
            None => {
                builder.members.insert(raw_id, member);
            }
        }
    }

    fn finish(&self, pass: Pass) -> Resolution {
        let mut groups = Vec::with_capacity(pass.groups.len());
        let mut duplicates = BTreeMap::new();
        let mut remap = RemapTable::new();

        for (variant_id, builder) in pass.groups {
            let group = select_and_merge(variant_id, builder);

            for member in &group.members {
                remap.insert(member.raw_id.clone(), group.variant_id.clone());
            }
            for member in group.duplicates() {
                duplicates.insert(
                    member.raw_id.clone(),
                    DuplicateMetadata {
                        canonical_id: group.variant_id.clone(),
                        edition_code: member.edition_code.clone(),
                        liveries: member.liveries.clone(),
                        names: member.names.clone(),
                        descriptions: member.descriptions.clone(),
                    },
                );
            }
            groups.push(group);
        }

        // Aliases go in only after every raw identifier is present, so an
        // external id can never shadow another record's raw identifier.
        for group in &groups {
            for member in &group.members {
                for ext in &member.external_ids {
                    if !remap.insert_alias(ext, &member.raw_id)
                        && remap.get(ext) != Some(group.variant_id.as_str())
                    {
                        warn!(
                            external_id = %ext,
                            raw_id = %member.raw_id,
                            "external id already mapped elsewhere, alias ignored"
                        );
                    }
                }
            }
            remap.insert_alias(&group.variant_id, &group.keeper().raw_id);
        }

        let mut unresolved = pass.unresolved;
        unresolved.retain(|id| !remap.contains(id));

        Resolution {
            vocabulary_version: self.rules.vocabulary.version(),
            hulls: project_hulls(&groups),
            groups,
            remap,
            duplicates,
            unresolved,
            issues: pass.issues,
        }
    }
}

fn select_and_merge(variant_id: String, builder: GroupBuilder) -> CanonicalVariantGroup {
    let identity = builder.identity;
    let mut members: Vec<GroupMember> = builder.members.into_values().collect();
    members.sort_by(keeper_order);

    let mut names = BTreeSet::new();
    let mut descriptions = BTreeSet::new();
    let mut class_names = BTreeSet::new();
    for (idx, member) in members.iter().enumerate() {
        class_names.extend(member.class_names.iter().cloned());
        if idx == 0 || !member.edition_only {
            names.extend(member.names.iter().cloned());
            descriptions.extend(member.descriptions.iter().cloned());
        }
    }

    debug!(
        variant_id = %variant_id,
        keeper = %members[0].raw_id,
        duplicates = members.len() - 1,
        "selected keeper"
    );

    CanonicalVariantGroup {
        base_name: canonical_variant_name(&identity.family_name, &identity.variant.code),
        variant_verified: identity.variant.is_verified(),
        variant_code: identity.variant.code,
        hull_key: identity.hull_key,
        manufacturer_code: identity.manufacturer_code,
        family_name: identity.family_name,
        variant_id,
        names,
        descriptions,
        class_names,
        members,
    }
}

fn project_hulls(groups: &[CanonicalVariantGroup]) -> Vec<HullProjection> {
    let mut by_hull: BTreeMap<&str, Vec<&CanonicalVariantGroup>> = BTreeMap::new();
    for group in groups {
        by_hull.entry(group.hull_key.as_str()).or_default().push(group);
    }

    by_hull
        .into_values()
        .map(|variants| {
            let first = variants[0];
            let display_name = variants
                .iter()
                .find(|g| g.variant_code == BASE_VARIANT)
                .map(|g| g.display_name())
                .unwrap_or_else(|| title_case(&first.family_name));
            let descriptions: BTreeSet<String> = variants
                .iter()
                .flat_map(|g| g.descriptions.iter().cloned())
                .collect();

            HullProjection {
                hull_key: first.hull_key.clone(),
                manufacturer_code: first.manufacturer_code.clone(),
                family_name: first.family_name.clone(),
                display_name,
                description: longest(&descriptions),
                class_name: variants
                    .iter()
                    .flat_map(|g| g.class_names.iter())
                    .min()
                    .cloned(),
                variant_ids: variants.iter().map(|g| g.variant_id.clone()).collect(),
            }
        })
        .collect()
}

/// Longest value; equal lengths prefer the lexicographically smaller one.
fn longest(values: &BTreeSet<String>) -> Option<String> {
    values
        .iter()
        .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
        .cloned()
}
