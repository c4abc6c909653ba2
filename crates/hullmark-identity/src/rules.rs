//! Immutable rule set a resolver is built from. Separate instances never
//! share state, so two resolvers can run different vocabulary versions.

use hullmark_core::{IdentityConfig, RawRecord};
use serde::{Deserialize, Serialize};

use crate::edition::{EditionMetadata, EditionRules};
use crate::family::FamilyFilter;
use crate::keys::{build_hull_key, to_canonical_variant_ext_id};
use crate::manufacturer::{ManufacturerDirectory, MatchingPolicy, ResolvedManufacturer};
use crate::tokens::{designation_tokens, tokenize};
use crate::vocabulary::{VariantMatch, VariantVocabulary};
use crate::Result;

#[derive(Debug, Clone)]
pub struct IdentityRules {
    pub vocabulary: VariantVocabulary,
    pub editions: EditionRules,
    pub manufacturers: ManufacturerDirectory,
    pub policy: MatchingPolicy,
}

/// Everything derived from one raw record before grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalIdentity {
    pub manufacturer_code: String,
    pub family_name: String,
    pub hull_key: String,
    pub variant: VariantMatch,
    pub variant_id: String,
    pub edition: EditionMetadata,
    pub edition_only: bool,
}

impl IdentityRules {
    pub fn new(
        vocabulary: VariantVocabulary,
        editions: EditionRules,
        manufacturers: ManufacturerDirectory,
        policy: MatchingPolicy,
    ) -> Self {
        Self {
            vocabulary,
            editions,
            manufacturers,
            policy,
        }
    }

    pub fn from_config(config: &IdentityConfig) -> Result<Self> {
        config.validate()?;
        let vocabulary = VariantVocabulary::builtin(config.vocabulary.version)?
            .with_extra_tokens(&config.vocabulary.extra_tokens)?;
        Ok(Self {
            vocabulary,
            editions: EditionRules::from_config(&config.editions)?,
            manufacturers: ManufacturerDirectory::new(config.manufacturers.clone()),
            policy: MatchingPolicy::new(config.matching.manufacturer_prefix_min_len),
        })
    }

    /// Variant code from a display or class name: vocabulary only, so an
    /// unrecognized family word never becomes a variant.
    pub fn variant_for_name(&self, name: &str) -> VariantMatch {
        let tokens = self.editions.strip_spans(&designation_tokens(name));
        self.vocabulary.match_tokens(&tokens, false)
    }

    /// Variant code from an explicit raw variant-code field, with the
    /// first-token fallback.
    pub fn variant_for_field(&self, field: &str) -> VariantMatch {
        let tokens = self.editions.strip_spans(&tokenize(field));
        self.vocabulary.match_tokens(&tokens, true)
    }

    /// The name only adds a cosmetic/promotional qualifier to the base hull.
    pub fn is_edition_only(&self, name: &str) -> bool {
        self.variant_for_name(name).is_base() && self.editions.mentions_edition(name)
    }

    pub fn detect_edition(&self, name: &str) -> EditionMetadata {
        self.editions.detect(name)
    }

    pub fn family_filter(&self) -> FamilyFilter<'_> {
        FamilyFilter {
            vocabulary: &self.vocabulary,
            editions: &self.editions,
            policy: self.policy,
        }
    }

    /// Manufacturer for a record: its own reference, else a known code at
    /// the head of its external id or designation.
    pub fn manufacturer_for(&self, record: &RawRecord) -> Option<ResolvedManufacturer> {
        if let Some(reference) = record.manufacturer_ref() {
            return self.manufacturers.resolve(reference);
        }

        let external_head = record
            .external_id
            .as_deref()
            .and_then(|ext| tokenize(ext).into_iter().next());
        let designation_head = record
            .designation()
            .and_then(|d| tokenize(d).into_iter().next());

        external_head
            .into_iter()
            .chain(designation_head)
            .find_map(|head| self.manufacturers.resolve_known_code(&head))
    }

    /// Canonical identity of `designation`, built by one manufacturer.
    pub fn identify(
        &self,
        designation: &str,
        variant_field: Option<&str>,
        manufacturer: &ResolvedManufacturer,
    ) -> CanonicalIdentity {
        let variant = match variant_field.map(str::trim).filter(|f| !f.is_empty()) {
            Some(field) => self.variant_for_field(field),
            None => self.variant_for_name(designation),
        };

        let family_name = self.family_filter().clean_family_name(
            designation,
            &variant.code,
            &manufacturer.tokens(),
        );
        let hull_key = build_hull_key(Some(&manufacturer.code), Some(&family_name));
        let variant_id = to_canonical_variant_ext_id(&hull_key, &variant.code);

        CanonicalIdentity {
            manufacturer_code: manufacturer.code.clone(),
            family_name,
            hull_key,
            variant_id,
            edition: self.detect_edition(designation),
            edition_only: variant.is_base() && self.editions.mentions_edition(designation),
            variant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hullmark_core::ManufacturerRef;

    fn rules() -> IdentityRules {
        IdentityRules::from_config(&IdentityConfig::default()).unwrap()
    }

    fn rsi(rules: &IdentityRules) -> ResolvedManufacturer {
        rules
            .manufacturers
            .resolve(&ManufacturerRef::Code("RSI".into()))
            .unwrap()
    }

    #[test]
    fn zeus_cl_identity() {
        let rules = rules();
        let id = rules.identify("RSI Zeus Mk II CL", None, &rsi(&rules));
        assert_eq!(id.hull_key, "RSI_ZEUS_MKII");
        assert_eq!(id.variant.code, "CL");
        assert_eq!(id.variant_id, "RSI_ZEUS_MKII_CL");
        assert!(!id.edition_only);
    }

    #[test]
    fn warbond_iae_keeps_variant_id_and_records_edition() {
        let rules = rules();
        let id = rules.identify("Zeus Mk II CL Warbond IAE 2954", None, &rsi(&rules));
        assert_eq!(id.variant_id, "RSI_ZEUS_MKII_CL");
        assert_eq!(id.edition.edition_code.as_deref(), Some("IAE2954_WARBOND"));
        assert!(!id.edition_only);
    }

    #[test]
    fn edition_only_name_maps_onto_base_variant() {
        let rules = rules();
        let base = rules.identify("Zeus Mk II", None, &rsi(&rules));
        let promo = rules.identify("Zeus Mk II Best Warbond 2953", None, &rsi(&rules));
        assert!(rules.is_edition_only("Zeus Mk II Warbond"));
        assert!(promo.edition_only);
        assert_eq!(base.variant_id, "RSI_ZEUS_MKII_BASE");
        assert_ne!(promo.variant_id, base.variant_id, "unknown word BEST stays in family");

        let promo = rules.identify("Zeus Mk II Warbond 2953", None, &rsi(&rules));
        assert_eq!(promo.variant_id, base.variant_id);
    }

    #[test]
    fn livery_tokens_do_not_pick_a_variant() {
        let rules = rules();
        let id = rules.identify("Aurora MR Paint Red Alert", None, &rsi(&rules));
        assert_eq!(id.variant.code, "MR");
        assert_eq!(id.variant_id, "RSI_AURORA_MR");
        assert_eq!(id.edition.livery.as_deref(), Some("Red Alert"));
    }

    #[test]
    fn explicit_field_overrides_name_and_may_be_unverified() {
        let rules = rules();
        let id = rules.identify("Aurora", Some("Nomad"), &rsi(&rules));
        assert_eq!(id.variant.code, "NOMAD");
        assert!(!id.variant.is_verified());
        assert_eq!(id.variant_id, "RSI_AURORA_NOMAD");
    }

    #[test]
    fn manufacturer_fallback_from_external_id_or_designation() {
        let rules = rules();
        let from_ext = RawRecord::new("B").with_external_id("RSI_AURORA_MR");
        assert_eq!(rules.manufacturer_for(&from_ext).unwrap().code, "RSI");

        let from_name = RawRecord::new("C").with_name("Drake Cutlass Black");
        assert!(rules.manufacturer_for(&from_name).is_none());

        let from_code_head = RawRecord::new("D").with_name("DRAK Cutlass Black");
        assert_eq!(rules.manufacturer_for(&from_code_head).unwrap().code, "DRAK");

        let nothing = RawRecord::new("E").with_name("Mystery Ship");
        assert!(rules.manufacturer_for(&nothing).is_none());
    }

    #[test]
    fn default_manufacturer_names_do_not_swallow_single_letters() {
        let rules = rules();
        let misc = rules
            .manufacturers
            .resolve(&ManufacturerRef::Code("MISC".into()))
            .unwrap();
        let a = rules.identify("MISC Hull A", None, &misc);
        let c = rules.identify("MISC Hull C", None, &misc);
        assert_eq!(a.hull_key, "MISC_HULL_A");
        assert_eq!(c.hull_key, "MISC_HULL_C");
    }

    #[test]
    fn separate_rule_sets_do_not_share_vocabulary() {
        let mut old_config = IdentityConfig::default();
        old_config.vocabulary.version = 1;
        let old = IdentityRules::from_config(&old_config).unwrap();
        let new = rules();
        assert!(old.variant_for_name("Cutlass Cargo").is_base());
        assert_eq!(new.variant_for_name("Cutlass Cargo").code, "CARGO");
    }
}
