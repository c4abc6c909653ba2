//! Canonical identity resolution for hull and variant records.
//!
//! Raw records from several import epochs are reduced to a stable
//! `MANUFACTURER_FAMILY_VARIANT` identity, grouped, merged into one keeper
//! per identity, and every old identifier is mapped onto the survivor so
//! dependent rows can be repointed.

pub mod dedup;
pub mod edition;
pub mod error;
pub mod family;
pub mod keys;
pub mod manufacturer;
pub mod remap;
pub mod rules;
pub mod tokens;
pub mod vocabulary;

pub use dedup::{
    CanonicalVariantGroup, DuplicateMetadata, GroupMember, HullProjection, Resolution,
    ResolutionIssue, Resolver, VariantProjection,
};
pub use edition::{EditionMetadata, EditionRules};
pub use error::{IdentityError, Result};
pub use family::FamilyFilter;
pub use keys::{build_hull_key, canonical_variant_name, to_canonical_variant_ext_id};
pub use manufacturer::{ManufacturerDirectory, MatchingPolicy, ResolvedManufacturer};
pub use remap::{CascadeReport, RemapTable, VariantLinked, cascade};
pub use rules::{CanonicalIdentity, IdentityRules};
pub use tokens::{sanitize_token, tokenize};
pub use vocabulary::{BASE_VARIANT, MatchSource, VariantMatch, VariantVocabulary};
