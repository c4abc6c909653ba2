use hullmark_core::{IdentityConfig, ManufacturerRef, RawRecord};
use hullmark_identity::{MatchSource, Resolver, VariantVocabulary};
use proptest::prelude::*;

const MANUFACTURERS: &[&str] = &["RSI", "DRAK", "ANVL"];
const FAMILIES: &[&str] = &["Aurora", "Cutlass", "Zeus Mk II", "Hornet", "Mustang"];
const VARIANTS: &[&str] = &["", "MR", "CL", "LN", "Black", "Cargo"];
const EDITIONS: &[&str] = &["", "Warbond", "IAE 2954", "Invictus", "Livery Crimson Star"];

fn resolver() -> Resolver {
    Resolver::from_config(&IdentityConfig::default()).unwrap()
}

fn record_strategy() -> impl Strategy<Value = (usize, usize, usize, usize)> {
    (
        0..MANUFACTURERS.len(),
        0..FAMILIES.len(),
        0..VARIANTS.len(),
        0..EDITIONS.len(),
    )
}

fn build_records(specs: &[(usize, usize, usize, usize)]) -> Vec<RawRecord> {
    specs
        .iter()
        .enumerate()
        .map(|(i, &(m, f, v, e))| {
            let name = [FAMILIES[f], VARIANTS[v], EDITIONS[e]]
                .iter()
                .filter(|part| !part.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join(" ");
            RawRecord::new(format!("R{i:03}"))
                .with_name(name)
                .with_manufacturer(ManufacturerRef::Code(MANUFACTURERS[m].to_string()))
        })
        .collect()
}

proptest! {
    #[test]
    fn resolution_ignores_input_order(
        specs in prop::collection::vec(record_strategy(), 1..25),
        rotation in 0usize..25
    ) {
        let records = build_records(&specs);
        let mut shuffled = records.clone();
        shuffled.reverse();
        let len = shuffled.len();
        shuffled.rotate_left(rotation % len);

        let resolver = resolver();
        let first = resolver.resolve(&records);
        let second = resolver.resolve(&shuffled);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn repeated_records_do_not_change_the_result(
        specs in prop::collection::vec(record_strategy(), 1..15)
    ) {
        let records = build_records(&specs);
        let mut doubled = records.clone();
        doubled.extend(records.iter().cloned());

        let resolver = resolver();
        prop_assert_eq!(
            resolver.resolve(&records),
            resolver.resolve(&doubled)
        );
    }

    #[test]
    fn every_resolved_identifier_is_remapped(
        specs in prop::collection::vec(record_strategy(), 1..25)
    ) {
        let records = build_records(&specs);
        let resolution = resolver().resolve(&records);

        prop_assert_eq!(resolution.remap.len(), records.len());
        for record in &records {
            let id = record.identifier().unwrap();
            let canonical = resolution.remap.get(id).unwrap();
            prop_assert!(resolution.group(canonical).is_some());
        }
    }

    #[test]
    fn resolving_keepers_again_is_stable(
        specs in prop::collection::vec(record_strategy(), 1..25)
    ) {
        let records = build_records(&specs);
        let resolver = resolver();
        let first = resolver.resolve(&records);
        let second = resolver.resolve(&first.keeper_records());

        prop_assert!(second.redundant_ids().is_empty());
        let first_ids: Vec<_> = first.groups.iter().map(|g| g.variant_id.clone()).collect();
        let second_ids: Vec<_> = second.groups.iter().map(|g| g.variant_id.clone()).collect();
        prop_assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn merged_groups_lose_no_names(
        specs in prop::collection::vec(record_strategy(), 1..25)
    ) {
        let records = build_records(&specs);
        let resolution = resolver().resolve(&records);

        for group in &resolution.groups {
            for (idx, member) in group.members.iter().enumerate() {
                if idx == 0 || !member.edition_only {
                    prop_assert!(member.names.is_subset(&group.names));
                } else {
                    let meta = &resolution.duplicates[&member.raw_id];
                    prop_assert_eq!(&meta.names, &member.names);
                }
            }
        }
    }

    #[test]
    fn edition_suffix_never_changes_variant_id(
        m in 0..MANUFACTURERS.len(),
        f in 0..FAMILIES.len(),
        v in 0..VARIANTS.len(),
        e in 1..EDITIONS.len()
    ) {
        let plain = build_records(&[(m, f, v, 0)]);
        let promo = build_records(&[(m, f, v, e)]);

        let resolver = resolver();
        let plain = resolver.resolve(&plain);
        let promo = resolver.resolve(&promo);
        prop_assert_eq!(&plain.groups[0].variant_id, &promo.groups[0].variant_id);
    }

    #[test]
    fn extracted_variant_code_is_never_empty(source in "\\PC*") {
        let vocabulary = VariantVocabulary::latest();
        let matched = vocabulary.extract_variant_code(&source);

        prop_assert!(!matched.code.is_empty());
        if matched.source == MatchSource::Vocabulary {
            prop_assert!(vocabulary.contains(&matched.code));
        }
    }
}
