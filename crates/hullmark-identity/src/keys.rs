use crate::tokens::{sanitize_token, title_case};
use crate::vocabulary::BASE_VARIANT;

const UNKNOWN_MANUFACTURER: &str = "UNKNOWN";
const UNKNOWN_FAMILY: &str = "HULL";

/// `MANUFACTURER_FAMILY`. Blank parts fall back to `UNKNOWN` / `HULL`.
pub fn build_hull_key(manufacturer_code: Option<&str>, family_name: Option<&str>) -> String {
    let manufacturer = non_empty_sanitized(manufacturer_code)
        .unwrap_or_else(|| UNKNOWN_MANUFACTURER.to_string());
    let family =
        non_empty_sanitized(family_name).unwrap_or_else(|| UNKNOWN_FAMILY.to_string());
    format!("{manufacturer}_{family}")
}

pub fn to_canonical_variant_ext_id(hull_key: &str, variant_code: &str) -> String {
    format!("{hull_key}_{}", sanitize_token(variant_code))
}

/// Title-cased base name with the variant code appended unless it is `BASE`.
pub fn canonical_variant_name(base_name: &str, variant_code: &str) -> String {
    let base = title_case(base_name);
    if variant_code == BASE_VARIANT || variant_code.trim().is_empty() {
        return base;
    }
    if base.is_empty() {
        return variant_code.to_string();
    }
    format!("{base} {variant_code}")
}

fn non_empty_sanitized(value: Option<&str>) -> Option<String> {
    value.map(sanitize_token).filter(|s| !s.is_empty())
}
