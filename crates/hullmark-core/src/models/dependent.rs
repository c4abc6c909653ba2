use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependentKind {
    Statistics,
    Hardpoint,
    InstalledItem,
}

impl DependentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Statistics => "statistics",
            Self::Hardpoint => "hardpoint",
            Self::InstalledItem => "installed_item",
        }
    }
}

/// A row that points at a variant by identity: stats blocks, hardpoints,
/// installed-item loadouts. The payload is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependentRecord {
    pub id: String,
    pub kind: DependentKind,
    pub variant_ref: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub livery: Option<String>,

    #[serde(default)]
    pub payload: serde_json::Value,
}

impl DependentRecord {
    pub fn new(id: impl Into<String>, kind: DependentKind, variant_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            variant_ref: variant_ref.into(),
            edition_code: None,
            livery: None,
            payload: serde_json::Value::Null,
        }
    }
}
