use serde::{Deserialize, Serialize};

/// How a raw record points at its manufacturer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManufacturerRef {
    Code(String),
    Name(String),
    Id(u64),
}

impl ManufacturerRef {
    /// A string reference that is blank counts as no reference at all.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Code(s) | Self::Name(s) => s.trim().is_empty(),
            Self::Id(_) => false,
        }
    }
}

/// One hull or variant row as it arrives from an export dump, an older CMS
/// table or a migration snapshot. Never mutated by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Identity the row carried in a previous ingest, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<ManufacturerRef>,
}

impl RawRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_variant_code(mut self, code: impl Into<String>) -> Self {
        self.variant_code = Some(code.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: ManufacturerRef) -> Self {
        self.manufacturer = Some(manufacturer);
        self
    }

    /// Stable identifier used as the remap-table key: `id`, else `external_id`.
    pub fn identifier(&self) -> Option<&str> {
        non_blank(self.id.as_deref()).or_else(|| non_blank(self.external_id.as_deref()))
    }

    /// True when `id` or `external_id` already is `canonical_id`.
    pub fn claims_identity(&self, canonical_id: &str) -> bool {
        [self.id.as_deref(), self.external_id.as_deref()]
            .into_iter()
            .any(|value| non_blank(value) == Some(canonical_id))
    }

    /// Free text the canonical identity is derived from.
    pub fn designation(&self) -> Option<&str> {
        non_blank(self.name.as_deref())
            .or_else(|| non_blank(self.class_name.as_deref()))
            .or_else(|| non_blank(self.external_id.as_deref()))
    }

    pub fn display_name(&self) -> Option<&str> {
        non_blank(self.name.as_deref())
    }

    pub fn description_text(&self) -> Option<&str> {
        non_blank(self.description.as_deref())
    }

    pub fn manufacturer_ref(&self) -> Option<&ManufacturerRef> {
        self.manufacturer.as_ref().filter(|m| !m.is_blank())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
