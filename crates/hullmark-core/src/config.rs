use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HullmarkError, Result};

/// Latest built-in variant vocabulary version.
pub const LATEST_VOCABULARY_VERSION: u32 = 3;

/// Root identity configuration, loaded from `~/.config/hullmark/identity.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub vocabulary: VocabularyConfig,
    pub editions: EditionConfig,
    pub matching: MatchingConfig,
    pub manufacturers: Vec<ManufacturerEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    pub version: u32,
    pub extra_tokens: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditionConfig {
    pub keywords: Vec<String>,
    /// Keywords that sort first in a compound edition code, in this order.
    pub priority: Vec<String>,
    pub livery_keywords: Vec<String>,
    pub livery_label_max_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum token length for prefix matching against manufacturer tokens.
    /// Zero keeps unrestricted prefix matching.
    pub manufacturer_prefix_min_len: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManufacturerEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl ManufacturerEntry {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            code: code.into(),
            name: Some(name.into()),
            aliases: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            vocabulary: VocabularyConfig::default(),
            editions: EditionConfig::default(),
            matching: MatchingConfig::default(),
            manufacturers: default_manufacturers(),
        }
    }
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            version: LATEST_VOCABULARY_VERSION,
            extra_tokens: Vec::new(),
        }
    }
}

impl Default for EditionConfig {
    fn default() -> Self {
        Self {
            keywords: to_strings(&[
                "AUSPICIOUS",
                "BIS",
                "CITIZENCON",
                "CORONATION",
                "FLEETWEEK",
                "IAE",
                "ILW",
                "INVICTUS",
                "LUNAR",
                "PIRATE",
                "PROMO",
                "REFERRAL",
                "SHOWDOWN",
                "STARTER",
                "SUBSCRIBER",
                "TUTORIAL",
                "WARBOND",
                "WIKELO",
            ]),
            priority: to_strings(&["IAE", "ILW", "INVICTUS", "CITIZENCON", "BIS"]),
            livery_keywords: to_strings(&["LIVERY", "PAINT", "SKIN"]),
            livery_label_max_tokens: 3,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            manufacturer_prefix_min_len: 0,
        }
    }
}

fn default_manufacturers() -> Vec<ManufacturerEntry> {
    vec![
        ManufacturerEntry::new("AEGS", "Aegis Dynamics").with_aliases(&["AEGIS"]),
        ManufacturerEntry::new("ANVL", "Anvil Aerospace").with_aliases(&["ANVIL"]),
        ManufacturerEntry::new("ARGO", "Argo Astronautics"),
        ManufacturerEntry::new("CNOU", "Consolidated Outland"),
        ManufacturerEntry::new("CRUS", "Crusader Industries").with_aliases(&["CRUSADER"]),
        ManufacturerEntry::new("DRAK", "Drake Interplanetary").with_aliases(&["DRAKE"]),
        ManufacturerEntry::new("ESPR", "Esperia"),
        ManufacturerEntry::new("MISC", "Musashi Industrial").with_aliases(&["MUSASHI"]),
        ManufacturerEntry::new("ORIG", "Origin Jumpworks").with_aliases(&["ORIGIN"]),
        ManufacturerEntry::new("RSI", "Roberts Space Industries"),
    ]
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// ─── Load / Save ───────────────────────────────────────────

impl IdentityConfig {
    /// Standard config file path: `~/.config/hullmark/identity.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("HULLMARK_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("hullmark")
            .join("identity.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=LATEST_VOCABULARY_VERSION).contains(&self.vocabulary.version) {
            return Err(HullmarkError::ConfigError(format!(
                "vocabulary version {} is not in 1..={LATEST_VOCABULARY_VERSION}",
                self.vocabulary.version
            )));
        }
        if self.editions.livery_label_max_tokens == 0 {
            return Err(HullmarkError::ConfigError(
                "editions.livery_label_max_tokens must be at least 1".to_string(),
            ));
        }
        for entry in &self.manufacturers {
            if entry.code.trim().is_empty() {
                return Err(HullmarkError::ValidationError(format!(
                    "manufacturer entry {:?} has an empty code",
                    entry.name
                )));
            }
        }
        Ok(())
    }
}
