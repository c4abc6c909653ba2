pub mod config;
pub mod error;
pub mod models;

pub use config::{
    EditionConfig, IdentityConfig, ManufacturerEntry, MatchingConfig, VocabularyConfig,
};
pub use error::{HullmarkError, Result};
pub use models::*;
