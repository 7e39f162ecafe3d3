//! Registry of towns and their service endpoints.

use serde::Deserialize;

use crate::model::TownConfig;

#[derive(thiserror::Error, Debug)]
/// Errors while loading or querying the town registry.
pub enum RegistryError {
    /// The registry document is not valid JSON of the expected shape.
    #[error("Invalid town registry: {0}")]
    Parse(#[from] serde_json::Error),
    /// No town is registered under the slug.
    #[error("Unknown town: {0}")]
    UnknownTown(String),
}

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    towns: Vec<TownConfig>,
}

/// Towns in registry order.
#[derive(Debug, Clone, Default)]
pub struct TownRegistry {
    towns: Vec<TownConfig>,
}

impl TownRegistry {
    /// Build a registry from the provided town list.
    #[must_use]
    pub fn new(towns: Vec<TownConfig>) -> Self {
        Self { towns }
    }

    /// Parse a `{"towns": [...]}` registry document.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Parse`] when the document does not match the registry shape.
    pub fn from_json(raw: &str) -> Result<Self, RegistryError> {
        let document: RegistryDocument = serde_json::from_str(raw)?;
        Ok(Self::new(document.towns))
    }

    /// All registered towns.
    #[must_use]
    pub fn towns(&self) -> &[TownConfig] {
        &self.towns
    }

    /// Look up a town by slug.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownTown`] when no town uses the slug.
    pub fn by_slug(&self, slug: &str) -> Result<&TownConfig, RegistryError> {
        self.towns
            .iter()
            .find(|town| town.slug == slug)
            .ok_or_else(|| RegistryError::UnknownTown(slug.to_owned()))
    }
}
