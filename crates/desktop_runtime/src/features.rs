//! Feature catalog: the set of openable desktop features with their window defaults.

use leptos::logging;
use serde::{Deserialize, Serialize};

use crate::{
    config::ConfigError,
    model::{FeatureId, Size, WindowFlags},
};

mod generated {
    include!(concat!(env!("OUT_DIR"), "/feature_catalog_generated.rs"));
}

/// Schema version accepted by [`FeatureCatalog::from_toml_str`].
pub const FEATURE_CATALOG_SCHEMA_VERSION: u32 = 1;

fn default_single_instance() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    pub id: FeatureId,
    pub title: String,
    /// Single-instance features reuse the feature id as their window id, so re-opening focuses
    /// the existing window instead of creating another.
    #[serde(default = "default_single_instance")]
    pub single_instance: bool,
    /// Load persisted window state once when a window for this feature is created.
    #[serde(default)]
    pub persist_session: bool,
    #[serde(default)]
    pub default_size: Size,
    #[serde(default)]
    pub flags: WindowFlags,
}

impl FeatureDescriptor {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: FeatureId::new(id),
            title: title.into(),
            single_instance: true,
            persist_session: false,
            default_size: Size::default(),
            flags: WindowFlags::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    schema_version: u32,
    #[serde(default, rename = "feature")]
    features: Vec<FeatureDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeatureCatalog {
    features: Vec<FeatureDescriptor>,
}

impl FeatureCatalog {
    pub fn new(features: Vec<FeatureDescriptor>) -> Self {
        let mut catalog = Self::default();
        for feature in features {
            catalog.register(feature);
        }
        catalog
    }

    /// Catalog compiled from `features/builtin.toml`.
    pub fn builtin() -> Self {
        match serde_json::from_str::<Vec<FeatureDescriptor>>(generated::FEATURE_CATALOG_JSON) {
            Ok(features) => Self::new(features),
            Err(err) => {
                logging::warn!("builtin feature catalog decode failed: {err}");
                Self::default()
            }
        }
    }

    /// Parses a catalog document with a top-level `schema_version` and `[[feature]]` tables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and [`ConfigError::Invalid`] for an
    /// unsupported schema version or an empty/ambiguous feature id.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let document: CatalogDocument = toml::from_str(raw)?;
        if document.schema_version != FEATURE_CATALOG_SCHEMA_VERSION {
            return Err(ConfigError::Invalid(format!(
                "feature catalog schema {} is not supported",
                document.schema_version
            )));
        }
        if let Some(bad) = document
            .features
            .iter()
            .find(|feature| feature.id.as_str().trim().is_empty() || feature.id.as_str().contains('#'))
        {
            return Err(ConfigError::Invalid(format!(
                "invalid feature id {:?}",
                bad.id.as_str()
            )));
        }
        Ok(Self::new(document.features))
    }

    /// Adds a feature, replacing any existing entry with the same id.
    pub fn register(&mut self, feature: FeatureDescriptor) {
        match self.features.iter_mut().find(|entry| entry.id == feature.id) {
            Some(existing) => *existing = feature,
            None => self.features.push(feature),
        }
    }

    pub fn get(&self, feature_id: &FeatureId) -> Option<&FeatureDescriptor> {
        self.features.iter().find(|entry| &entry.id == feature_id)
    }

    pub fn contains(&self, feature_id: &FeatureId) -> bool {
        self.get(feature_id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureDescriptor> {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
