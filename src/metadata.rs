//! Descriptive records for classified labels.
//!
//! The catalog asset is JSON of the form
//! `{"components": [{"name", "description", "specs", "common_projects"}, ...]}`.
//! Resolution never fails: a missing asset, a malformed catalog, or an unknown
//! label all produce [`ComponentMetadata::unavailable`] plus a [`Fault`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::assets::AssetSource;
use crate::error::{Fault, Outcome};

pub const INFO_UNAVAILABLE: &str = "Information unavailable";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentMetadata {
    pub description: String,
    pub specs: Vec<String>,
    pub common_projects: Vec<String>,
}

impl ComponentMetadata {
    pub fn unavailable() -> Self {
        Self {
            description: INFO_UNAVAILABLE.to_string(),
            specs: Vec::new(),
            common_projects: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(flatten)]
    pub metadata: ComponentMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub components: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Exact, case-sensitive match; the first entry with the name wins.
    pub fn find(&self, name: &str) -> Option<&ComponentMetadata> {
        self.components
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.metadata)
    }

    /// Key records by name, keeping the first of any duplicates so lookups
    /// agree with [`Catalog::find`].
    pub fn into_index(self) -> HashMap<String, ComponentMetadata> {
        let mut index = HashMap::with_capacity(self.components.len());
        for entry in self.components {
            index.entry(entry.name).or_insert(entry.metadata);
        }
        index
    }
}

type CatalogIndex = Arc<HashMap<String, ComponentMetadata>>;

pub struct MetadataResolver {
    assets: Arc<dyn AssetSource>,
    catalog_file: String,
    /// `None` re-reads the asset on every lookup.
    cache: Option<Mutex<Option<CatalogIndex>>>,
}

impl MetadataResolver {
    /// A resolver that reads and parses the catalog on every lookup.
    pub fn new(assets: Arc<dyn AssetSource>, catalog_file: impl Into<String>) -> Self {
        Self {
            assets,
            catalog_file: catalog_file.into(),
            cache: None,
        }
    }

    /// A resolver that indexes the catalog after the first successful load.
    /// Failed loads are retried on the next lookup.
    pub fn cached(assets: Arc<dyn AssetSource>, catalog_file: impl Into<String>) -> Self {
        Self {
            cache: Some(Mutex::new(None)),
            ..Self::new(assets, catalog_file)
        }
    }

    pub fn lookup(&self, name: &str) -> Outcome<ComponentMetadata> {
        let found = match &self.cache {
            None => self.load_catalog().map(|catalog| catalog.find(name).cloned()),
            Some(cache) => self.cached_index(cache).map(|index| index.get(name).cloned()),
        };

        match found {
            Ok(Some(metadata)) => {
                debug!(label = name, "resolved component metadata");
                Outcome::ok(metadata)
            }
            Ok(None) => {
                warn!(label = name, "no catalog entry for label");
                Outcome::degraded(
                    ComponentMetadata::unavailable(),
                    Fault::Metadata(format!("no catalog entry named '{name}'")),
                )
            }
            Err(reason) => {
                warn!("Info load error: {reason}");
                Outcome::degraded(ComponentMetadata::unavailable(), Fault::Metadata(reason))
            }
        }
    }

    fn load_catalog(&self) -> Result<Catalog, String> {
        let text = self
            .assets
            .open_to_string(&self.catalog_file)
            .map_err(|e| format!("cannot read '{}': {e}", self.catalog_file))?;
        Catalog::parse(&text).map_err(|e| format!("cannot parse '{}': {e}", self.catalog_file))
    }

    fn cached_index(&self, cache: &Mutex<Option<CatalogIndex>>) -> Result<CatalogIndex, String> {
        let mut slot = cache
            .lock()
            .map_err(|_| "catalog cache lock poisoned".to_string())?;
        if let Some(index) = slot.as_ref() {
            return Ok(index.clone());
        }
        let index = Arc::new(self.load_catalog()?.into_index());
        *slot = Some(index.clone());
        Ok(index)
    }
}

impl std::fmt::Debug for MetadataResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataResolver")
            .field("catalog_file", &self.catalog_file)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}
