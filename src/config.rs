use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};

pub const DEFAULT_INPUT_SIZE: u32 = 224;
pub const MODEL_FILE: &str = "component_classifier.onnx";
pub const LABEL_FILE: &str = "labels.txt";
pub const INFO_FILE: &str = "component_info.json";

/// Settings for building a [`ClassificationPipeline`](crate::ClassificationPipeline).
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Side length of the square model input.
    pub input_size: u32,
    /// Directory the asset names below are resolved against.
    pub assets_dir: PathBuf,
    pub model_file: String,
    pub labels_file: String,
    pub catalog_file: String,
    /// Register the CUDA execution provider instead of the CPU one.
    pub cuda: bool,
    /// Index the catalog once instead of re-reading it on every lookup.
    pub cache_catalog: bool,
    pub intra_threads: Option<usize>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
            assets_dir: PathBuf::from("assets"),
            model_file: MODEL_FILE.to_string(),
            labels_file: LABEL_FILE.to_string(),
            catalog_file: INFO_FILE.to_string(),
            cuda: false,
            cache_catalog: false,
            intra_threads: None,
        }
    }
}

impl ClassifierConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::Config(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ClassifierError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            return Err(ClassifierError::Config(
                "input_size must be greater than zero".to_string(),
            ));
        }
        for (key, value) in [
            ("model_file", &self.model_file),
            ("labels_file", &self.labels_file),
            ("catalog_file", &self.catalog_file),
        ] {
            if value.trim().is_empty() {
                return Err(ClassifierError::Config(format!("{key} must not be empty")));
            }
        }
        if self.intra_threads == Some(0) {
            return Err(ClassifierError::Config(
                "intra_threads must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}
