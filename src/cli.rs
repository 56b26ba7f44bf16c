use std::path::PathBuf;

use clap::Parser;

use crate::config::ClassifierConfig;
use crate::error::Result;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Image path(s) to classify
    #[arg(long, required = true, num_args = 1..)]
    pub source: Vec<PathBuf>,

    /// TOML config file; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the model, labels and catalog
    #[arg(long)]
    pub assets: Option<PathBuf>,

    /// ONNX model file name inside the assets directory
    #[arg(long)]
    pub model: Option<String>,

    /// Label file name inside the assets directory
    #[arg(long)]
    pub labels: Option<String>,

    /// Metadata catalog file name inside the assets directory
    #[arg(long)]
    pub catalog: Option<String>,

    /// Side length of the square model input
    #[arg(long)]
    pub input_size: Option<u32>,

    /// Use the CUDA execution provider
    #[arg(long)]
    pub cuda: bool,

    /// Index the catalog once instead of re-reading it per lookup
    #[arg(long)]
    pub cache_catalog: bool,

    /// Print one JSON object per image
    #[arg(long)]
    pub json: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short)]
    pub verbose: bool,
}

impl Args {
    /// Start from the config file (or defaults) and apply any flags given.
    pub fn resolve_config(&self) -> Result<ClassifierConfig> {
        let mut config = match &self.config {
            Some(path) => ClassifierConfig::from_toml_file(path)?,
            None => ClassifierConfig::default(),
        };
        if let Some(dir) = &self.assets {
            config.assets_dir = dir.clone();
        }
        if let Some(model) = &self.model {
            config.model_file = model.clone();
        }
        if let Some(labels) = &self.labels {
            config.labels_file = labels.clone();
        }
        if let Some(catalog) = &self.catalog {
            config.catalog_file = catalog.clone();
        }
        if let Some(size) = self.input_size {
            config.input_size = size;
        }
        config.cuda |= self.cuda;
        config.cache_catalog |= self.cache_catalog;
        config.validate()?;
        Ok(config)
    }
}
