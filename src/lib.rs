pub mod assets;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod labels;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod ranking;
pub mod service;

pub use crate::assets::{AssetSource, DirAssets, MemoryAssets};
pub use crate::cli::Args;
pub use crate::config::ClassifierConfig;
pub use crate::engine::{InferenceBackend, InferenceEngine, Scores};
pub use crate::error::{ClassifierError, Fault, Outcome, Result};
pub use crate::labels::LabelSet;
pub use crate::metadata::{Catalog, CatalogEntry, ComponentMetadata, MetadataResolver};
pub use crate::model::{OnnxBackend, OnnxModel};
pub use crate::pipeline::{Classification, ClassificationPipeline};
pub use crate::preprocess::{PreprocessConfig, Processor, Tensor, rgb_image_from_raw};
pub use crate::ranking::{ClassificationResult, rank};
pub use crate::service::ClassifierService;
