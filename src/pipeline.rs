use std::sync::Arc;

use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, info};

use crate::assets::{AssetSource, DirAssets};
use crate::config::ClassifierConfig;
use crate::engine::{InferenceBackend, InferenceEngine, Scores};
use crate::error::{ClassifierError, Fault, Outcome, Result};
use crate::labels::LabelSet;
use crate::metadata::{ComponentMetadata, MetadataResolver};
use crate::model::OnnxBackend;
use crate::preprocess::{PreprocessConfig, Processor, Tensor};
use crate::ranking::{ClassificationResult, rank};

/// Everything one classification produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub result: ClassificationResult,
    pub metadata: ComponentMetadata,
    /// Recovered faults, in the order they happened. Empty on a clean run.
    pub faults: Vec<Fault>,
}

impl Classification {
    pub fn is_degraded(&self) -> bool {
        !self.faults.is_empty()
    }
}

/// Image in, label plus catalog record out.
///
/// Build one per session and reuse it; the model is loaded once and released
/// when the pipeline is dropped.
pub struct ClassificationPipeline<B = OnnxBackend> {
    processor: Processor,
    engine: InferenceEngine<B>,
    resolver: MetadataResolver,
}

impl ClassificationPipeline<OnnxBackend> {
    /// Load every asset from `config.assets_dir`.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        Self::from_assets(Arc::new(DirAssets::new(&config.assets_dir)), config)
    }

    pub fn from_assets(assets: Arc<dyn AssetSource>, config: &ClassifierConfig) -> Result<Self> {
        config.validate()?;
        let engine = InferenceEngine::from_assets(assets.as_ref(), config)?;
        Ok(Self::new(engine, resolver_for(assets, config)))
    }
}

impl<B: InferenceBackend> ClassificationPipeline<B> {
    pub fn new(engine: InferenceEngine<B>, resolver: MetadataResolver) -> Self {
        let [_, height, _, _] = engine.input_shape();
        let processor = Processor::new(PreprocessConfig::square(height as u32));
        Self {
            processor,
            engine,
            resolver,
        }
    }

    /// Use a caller-supplied backend; labels and catalog still come from
    /// `assets`.
    pub fn with_backend(
        backend: B,
        assets: Arc<dyn AssetSource>,
        config: &ClassifierConfig,
    ) -> Result<Self> {
        config.validate()?;
        let labels = LabelSet::load(assets.as_ref(), &config.labels_file)?;
        let engine = InferenceEngine::new(backend, labels, config.input_size)?;
        Ok(Self::new(engine, resolver_for(assets, config)))
    }

    pub fn engine(&self) -> &InferenceEngine<B> {
        &self.engine
    }

    pub fn resolver(&self) -> &MetadataResolver {
        &self.resolver
    }

    /// Classify one decoded image.
    ///
    /// Only an unusable image is an error. Inference and catalog problems are
    /// reported in [`Classification::faults`].
    pub fn classify(&self, image: &DynamicImage) -> Result<Classification> {
        let tensor = self.processor.preprocess(image)?;
        Ok(self.classify_tensor(&tensor))
    }

    /// Decode an encoded image (PNG, JPEG, ...) and classify it.
    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<Classification> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| ClassifierError::InvalidInput(format!("cannot decode image: {e}")))?;
        self.classify(&image)
    }

    /// Preprocess all images in parallel, then run them through the model one
    /// at a time.
    pub fn classify_batch(&self, images: &[DynamicImage]) -> Vec<Result<Classification>> {
        self.processor
            .preprocess_batch(images)
            .into_iter()
            .map(|tensor| tensor.map(|t| self.classify_tensor(&t)))
            .collect()
    }

    fn classify_tensor(&self, tensor: &Tensor) -> Classification {
        self.conclude(self.engine.infer(tensor))
    }

    /// Classification for a request that never produced scores.
    ///
    /// Takes the same rank and lookup path as a failed forward pass, so the
    /// faults read `[Classification, ..]` either way.
    pub(crate) fn degraded(&self, fault: Fault) -> Classification {
        self.conclude(Outcome::degraded(Scores::empty(), fault))
    }

    fn conclude(&self, scores: Outcome<Scores>) -> Classification {
        let mut faults = Vec::new();

        let (scores, fault) = scores.into_parts();
        faults.extend(fault);
        let result = rank(&scores.confidences, &scores.labels);

        let (metadata, fault) = self.resolver.lookup(&result.label).into_parts();
        faults.extend(fault);

        if faults.is_empty() {
            info!(label = %result.label, confidence = result.confidence, "classified");
        } else {
            debug!(
                label = %result.label,
                faults = faults.len(),
                "classified with recovered faults"
            );
        }
        Classification {
            result,
            metadata,
            faults,
        }
    }
}

impl<B> std::fmt::Debug for ClassificationPipeline<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationPipeline")
            .field("processor", &self.processor)
            .field("engine", &self.engine)
            .field("resolver", &self.resolver)
            .finish()
    }
}

fn resolver_for(assets: Arc<dyn AssetSource>, config: &ClassifierConfig) -> MetadataResolver {
    if config.cache_catalog {
        MetadataResolver::cached(assets, config.catalog_file.clone())
    } else {
        MetadataResolver::new(assets, config.catalog_file.clone())
    }
}
