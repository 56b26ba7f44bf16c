use std::sync::Arc;

use image::DynamicImage;
use tracing::error;

use crate::engine::InferenceBackend;
use crate::error::{Fault, Result};
use crate::model::OnnxBackend;
use crate::pipeline::{Classification, ClassificationPipeline};

/// Async front for a shared pipeline.
///
/// Classification runs on the blocking thread pool so callers on an async
/// runtime (or a UI event loop driving one) are never stalled by the model.
/// Overlapping requests queue on the engine's lock.
pub struct ClassifierService<B = OnnxBackend> {
    pipeline: Arc<ClassificationPipeline<B>>,
}

impl<B> Clone for ClassifierService<B> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
        }
    }
}

impl<B> std::fmt::Debug for ClassifierService<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierService")
            .field("pipeline", &"ClassificationPipeline")
            .finish()
    }
}

impl<B: InferenceBackend + 'static> ClassifierService<B> {
    pub fn new(pipeline: ClassificationPipeline<B>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn pipeline(&self) -> &ClassificationPipeline<B> {
        &self.pipeline
    }

    pub async fn classify(&self, image: DynamicImage) -> Result<Classification> {
        let pipeline = self.pipeline.clone();
        self.join(tokio::task::spawn_blocking(move || pipeline.classify(&image)).await)
    }

    pub async fn classify_bytes(&self, bytes: Vec<u8>) -> Result<Classification> {
        let pipeline = self.pipeline.clone();
        self.join(tokio::task::spawn_blocking(move || pipeline.classify_bytes(&bytes)).await)
    }

    /// A worker that died or was cancelled counts as a classification fault,
    /// not an error.
    fn join(
        &self,
        joined: std::result::Result<Result<Classification>, tokio::task::JoinError>,
    ) -> Result<Classification> {
        joined.unwrap_or_else(|e| {
            error!("Classification error: worker failed: {e}");
            Ok(self.pipeline.degraded(Fault::Classification(format!("worker failed: {e}"))))
        })
    }
}
