//! Model ownership and the forward pass.
//!
//! [`InferenceEngine`] holds the model and its label set for as long as a
//! classification session lasts. Inference problems are recovered here and
//! never leave the engine as an `Err`: the caller gets an empty
//! [`Scores`] tagged with a [`Fault`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, error, info};

use crate::assets::AssetSource;
use crate::config::ClassifierConfig;
use crate::error::{ClassifierError, Fault, Outcome, Result};
use crate::labels::LabelSet;
use crate::model::{OnnxBackend, OnnxModel};
use crate::preprocess::Tensor;

/// A model that maps one preprocessed tensor to one score per label.
///
/// Implementations need not be reentrant; the engine serializes calls.
pub trait InferenceBackend: Send {
    fn run(&mut self, input: &Tensor) -> Result<Vec<f32>>;
}

/// Raw model output paired with the labels it indexes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scores {
    pub confidences: Vec<f32>,
    pub labels: LabelSet,
}

impl Scores {
    /// The "no result" value: no confidences, no labels.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.confidences.is_empty() || self.labels.is_empty()
    }
}

pub struct InferenceEngine<B = OnnxBackend> {
    backend: Mutex<B>,
    labels: LabelSet,
    input_shape: [usize; 4],
}

impl InferenceEngine<OnnxBackend> {
    /// Load the ONNX model and the label list named in `config`.
    ///
    /// Any problem with either asset is fatal.
    pub fn from_assets(assets: &dyn AssetSource, config: &ClassifierConfig) -> Result<Self> {
        let model_bytes = assets
            .open(&config.model_file)
            .map_err(|e| ClassifierError::initialization(&config.model_file, e))?;
        let backend = OnnxModel::new(config.cuda)
            .with_intra_threads(config.intra_threads)
            .load_model(&config.model_file, &model_bytes)?;
        let labels = LabelSet::load(assets, &config.labels_file)?;
        Self::new(backend, labels, config.input_size)
    }
}

impl<B: InferenceBackend> InferenceEngine<B> {
    pub fn new(backend: B, labels: LabelSet, input_size: u32) -> Result<Self> {
        if labels.is_empty() {
            return Err(ClassifierError::initialization("labels", "label list is empty"));
        }
        let size = input_size as usize;
        info!(labels = labels.len(), input_size, "inference engine ready");
        Ok(Self {
            backend: Mutex::new(backend),
            labels,
            input_shape: [1, size, size, 3],
        })
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn input_shape(&self) -> [usize; 4] {
        self.input_shape
    }

    /// Run the model on one tensor.
    ///
    /// On success the confidence vector has exactly one entry per label. Any
    /// failure yields [`Scores::empty`] with the fault attached, including a
    /// panic inside the backend; the next call runs the backend again.
    pub fn infer(&self, input: &Tensor) -> Outcome<Scores> {
        match self.try_infer(input) {
            Ok(confidences) => Outcome::ok(Scores {
                confidences,
                labels: self.labels.clone(),
            }),
            Err(e) => {
                error!("Classification error: {e}");
                Outcome::degraded(Scores::empty(), Fault::Classification(e.to_string()))
            }
        }
    }

    fn try_infer(&self, input: &Tensor) -> Result<Vec<f32>> {
        if input.shape() != self.input_shape {
            return Err(ClassifierError::Inference(format!(
                "expected input shape {:?}, got {:?}",
                self.input_shape,
                input.shape()
            )));
        }

        let t = std::time::Instant::now();
        let confidences = {
            // A panic is caught below, so a poisoned lock only means an
            // earlier call failed; the backend itself is still usable.
            let mut backend = self.backend.lock().unwrap_or_else(PoisonError::into_inner);
            panic::catch_unwind(AssertUnwindSafe(|| backend.run(input)))
                .map_err(|payload| ClassifierError::Inference(panic_message(payload)))??
        };
        debug!(elapsed = ?t.elapsed(), "forward pass");

        if confidences.len() != self.labels.len() {
            return Err(ClassifierError::Inference(format!(
                "model produced {} scores for {} labels",
                confidences.len(),
                self.labels.len()
            )));
        }
        Ok(confidences)
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("backend panicked: {detail}")
}

impl<B> std::fmt::Debug for InferenceEngine<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("labels", &self.labels.len())
            .field("input_shape", &self.input_shape)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(Vec<f32>);

    impl InferenceBackend for Fixed {
        fn run(&mut self, _input: &Tensor) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl InferenceBackend for Broken {
        fn run(&mut self, _input: &Tensor) -> Result<Vec<f32>> {
            Err(ClassifierError::Inference("numeric error".to_string()))
        }
    }

    struct Counting(Arc<AtomicUsize>);

    impl InferenceBackend for Counting {
        fn run(&mut self, _input: &Tensor) -> Result<Vec<f32>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0])
        }
    }

    /// Panics on its first call, answers normally afterwards.
    struct PanicsOnce {
        panicked: bool,
    }

    impl InferenceBackend for PanicsOnce {
        fn run(&mut self, _input: &Tensor) -> Result<Vec<f32>> {
            if !self.panicked {
                self.panicked = true;
                panic!("transient backend crash");
            }
            Ok(vec![0.9, 0.1])
        }
    }

    fn input(size: usize) -> Tensor {
        Tensor::zeros((1, size, size, 3))
    }

    #[test]
    fn success_pairs_scores_with_labels() {
        let engine =
            InferenceEngine::new(Fixed(vec![0.2, 0.8]), LabelSet::new(["A", "B"]), 4).unwrap();
        let outcome = engine.infer(&input(4));
        assert!(!outcome.is_degraded());
        assert_eq!(outcome.value.confidences, vec![0.2, 0.8]);
        assert_eq!(&outcome.value.labels[..], &["A", "B"]);
    }

    #[test]
    fn backend_failure_degrades_to_empty_scores() {
        let engine = InferenceEngine::new(Broken, LabelSet::new(["A"]), 4).unwrap();
        let outcome = engine.infer(&input(4));
        assert!(outcome.value.is_empty());
        assert!(outcome.value.labels.is_empty());
        let Some(Fault::Classification(message)) = &outcome.fault else {
            panic!("expected a classification fault, got {:?}", outcome.fault);
        };
        assert!(message.contains("numeric error"));
    }

    #[test]
    fn backend_panic_degrades_once_and_engine_stays_usable() {
        let engine =
            InferenceEngine::new(PanicsOnce { panicked: false }, LabelSet::new(["A", "B"]), 4)
                .unwrap();

        let first = engine.infer(&input(4));
        assert_eq!(first.value, Scores::empty());
        let Some(Fault::Classification(message)) = &first.fault else {
            panic!("expected a classification fault, got {:?}", first.fault);
        };
        assert!(message.contains("transient backend crash"));

        let second = engine.infer(&input(4));
        assert!(!second.is_degraded());
        assert_eq!(second.value.confidences, vec![0.9, 0.1]);
    }

    #[test]
    fn wrong_input_shape_never_reaches_backend() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine =
            InferenceEngine::new(Counting(calls.clone()), LabelSet::new(["A"]), 4).unwrap();
        let outcome = engine.infer(&input(5));
        assert!(outcome.is_degraded());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn score_count_must_match_label_count() {
        let engine =
            InferenceEngine::new(Fixed(vec![0.5, 0.5, 0.0]), LabelSet::new(["A", "B"]), 4)
                .unwrap();
        let outcome = engine.infer(&input(4));
        assert_eq!(outcome.value, Scores::empty());
        assert!(outcome.is_degraded());
    }

    #[test]
    fn empty_label_set_is_an_initialization_error() {
        let err = InferenceEngine::new(Fixed(vec![]), LabelSet::default(), 4).unwrap_err();
        assert!(matches!(err, ClassifierError::Initialization { .. }));
    }

    #[test]
    fn missing_model_asset_is_an_initialization_error() {
        let assets = crate::assets::MemoryAssets::new().with("labels.txt", "A\nB\n");
        let err = InferenceEngine::from_assets(&assets, &ClassifierConfig::default()).unwrap_err();
        let ClassifierError::Initialization { asset, .. } = &err else {
            panic!("expected an initialization error, got {err:?}");
        };
        assert_eq!(asset, "component_classifier.onnx");
    }
}
