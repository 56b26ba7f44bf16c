//! Error types for the classifier.
//!
//! Two families live here. [`ClassifierError`] is returned as `Err` and is
//! reserved for construction failures and bad input. [`Fault`] covers runtime
//! problems that are recovered locally; those never abort a classification and
//! are reported alongside a sentinel value through [`Outcome`].

/// Fatal errors.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// A model or label asset is missing or corrupt.
    #[error("failed to initialize from asset '{asset}': {reason}")]
    Initialization { asset: String, reason: String },

    #[error("invalid input image: {0}")]
    InvalidInput(String),

    /// Raised by inference backends. The engine converts it to a
    /// [`Fault::Classification`] before it reaches the pipeline caller.
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClassifierError {
    pub(crate) fn initialization(asset: impl Into<String>, reason: impl ToString) -> Self {
        Self::Initialization {
            asset: asset.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = ClassifierError> = std::result::Result<T, E>;

/// Recovered faults.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Fault {
    #[error("classification fault: {0}")]
    Classification(String),

    #[error("metadata fault: {0}")]
    Metadata(String),
}

/// A value that is always usable, tagged with the fault that forced it to a
/// sentinel if there was one.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub fault: Option<Fault>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self { value, fault: None }
    }

    pub fn degraded(value: T, fault: Fault) -> Self {
        Self {
            value,
            fault: Some(fault),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.fault.is_some()
    }

    pub fn into_parts(self) -> (T, Option<Fault>) {
        (self.value, self.fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialization_error_names_the_asset() {
        let err = ClassifierError::initialization("labels.txt", "empty label list");
        assert_eq!(
            err.to_string(),
            "failed to initialize from asset 'labels.txt': empty label list"
        );
    }

    #[test]
    fn outcome_tags_degradation() {
        let ok = Outcome::ok(1);
        assert!(!ok.is_degraded());

        let degraded = Outcome::degraded(0, Fault::Metadata("not found".into()));
        assert!(degraded.is_degraded());
        let (value, fault) = degraded.into_parts();
        assert_eq!(value, 0);
        assert_eq!(fault, Some(Fault::Metadata("not found".into())));
    }
}
