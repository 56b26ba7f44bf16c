use std::ops::Deref;
use std::sync::Arc;

use crate::assets::AssetSource;
use crate::error::{ClassifierError, Result};

/// Ordered label names. Index `i` names model output `i`.
///
/// Cloning is cheap; the names are shared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet(Arc<[String]>);

impl LabelSet {
    pub fn new(labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(labels.into_iter().map(Into::into).collect())
    }

    /// Parse newline-delimited label text. Line order is output order; a
    /// trailing newline does not add an empty label.
    pub fn parse(text: &str) -> Self {
        Self(text.lines().map(str::to_string).collect())
    }

    /// Read and parse the label asset. An empty list cannot describe any model
    /// output and is rejected.
    pub fn load(assets: &dyn AssetSource, name: &str) -> Result<Self> {
        let text = assets
            .open_to_string(name)
            .map_err(|e| ClassifierError::initialization(name, e))?;
        let labels = Self::parse(&text);
        if labels.is_empty() {
            return Err(ClassifierError::initialization(name, "label list is empty"));
        }
        Ok(labels)
    }
}

impl Deref for LabelSet {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;

    #[test]
    fn parse_keeps_line_order() {
        let labels = LabelSet::parse("Resistor\nCapacitor\r\nLED\n");
        assert_eq!(&labels[..], &["Resistor", "Capacitor", "LED"]);
    }

    #[test]
    fn parse_keeps_interior_blank_lines_as_labels() {
        // Dropping one would shift every later index.
        let labels = LabelSet::parse("A\n\nC");
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[2], "C");
    }

    #[test]
    fn load_rejects_missing_and_empty_assets() {
        let assets = MemoryAssets::new().with("empty.txt", "");
        let missing = LabelSet::load(&assets, "labels.txt").unwrap_err();
        let ClassifierError::Initialization { asset, .. } = &missing else {
            panic!("expected an initialization error, got {missing:?}");
        };
        assert_eq!(asset, "labels.txt");
        let empty = LabelSet::load(&assets, "empty.txt").unwrap_err();
        assert!(matches!(empty, ClassifierError::Initialization { .. }));
    }

    #[test]
    fn default_is_empty() {
        assert!(LabelSet::default().is_empty());
    }
}
