//! Bidirectional feature label ↔ index key registry.
//!
//! Storage keys embed the feature index verbatim, so deployments keep
//! them compact (typically one character) while exposing readable
//! labels like `"stacktrace:frame-pairs"` at the API surface. The
//! registry resolves both directions and rejects ambiguous tables.

use std::collections::HashMap;

use thiserror::Error;

/// Errors building an alias table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AliasError {
    #[error("duplicate feature label {0:?}")]
    DuplicateLabel(String),
    #[error("duplicate index key {0:?}")]
    DuplicateKey(String),
}

/// A bidirectional mapping between feature labels and the compact keys
/// stored in the index.
#[derive(Debug, Clone, Default)]
pub struct FeatureAliases {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

impl FeatureAliases {
    /// Build a registry from `(label, index_key)` pairs. Both sides
    /// must be unique.
    pub fn new(
        mapping: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, AliasError> {
        let mut forward = HashMap::new();
        let mut reverse = HashMap::new();
        for (label, key) in mapping {
            if reverse.contains_key(&key) {
                return Err(AliasError::DuplicateKey(key));
            }
            if forward.contains_key(&label) {
                return Err(AliasError::DuplicateLabel(label));
            }
            reverse.insert(key.clone(), label.clone());
            forward.insert(label, key);
        }
        Ok(Self { forward, reverse })
    }

    /// The compact index key for a feature label.
    pub fn index_key(&self, label: &str) -> Option<&str> {
        self.forward.get(label).map(String::as_str)
    }

    /// The feature label behind a compact index key.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.reverse.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(label, key)| (label.to_string(), key.to_string()))
            .collect()
    }

    #[test]
    fn resolves_both_directions() {
        let aliases = FeatureAliases::new(pairs(&[
            ("message:character-shingles", "a"),
            ("stacktrace:frame-pairs", "b"),
        ]))
        .unwrap();

        assert_eq!(aliases.index_key("stacktrace:frame-pairs"), Some("b"));
        assert_eq!(aliases.label("a"), Some("message:character-shingles"));
        assert_eq!(aliases.index_key("unknown"), None);
        assert_eq!(aliases.len(), 2);
    }

    #[test]
    fn duplicate_label_rejected() {
        let err = FeatureAliases::new(pairs(&[("x", "a"), ("x", "b")])).unwrap_err();
        assert_eq!(err, AliasError::DuplicateLabel("x".into()));
    }

    #[test]
    fn duplicate_key_rejected() {
        let err = FeatureAliases::new(pairs(&[("x", "a"), ("y", "a")])).unwrap_err();
        assert_eq!(err, AliasError::DuplicateKey("a".into()));
    }
}
