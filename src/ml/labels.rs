//! Bidirectional mapping between heading levels and class indices.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::HeadingLevel;

/// Heading levels in class-index order.
///
/// Built once from training labels and persisted with the model, so
/// decoding at inference never re-derives the mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    classes: Vec<HeadingLevel>,
}

impl LabelMap {
    /// Build a mapping from the distinct labels seen, sorted by label name.
    pub fn fit<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a HeadingLevel>,
    {
        let mut classes: Vec<HeadingLevel> = labels.into_iter().copied().collect();
        classes.sort_by_key(|l| l.as_str());
        classes.dedup();
        Self { classes }
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if the mapping has no classes.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Classes in index order.
    pub fn classes(&self) -> &[HeadingLevel] {
        &self.classes
    }

    /// Index of a level.
    pub fn encode(&self, level: HeadingLevel) -> Result<usize> {
        self.classes
            .iter()
            .position(|c| *c == level)
            .ok_or_else(|| Error::Schema(format!("label '{}' unknown to the model", level)))
    }

    /// Level of an index.
    pub fn decode(&self, index: usize) -> Result<HeadingLevel> {
        self.classes
            .get(index)
            .copied()
            .ok_or_else(|| Error::Schema(format!("class index {} out of range", index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_map_sorted_and_bidirectional() {
        let labels = [
            HeadingLevel::None,
            HeadingLevel::H2,
            HeadingLevel::H1,
            HeadingLevel::None,
        ];
        let map = LabelMap::fit(&labels);

        assert_eq!(
            map.classes(),
            &[HeadingLevel::H1, HeadingLevel::H2, HeadingLevel::None]
        );
        assert_eq!(map.encode(HeadingLevel::None).unwrap(), 2);
        assert_eq!(map.decode(1).unwrap(), HeadingLevel::H2);
        assert!(map.encode(HeadingLevel::H4).is_err());
        assert!(map.decode(3).is_err());
    }

    #[test]
    fn test_label_map_serializes_names() {
        let map = LabelMap::fit(&[HeadingLevel::H3, HeadingLevel::None]);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"classes":["H3","None"]}"#);
    }
}
