//! Learned-model plumbing: label mapping, the boosted-tree ensemble,
//! evaluation metrics, and versioned artifacts.

mod artifact;
mod gbdt;
mod labels;
mod metrics;

pub use artifact::{ArtifactStore, TrainedModelArtifact};
pub use gbdt::{BoostingParams, GradientBoostedTrees, RegressionTree};
pub use labels::LabelMap;
pub use metrics::{ClassMetrics, ClassificationReport};
