//! Trained model artifacts and the versioned store they are published to.
//!
//! Store layout:
//!
//! ```text
//! <root>/snapshots/<version>.json   immutable snapshots
//! <root>/CURRENT                    name of the deployed version
//! ```
//!
//! Snapshots are never modified after publishing. Readers resolve `CURRENT`
//! once and keep the loaded snapshot for the rest of their call, so a
//! concurrent publish only affects later calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::gbdt::GradientBoostedTrees;
use super::labels::LabelMap;
use super::metrics::ClassificationReport;
use crate::analysis::FeatureTable;
use crate::error::{Error, Result};
use crate::model::HeadingLevel;
use crate::storage::write_atomic;

const SNAPSHOT_DIR: &str = "snapshots";
const CURRENT_FILE: &str = "CURRENT";

/// Classifier state plus everything needed to use it reproducibly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModelArtifact {
    /// Snapshot id, assigned at creation and made unique on publish
    pub version: String,
    pub created_at: DateTime<Utc>,
    /// Columns the model was fitted on, in order
    pub feature_columns: Vec<String>,
    pub labels: LabelMap,
    pub model: GradientBoostedTrees,
    /// Held-out evaluation, when a test split was available
    pub evaluation: Option<ClassificationReport>,
    pub training_rows: usize,
}

impl TrainedModelArtifact {
    /// Wrap a fitted model, stamping it with the current time.
    pub fn new(
        feature_columns: Vec<String>,
        labels: LabelMap,
        model: GradientBoostedTrees,
        evaluation: Option<ClassificationReport>,
        training_rows: usize,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            version: created_at.format("%Y%m%dT%H%M%S%3fZ").to_string(),
            created_at,
            feature_columns,
            labels,
            model,
            evaluation,
            training_rows,
        }
    }

    /// Read an artifact file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| {
            Error::Artifact(format!("cannot read {}: {}", path.display(), e))
        })?;
        let artifact: Self = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Artifact(format!("{}: {}", path.display(), e)))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Write the artifact to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec(self)?;
        write_atomic(path, &json)
    }

    fn validate(&self) -> Result<()> {
        if self.model.n_features() != self.feature_columns.len() {
            return Err(Error::Artifact(format!(
                "model expects {} features but {} columns are recorded",
                self.model.n_features(),
                self.feature_columns.len()
            )));
        }
        if self.model.n_classes() != self.labels.len() {
            return Err(Error::Artifact(format!(
                "model has {} classes but the label map has {}",
                self.model.n_classes(),
                self.labels.len()
            )));
        }
        Ok(())
    }

    /// Predict a level per table row, reconciling columns first.
    pub fn predict(&self, table: &FeatureTable) -> Result<Vec<HeadingLevel>> {
        let rows = table.reconcile(&self.feature_columns)?;
        self.model
            .predict(&rows)?
            .into_iter()
            .map(|i| self.labels.decode(i))
            .collect()
    }
}

/// Directory of immutable artifact snapshots with a current-version pointer.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Use `root` as the store directory. Nothing is created until publish.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn snapshot_path(&self, version: &str) -> PathBuf {
        self.root.join(SNAPSHOT_DIR).join(format!("{}.json", version))
    }

    /// Version named by the `CURRENT` pointer, if any.
    pub fn current_version(&self) -> Result<Option<String>> {
        match fs::read_to_string(self.root.join(CURRENT_FILE)) {
            Ok(s) => {
                let version = s.trim();
                Ok((!version.is_empty()).then(|| version.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the deployed snapshot.
    pub fn load_current(&self) -> Result<Arc<TrainedModelArtifact>> {
        let version = self.current_version()?.ok_or_else(|| {
            Error::Artifact(format!("no model published in {}", self.root.display()))
        })?;
        self.load_version(&version)
    }

    /// Load a specific snapshot.
    pub fn load_version(&self, version: &str) -> Result<Arc<TrainedModelArtifact>> {
        let artifact = TrainedModelArtifact::load(&self.snapshot_path(version))?;
        log::debug!("loaded model snapshot {}", artifact.version);
        Ok(Arc::new(artifact))
    }

    /// All published snapshot versions, oldest first.
    pub fn versions(&self) -> Result<Vec<String>> {
        let dir = self.root.join(SNAPSHOT_DIR);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut versions: Vec<String> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                name.strip_suffix(".json")
                    .filter(|v| !v.starts_with('.'))
                    .map(str::to_string)
            })
            .collect();
        versions.sort();
        Ok(versions)
    }

    /// Write `artifact` as a new snapshot and point `CURRENT` at it.
    ///
    /// The snapshot is fully written before the pointer moves; if anything
    /// fails, the previously deployed version stays current. Callers that
    /// may race with other writers must hold a [`crate::storage::WriterLock`]
    /// on the store root.
    pub fn publish(&self, mut artifact: TrainedModelArtifact) -> Result<Arc<TrainedModelArtifact>> {
        let base = artifact.version.clone();
        let mut suffix = 1;
        while self.snapshot_path(&artifact.version).exists() {
            artifact.version = format!("{}-{}", base, suffix);
            suffix += 1;
        }

        artifact.save(&self.snapshot_path(&artifact.version))?;
        write_atomic(&self.root.join(CURRENT_FILE), artifact.version.as_bytes())?;
        log::info!(
            "published model {} to {}",
            artifact.version,
            self.root.display()
        );
        Ok(Arc::new(artifact))
    }
}
