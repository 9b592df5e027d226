//! Correction-feedback loop: promote corrected rows into the training
//! corpus and retrain.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::table::{read_table, write_table, CorpusRecord, FeatureRecord, LabelRecord, RowKey};
use super::trainer::{train, TrainingParams};
use crate::error::Result;
use crate::ml::{ArtifactStore, TrainedModelArtifact};
use crate::model::HeadingLevel;
use crate::storage::WriterLock;

/// Outcome of joining a feature table with a label table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionReport {
    /// Feature rows that found a label
    pub matched: usize,
    /// Feature rows with no label; not promoted
    pub unmatched_features: usize,
    /// Label rows with no feature row; not promoted
    pub unmatched_labels: usize,
}

impl PromotionReport {
    /// Rows lost to the inner join.
    pub fn dropped(&self) -> usize {
        self.unmatched_features + self.unmatched_labels
    }
}

/// Inner-join features with labels on `(file_name, page_number, text)`.
///
/// A label applies to every feature row sharing its key; when a key is
/// labelled more than once the last label wins.
pub fn join_labels(
    features: &[FeatureRecord],
    labels: &[LabelRecord],
) -> (Vec<(FeatureRecord, HeadingLevel)>, PromotionReport) {
    let by_key: HashMap<RowKey, HeadingLevel> = labels.iter().map(|l| (l.key(), l.level)).collect();

    let mut report = PromotionReport::default();
    let mut joined = Vec::new();
    for feature in features {
        match by_key.get(&feature.key()) {
            Some(level) => {
                joined.push((feature.clone(), *level));
                report.matched += 1;
            }
            None => report.unmatched_features += 1,
        }
    }

    let feature_keys: HashSet<RowKey> = features.iter().map(FeatureRecord::key).collect();
    report.unmatched_labels = labels
        .iter()
        .filter(|l| !feature_keys.contains(&l.key()))
        .count();

    if report.dropped() > 0 {
        log::warn!(
            "inner join dropped {} unlabelled feature row(s) and {} unmatched label row(s)",
            report.unmatched_features,
            report.unmatched_labels
        );
    }
    (joined, report)
}

/// Join and convert to corpus rows.
pub fn promote(
    features: &[FeatureRecord],
    labels: &[LabelRecord],
) -> (Vec<CorpusRecord>, PromotionReport) {
    let (joined, report) = join_labels(features, labels);
    let rows = joined
        .into_iter()
        .map(|(f, level)| CorpusRecord::new(f, level))
        .collect();
    (rows, report)
}

/// Result of one feedback run.
#[derive(Debug, Clone)]
pub struct FeedbackOutcome {
    pub promotion: PromotionReport,
    /// Corpus size after appending
    pub corpus_rows: usize,
    /// Newly published snapshot
    pub artifact: Arc<TrainedModelArtifact>,
}

/// Offline job owning the training corpus and the artifact store.
///
/// Runs take exclusive locks on the corpus directory and the store root,
/// so a second concurrent run fails with [`crate::Error::Locked`].
#[derive(Debug, Clone)]
pub struct FeedbackLoop {
    corpus_path: PathBuf,
    store: ArtifactStore,
    params: TrainingParams,
}

impl FeedbackLoop {
    /// Create a loop over a corpus file and an artifact store.
    pub fn new(corpus_path: impl Into<PathBuf>, store: ArtifactStore) -> Self {
        Self {
            corpus_path: corpus_path.into(),
            store,
            params: TrainingParams::default(),
        }
    }

    /// Override training hyperparameters.
    pub fn with_params(mut self, params: TrainingParams) -> Self {
        self.params = params;
        self
    }

    /// Path of the cumulative corpus table.
    pub fn corpus_path(&self) -> &Path {
        &self.corpus_path
    }

    fn corpus_dir(&self) -> PathBuf {
        match self.corpus_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Current corpus rows; an absent corpus is empty.
    pub fn load_corpus(&self) -> Result<Vec<CorpusRecord>> {
        if self.corpus_path.exists() {
            read_table(&self.corpus_path)
        } else {
            Ok(Vec::new())
        }
    }

    /// Promote corrected rows, append them to the corpus, retrain, and
    /// publish the new model.
    ///
    /// The corpus is replaced atomically before training. If training
    /// fails, the previously published model remains current.
    pub fn run(&self, features: &[FeatureRecord], labels: &[LabelRecord]) -> Result<FeedbackOutcome> {
        let corpus_dir = self.corpus_dir();
        let _corpus_lock = WriterLock::acquire(&corpus_dir)?;
        let _store_lock = if corpus_dir.as_path() == self.store.root() {
            None
        } else {
            Some(WriterLock::acquire(self.store.root())?)
        };

        let (promoted, promotion) = promote(features, labels);
        let mut corpus = self.load_corpus()?;
        corpus.extend(promoted);
        write_table(&self.corpus_path, &corpus)?;
        log::info!(
            "promoted {} row(s); corpus {} now has {} row(s)",
            promotion.matched,
            self.corpus_path.display(),
            corpus.len()
        );

        let artifact = self.store.publish(train(&corpus, &self.params)?)?;
        Ok(FeedbackOutcome {
            promotion,
            corpus_rows: corpus.len(),
            artifact,
        })
    }

    /// Retrain from the corpus as it stands and publish.
    pub fn retrain(&self) -> Result<Arc<TrainedModelArtifact>> {
        let _store_lock = WriterLock::acquire(self.store.root())?;
        let corpus = self.load_corpus()?;
        self.store.publish(train(&corpus, &self.params)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, TextFragment};

    fn feature(file: &str, page: u32, text: &str) -> FeatureRecord {
        let fragment =
            TextFragment::new(text, 12.0, "Arial", BBox::new(72.0, 100.0, 300.0, 112.0), page).unwrap();
        FeatureRecord::from_fragment(file, &fragment)
    }

    fn label(file: &str, page: u32, text: &str, level: HeadingLevel) -> LabelRecord {
        LabelRecord {
            file_name: file.to_string(),
            page_number: page,
            text: text.to_string(),
            level,
        }
    }

    #[test]
    fn test_join_counts_both_sides() {
        let features = vec![
            feature("a.pdf", 1, "Intro"),
            feature("a.pdf", 1, "Body text"),
            feature("a.pdf", 2, "Intro"),
        ];
        let labels = vec![
            label("a.pdf", 1, "Intro", HeadingLevel::H1),
            label("a.pdf", 3, "Stray", HeadingLevel::H2),
        ];
        let (joined, report) = join_labels(&features, &labels);

        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].0.page_number, 1);
        assert_eq!(
            report,
            PromotionReport {
                matched: 1,
                unmatched_features: 2,
                unmatched_labels: 1,
            }
        );
        assert_eq!(report.dropped(), 3);
    }

    #[test]
    fn test_join_key_includes_document() {
        let features = vec![feature("a.pdf", 1, "Intro")];
        let labels = vec![label("b.pdf", 1, "Intro", HeadingLevel::H1)];
        let (joined, report) = join_labels(&features, &labels);
        assert!(joined.is_empty());
        assert_eq!(report.unmatched_labels, 1);
    }

    #[test]
    fn test_run_fails_when_locked() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path().join("models"));
        let feedback = FeedbackLoop::new(dir.path().join("corpus").join("corpus.csv"), store);

        let _held = WriterLock::acquire(&dir.path().join("corpus")).unwrap();
        assert!(matches!(
            feedback.run(&[], &[]),
            Err(crate::Error::Locked(_))
        ));
    }
}
