//! Model training and evaluation from corpus rows.
//!
//! Features are rebuilt per document with the same profile and noise
//! filter the learned classifier uses at inference, so a row means the
//! same thing on both sides.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::table::{CorpusRecord, FeatureRecord};
use crate::analysis::{is_noise, DocumentFontProfile, FeatureTable, FeatureVector};
use crate::error::{Error, Result};
use crate::ml::{BoostingParams, ClassificationReport, GradientBoostedTrees, LabelMap, TrainedModelArtifact};
use crate::model::{HeadingLevel, TextFragment};

/// Training hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Seed of the train/test shuffle
    pub seed: u64,
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 5,
            learning_rate: 0.1,
            seed: 42,
            test_fraction: 0.2,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl TrainingParams {
    /// Set the number of boosting stages.
    pub fn with_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Set the shuffle seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the held-out share (clamped to `[0, 1)`).
    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction.clamp(0.0, 0.99);
        self
    }

    /// Ensemble hyperparameters.
    pub fn boosting(&self) -> BoostingParams {
        BoostingParams {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            learning_rate: self.learning_rate,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

/// Encoded training rows with their levels.
#[derive(Debug, Clone)]
pub struct TrainingSamples {
    pub table: FeatureTable,
    pub levels: Vec<HeadingLevel>,
    /// Rows dropped as noise or as invalid fragments
    pub skipped: usize,
}

/// Rebuild feature vectors per document and encode them into one table.
///
/// Documents are grouped by `file_name` in first-appearance order; each
/// gets its own font profile over its non-noise rows. Noise rows and rows
/// that cannot form a fragment are skipped.
pub fn build_samples<'a, I>(rows: I) -> TrainingSamples
where
    I: IntoIterator<Item = (&'a FeatureRecord, HeadingLevel)>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut documents: HashMap<&str, Vec<(TextFragment, HeadingLevel)>> = HashMap::new();
    let mut skipped = 0;

    for (record, level) in rows {
        let Some(fragment) = record.to_fragment() else {
            skipped += 1;
            continue;
        };
        let name = record.file_name.as_str();
        documents
            .entry(name)
            .or_insert_with(|| {
                order.push(name);
                Vec::new()
            })
            .push((fragment, level));
    }

    let mut vectors = Vec::new();
    let mut levels = Vec::new();
    for name in order {
        let doc = &documents[name];
        let Some(profile) = DocumentFontProfile::from_fragments(doc.iter().map(|(f, _)| f)) else {
            skipped += doc.len();
            continue;
        };
        for (fragment, level) in doc {
            if is_noise(&fragment.text) {
                skipped += 1;
                continue;
            }
            vectors.push(FeatureVector::from_fragment(fragment, &profile));
            levels.push(*level);
        }
    }

    if skipped > 0 {
        log::debug!("skipped {} noise or invalid row(s)", skipped);
    }
    TrainingSamples {
        table: FeatureTable::encode(&vectors),
        levels,
        skipped,
    }
}

/// Deterministic train/test split of `n` row indices.
///
/// Holds out `ceil(n * test_fraction)` rows, always leaving at least one
/// training row.
pub fn split_indices(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_len = ((n as f64 * test_fraction).ceil() as usize).min(n.saturating_sub(1));
    let train = indices.split_off(test_len);
    (train, indices)
}

/// Fit a model on corpus rows and evaluate it on a held-out split.
pub fn train(corpus: &[CorpusRecord], params: &TrainingParams) -> Result<TrainedModelArtifact> {
    if corpus.is_empty() {
        return Err(Error::Training("training corpus is empty".to_string()));
    }
    let features: Vec<FeatureRecord> = corpus.iter().map(CorpusRecord::features).collect();
    let samples = build_samples(features.iter().zip(corpus.iter().map(|r| r.level)));
    if samples.table.is_empty() {
        return Err(Error::Training(
            "no usable rows after noise filtering".to_string(),
        ));
    }

    let labels = LabelMap::fit(&samples.levels);
    if labels.len() < 2 {
        return Err(Error::Training(format!(
            "corpus contains a single class ({})",
            labels.classes().first().map_or("none", |l| l.as_str())
        )));
    }
    let y: Vec<usize> = samples
        .levels
        .iter()
        .map(|l| labels.encode(*l))
        .collect::<Result<_>>()?;

    let (train_idx, test_idx) = split_indices(samples.table.len(), params.test_fraction, params.seed);
    let rows = samples.table.rows();
    let train_x: Vec<Vec<f64>> = train_idx.iter().map(|&i| rows[i].clone()).collect();
    let train_y: Vec<usize> = train_idx.iter().map(|&i| y[i]).collect();

    log::info!(
        "training on {} rows ({} held out), {} classes, {} features",
        train_x.len(),
        test_idx.len(),
        labels.len(),
        samples.table.columns().len()
    );
    let model = GradientBoostedTrees::fit(&train_x, &train_y, labels.len(), &params.boosting())?;

    let evaluation = if test_idx.is_empty() {
        None
    } else {
        let test_x: Vec<Vec<f64>> = test_idx.iter().map(|&i| rows[i].clone()).collect();
        let predicted = model
            .predict(&test_x)?
            .into_iter()
            .map(|i| labels.decode(i))
            .collect::<Result<Vec<_>>>()?;
        let actual: Vec<HeadingLevel> = test_idx.iter().map(|&i| samples.levels[i]).collect();
        let report = ClassificationReport::compute(labels.classes(), &actual, &predicted);
        log::info!("held-out accuracy {:.4}", report.accuracy);
        Some(report)
    };

    Ok(TrainedModelArtifact::new(
        samples.table.columns().to_vec(),
        labels,
        model,
        evaluation,
        train_x.len(),
    ))
}

/// Score an artifact against labelled feature rows.
///
/// Labels the artifact has never seen are a schema error.
pub fn evaluate(
    artifact: &TrainedModelArtifact,
    rows: &[(FeatureRecord, HeadingLevel)],
) -> Result<ClassificationReport> {
    let samples = build_samples(rows.iter().map(|(f, l)| (f, *l)));
    for level in &samples.levels {
        artifact.labels.encode(*level)?;
    }
    let predicted = artifact.predict(&samples.table)?;
    Ok(ClassificationReport::compute(
        artifact.labels.classes(),
        &samples.levels,
        &predicted,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Alignment, BBox};

    fn record(file: &str, page: u32, text: &str, size: f32, level: HeadingLevel) -> CorpusRecord {
        let fragment = TextFragment::new(text, size, "Arial", BBox::new(72.0, 100.0, 300.0, 100.0 + size), page)
            .unwrap()
            .with_alignment(if size > 14.0 { Alignment::Center } else { Alignment::Left });
        CorpusRecord::new(FeatureRecord::from_fragment(file, &fragment), level)
    }

    fn corpus() -> Vec<CorpusRecord> {
        let mut rows = Vec::new();
        for doc in ["a.pdf", "b.pdf", "c.pdf"] {
            for i in 0..4 {
                rows.push(record(doc, 1, &format!("Section {}", i), 18.0, HeadingLevel::H1));
                rows.push(record(doc, 1, &format!("Body line {}", i), 11.0, HeadingLevel::None));
                rows.push(record(doc, 2, &format!("More body {}", i), 11.0, HeadingLevel::None));
            }
            rows.push(record(doc, 2, "7", 11.0, HeadingLevel::None));
        }
        rows
    }

    fn fast() -> TrainingParams {
        TrainingParams::default().with_estimators(15)
    }

    #[test]
    fn test_split_is_deterministic() {
        let (train_a, test_a) = split_indices(10, 0.2, 42);
        let (train_b, test_b) = split_indices(10, 0.2, 42);
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(test_a.len(), 2);
        assert_eq!(train_a.len(), 8);

        let (train, test) = split_indices(1, 0.2, 42);
        assert_eq!((train.len(), test.len()), (1, 0));
    }

    #[test]
    fn test_build_samples_drops_noise() {
        let rows = corpus();
        let features: Vec<FeatureRecord> = rows.iter().map(CorpusRecord::features).collect();
        let samples = build_samples(features.iter().zip(rows.iter().map(|r| r.level)));
        assert_eq!(samples.skipped, 3);
        assert_eq!(samples.levels.len(), rows.len() - 3);
        assert_eq!(samples.table.columns().last().unwrap(), "alignment_left");
    }

    #[test]
    fn test_train_produces_evaluated_artifact() {
        let artifact = train(&corpus(), &fast()).unwrap();
        assert_eq!(artifact.labels.classes(), &[HeadingLevel::H1, HeadingLevel::None]);
        let report = artifact.evaluation.as_ref().unwrap();
        assert_eq!(report.total, 8);
        assert_eq!(artifact.training_rows, 28);
        assert!(report.accuracy > 0.99);
    }

    #[test]
    fn test_train_rejects_single_class_and_empty() {
        let rows: Vec<CorpusRecord> = corpus()
            .into_iter()
            .filter(|r| r.level == HeadingLevel::None)
            .collect();
        assert!(matches!(train(&rows, &fast()), Err(Error::Training(_))));
        assert!(matches!(train(&[], &fast()), Err(Error::Training(_))));
    }

    #[test]
    fn test_evaluate_rejects_unknown_label() {
        let artifact = train(&corpus(), &fast()).unwrap();
        let mut rows: Vec<(FeatureRecord, HeadingLevel)> = corpus()
            .iter()
            .map(|r| (r.features(), r.level))
            .collect();
        let report = evaluate(&artifact, &rows).unwrap();
        assert_eq!(report.total, 36);

        rows[0].1 = HeadingLevel::H3;
        assert!(matches!(evaluate(&artifact, &rows), Err(Error::Schema(_))));
    }
}
