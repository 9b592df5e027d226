//! Integration tests for the correction-feedback loop.

use std::path::Path;
use std::sync::Arc;

use pdfoutline::storage::WriterLock;
use pdfoutline::training::{read_table, CorpusRecord, FeatureRecord, LabelRecord};
use pdfoutline::{
    ArtifactStore, BBox, Error, FeedbackLoop, HeadingLevel, OutlinePipeline, PipelineOptions,
    TextFragment, TrainingParams,
};

fn feature(file: &str, page: u32, text: &str, size: f32) -> FeatureRecord {
    let fragment = TextFragment::new(
        text,
        size,
        if size > 14.0 { "Arial-Bold" } else { "Arial" },
        BBox::new(72.0, 100.0, 320.0, 100.0 + size),
        page,
    )
    .unwrap();
    FeatureRecord::from_fragment(file, &fragment)
}

fn label_for(record: &FeatureRecord) -> LabelRecord {
    LabelRecord {
        file_name: record.file_name.clone(),
        page_number: record.page_number,
        text: record.text.clone(),
        level: if record.font_size > 14.0 {
            HeadingLevel::H1
        } else {
            HeadingLevel::None
        },
    }
}

/// Feature rows for a few documents with large headings and small body text.
fn extracted_rows() -> Vec<FeatureRecord> {
    let mut rows = Vec::new();
    for doc in ["alpha.pdf", "beta.pdf"] {
        for i in 0..5 {
            rows.push(feature(doc, 1, &format!("Chapter heading {}", i), 20.0));
            rows.push(feature(doc, 1, &format!("Running body sentence {}", i), 11.0));
            rows.push(feature(doc, 2, &format!("Another body sentence {}", i), 11.0));
            rows.push(feature(doc, 2, &format!("Closing body sentence {}", i), 11.0));
        }
    }
    rows
}

fn fast_params() -> TrainingParams {
    TrainingParams::default().with_estimators(20)
}

fn feedback_loop(root: &Path) -> FeedbackLoop {
    FeedbackLoop::new(
        root.join("corpus").join("corpus.csv"),
        ArtifactStore::open(root.join("models")),
    )
    .with_params(fast_params())
}

#[test]
fn test_half_labelled_promotion() {
    let dir = tempfile::tempdir().unwrap();
    let feedback = feedback_loop(dir.path());

    let features = extracted_rows();
    let labels: Vec<LabelRecord> = features.iter().step_by(2).map(label_for).collect();
    assert_eq!(labels.len() * 2, features.len());

    let outcome = feedback.run(&features, &labels).unwrap();
    assert_eq!(outcome.promotion.matched, labels.len());
    assert_eq!(outcome.promotion.unmatched_features, features.len() - labels.len());
    assert_eq!(outcome.promotion.unmatched_labels, 0);

    let corpus: Vec<CorpusRecord> = read_table(feedback.corpus_path()).unwrap();
    assert_eq!(corpus.len(), labels.len());
    for (row, label) in corpus.iter().zip(&labels) {
        assert_eq!(row.text, label.text);
        assert_eq!(row.level, label.level);
    }
    let unmatched: Vec<&FeatureRecord> = features.iter().skip(1).step_by(2).collect();
    assert!(unmatched
        .iter()
        .all(|f| !corpus.iter().any(|c| c.text == f.text && c.page_number == f.page_number)));
}

#[test]
fn test_corpus_accumulates_and_artifact_swaps() {
    let dir = tempfile::tempdir().unwrap();
    let feedback = feedback_loop(dir.path());
    let store = ArtifactStore::open(dir.path().join("models"));

    let features = extracted_rows();
    let labels: Vec<LabelRecord> = features.iter().map(label_for).collect();

    let first = feedback.run(&features, &labels).unwrap();
    let held: Arc<_> = store.load_current().unwrap();
    assert_eq!(held.version, first.artifact.version);

    let second = feedback.run(&features, &labels).unwrap();
    assert_eq!(second.corpus_rows, 2 * features.len());
    assert_ne!(first.artifact.version, second.artifact.version);

    // A reader bound to the old snapshot keeps it; new readers see the new one
    assert_eq!(held.version, first.artifact.version);
    assert_eq!(store.load_current().unwrap().version, second.artifact.version);
    assert_eq!(store.versions().unwrap().len(), 2);
}

#[test]
fn test_failed_retrain_keeps_previous_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path().join("models"));

    let features = extracted_rows();
    let labels: Vec<LabelRecord> = features.iter().map(label_for).collect();
    let good = feedback_loop(dir.path()).run(&features, &labels).unwrap();

    // A fresh corpus holding a single class cannot be trained on
    let other = FeedbackLoop::new(
        dir.path().join("other").join("corpus.csv"),
        ArtifactStore::open(dir.path().join("models")),
    )
    .with_params(fast_params());
    let body_only: Vec<FeatureRecord> = features.iter().filter(|f| f.font_size < 14.0).cloned().collect();
    let body_labels: Vec<LabelRecord> = body_only.iter().map(label_for).collect();
    let err = other.run(&body_only, &body_labels).unwrap_err();
    assert!(matches!(err, Error::Training(_)));

    assert_eq!(
        store.current_version().unwrap().as_deref(),
        Some(good.artifact.version.as_str())
    );
    assert_eq!(store.versions().unwrap().len(), 1);
    assert!(!dir.path().join("models").join(pdfoutline::storage::LOCK_FILE_NAME).exists());
}

#[test]
fn test_concurrent_run_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let feedback = feedback_loop(dir.path());
    let features = extracted_rows();
    let labels: Vec<LabelRecord> = features.iter().map(label_for).collect();

    let lock = WriterLock::acquire(&dir.path().join("models")).unwrap();
    assert!(matches!(feedback.run(&features, &labels), Err(Error::Locked(_))));
    assert!(!feedback.corpus_path().exists());

    drop(lock);
    assert!(feedback.run(&features, &labels).is_ok());
}

#[test]
fn test_learned_pipeline_uses_published_model() {
    let dir = tempfile::tempdir().unwrap();
    let features = extracted_rows();
    let labels: Vec<LabelRecord> = features.iter().map(label_for).collect();
    feedback_loop(dir.path()).run(&features, &labels).unwrap();

    let doc = pdfoutline::ExtractedDocument::new(
        "gamma.pdf",
        pdfoutline::ExtractionSource::Native,
        1,
        vec![
            feature("gamma.pdf", 1, "Chapter heading one", 20.0).to_fragment().unwrap(),
            feature("gamma.pdf", 1, "Running body sentence", 11.0).to_fragment().unwrap(),
            feature("gamma.pdf", 1, "Another body sentence", 11.0).to_fragment().unwrap(),
        ],
    );
    let pipeline = OutlinePipeline::new(PipelineOptions::default().learned())
        .with_artifact_store(ArtifactStore::open(dir.path().join("models")));
    let classifier = pipeline.bind_classifier().unwrap();
    let outline = pipeline.process_document(&doc, classifier.as_ref()).unwrap();

    assert_eq!(outline.title, "Chapter heading one");
    assert!(outline.outline.iter().all(|e| e.level != HeadingLevel::None));
    assert!(outline.outline.iter().all(|e| e.text != outline.title));
}
