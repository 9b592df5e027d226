//! # pdfoutline
//!
//! Document outline inference for PDF files.
//!
//! Infers a title and an H1–H4 heading outline from the layout of a
//! document's text: font sizes relative to the document, emphasis,
//! alignment, and spacing. Image-only documents are routed to an OCR
//! engine; text-bearing documents are read directly.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfoutline::{extract_outline, render};
//!
//! fn main() -> pdfoutline::Result<()> {
//!     let outline = extract_outline("report.pdf")?;
//!     println!("{}", render::to_json(&outline, render::JsonFormat::Pretty)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Two classifiers**: a font-rank heuristic and a trained boosted-tree model
//! - **Routing**: text-native extraction or OCR, decided by sampling pages
//! - **Feedback loop**: analyst corrections are promoted into a training
//!   corpus and the model is retrained and republished atomically
//! - **Parallel batches**: independent documents run on rayon

pub mod analysis;
pub mod assemble;
pub mod classify;
pub mod error;
pub mod extract;
pub mod ml;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod storage;
pub mod training;

// Re-export commonly used types
pub use analysis::{is_noise, is_valid_heading, DocumentFontProfile, FeatureTable, TitleSelector};
pub use assemble::OutlineAssembler;
pub use classify::{FontRankClassifier, HeadingClassifier, LearnedClassifier, Strategy};
pub use error::{Error, Result, Stage};
pub use extract::{
    DocumentRouter, ExtractedDocument, ExtractionSource, LopdfSource, OcrEngine, OcrOptions,
    PageSource, RouterConfig,
};
pub use ml::{ArtifactStore, ClassificationReport, TrainedModelArtifact};
pub use model::{
    Alignment, AlignmentRule, BBox, HeadingLevel, OutlineDocument, OutlineEntry, OutlineMetadata,
    TextFragment,
};
pub use pipeline::{OutlinePipeline, PipelineOptions};
pub use render::JsonFormat;
pub use training::{FeedbackLoop, PromotionReport, TrainingParams};

use std::path::Path;

/// Infer the outline of a PDF file with the heuristic classifier.
///
/// # Example
///
/// ```no_run
/// use pdfoutline::extract_outline;
///
/// let outline = extract_outline("report.pdf").unwrap();
/// println!("{} ({} headings)", outline.title, outline.metadata.total_headings);
/// ```
pub fn extract_outline<P: AsRef<Path>>(path: P) -> Result<OutlineDocument> {
    OutlinePipeline::new(PipelineOptions::default()).process_path(path.as_ref())
}

/// Infer the outline of a PDF file with custom options.
///
/// The learned strategy needs a model; use [`OutlinePipeline`] with
/// [`OutlinePipeline::with_artifact_store`] for that.
pub fn extract_outline_with_options<P: AsRef<Path>>(
    path: P,
    options: PipelineOptions,
) -> Result<OutlineDocument> {
    OutlinePipeline::new(options).process_path(path.as_ref())
}

/// Infer an outline on the blocking thread pool.
#[cfg(feature = "async")]
pub async fn extract_outline_async<P: AsRef<Path>>(
    path: P,
    pipeline: OutlinePipeline,
) -> Result<OutlineDocument> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || pipeline.process_path(&path))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
}
