//! Error types for pdfoutline.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pdfoutline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage that produced a wrapped error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Opening the document with the page-text engine
    Open,
    /// Sampling pages to pick an extractor
    Route,
    /// Text-native extraction
    NativeExtract,
    /// OCR extraction
    OcrExtract,
    /// Heading classification
    Classify,
    /// Loading the trained model artifact
    ArtifactLoad,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Open => "open",
            Stage::Route => "route",
            Stage::NativeExtract => "native extraction",
            Stage::OcrExtract => "OCR extraction",
            Stage::Classify => "classification",
            Stage::ArtifactLoad => "artifact load",
        };
        f.write_str(name)
    }
}

/// Error types that can occur while inferring or training outlines.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// Extraction produced nothing usable; no outline is emitted.
    #[error("No text fragments extracted from {0}")]
    EmptyDocument(String),

    /// A pipeline stage failed.
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    /// Feature or label columns disagree between training and inference.
    #[error("Schema mismatch: {0}")]
    Schema(String),

    /// The trained artifact is missing or unreadable.
    #[error("Model artifact error: {0}")]
    Artifact(String),

    /// Retraining could not produce a model.
    #[error("Training error: {0}")]
    Training(String),

    /// Delimited table read/write error.
    #[error("Table error: {0}")]
    Table(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// The document needs OCR but no OCR engine is configured.
    #[error("Document requires OCR but no OCR engine is configured")]
    OcrUnavailable,

    /// Another writer holds the lock on an output directory.
    #[error("Output directory is locked by another run: {}", .0.display())]
    Locked(PathBuf),

    /// A heading level label could not be parsed.
    #[error("Invalid heading label: {0}")]
    InvalidLabel(String),

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),
}

impl Error {
    /// Wrap this error with the stage that produced it.
    ///
    /// Errors that are already stage-wrapped are returned unchanged so the
    /// innermost failing stage is the one reported.
    pub fn at(self, stage: Stage) -> Self {
        match self {
            Error::Stage { .. } => self,
            other => Error::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The failing stage, if this error was stage-wrapped.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Table(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}
