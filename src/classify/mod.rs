//! Heading classifiers.
//!
//! Two interchangeable strategies implement [`HeadingClassifier`]: the
//! font-rank heuristic and the learned boosted-tree model. The assembler
//! only sees their [`LabeledFragment`] output.

mod heuristic;
mod learned;

pub use heuristic::{FontRankClassifier, FontRanking};
pub use learned::LearnedClassifier;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::analysis::DocumentFontProfile;
use crate::error::{Error, Result};
use crate::model::{HeadingLevel, TextFragment};

/// Which classifier a pipeline runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Font-size ranking, no trained state
    #[default]
    Heuristic,
    /// Trained model from the artifact store
    Learned,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Heuristic => f.write_str("heuristic"),
            Strategy::Learned => f.write_str("learned"),
        }
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "heuristic" => Ok(Strategy::Heuristic),
            "learned" | "ml" => Ok(Strategy::Learned),
            other => Err(Error::Schema(format!("unknown strategy '{}'", other))),
        }
    }
}

/// Per-document context threaded into a classifier.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext<'a> {
    /// Selected title; fragments with this exact text are never classified
    pub title: &'a str,
    /// Font profile of the document; `None` when every fragment is noise
    pub profile: Option<&'a DocumentFontProfile>,
}

impl<'a> ClassifyContext<'a> {
    /// Create a context.
    pub fn new(title: &'a str, profile: Option<&'a DocumentFontProfile>) -> Self {
        Self { title, profile }
    }

    /// Whether `text` is the selected title.
    pub fn is_title(&self, text: &str) -> bool {
        !self.title.is_empty() && text.trim() == self.title
    }
}

/// A fragment assigned a heading level.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledFragment<'a> {
    pub fragment: &'a TextFragment,
    pub level: HeadingLevel,
}

/// Assigns heading levels to a document's fragments.
///
/// Implementations return headings only (never [`HeadingLevel::None`]) in
/// document order.
pub trait HeadingClassifier: Send + Sync {
    /// Label the fragments of one document.
    fn classify<'a>(
        &self,
        fragments: &'a [TextFragment],
        context: &ClassifyContext<'_>,
    ) -> Result<Vec<LabeledFragment<'a>>>;

    /// Short name for logging.
    fn name(&self) -> &'static str;
}
