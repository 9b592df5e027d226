//! Learned heading classifier backed by a trained artifact snapshot.

use std::sync::Arc;

use super::{ClassifyContext, HeadingClassifier, LabeledFragment};
use crate::analysis::{is_noise, FeatureTable, FeatureVector};
use crate::error::Result;
use crate::ml::TrainedModelArtifact;
use crate::model::TextFragment;

/// Classifies fragments with one immutable model snapshot.
#[derive(Debug, Clone)]
pub struct LearnedClassifier {
    artifact: Arc<TrainedModelArtifact>,
}

impl LearnedClassifier {
    /// Bind the classifier to a snapshot.
    pub fn new(artifact: Arc<TrainedModelArtifact>) -> Self {
        Self { artifact }
    }

    /// The snapshot in use.
    pub fn artifact(&self) -> &Arc<TrainedModelArtifact> {
        &self.artifact
    }
}

impl HeadingClassifier for LearnedClassifier {
    fn classify<'a>(
        &self,
        fragments: &'a [TextFragment],
        context: &ClassifyContext<'_>,
    ) -> Result<Vec<LabeledFragment<'a>>> {
        let Some(profile) = context.profile else {
            return Ok(Vec::new());
        };

        let inputs: Vec<&TextFragment> = fragments
            .iter()
            .filter(|f| !is_noise(&f.text) && !context.is_title(&f.text))
            .collect();
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let vectors: Vec<FeatureVector> = inputs
            .iter()
            .map(|f| FeatureVector::from_fragment(f, profile))
            .collect();
        let table = FeatureTable::encode(&vectors);
        let predicted = self.artifact.predict(&table)?;

        let labeled: Vec<LabeledFragment<'a>> = inputs
            .into_iter()
            .zip(predicted)
            .filter(|(_, level)| level.is_heading())
            .map(|(fragment, level)| LabeledFragment { fragment, level })
            .collect();
        log::debug!(
            "model {} labelled {} of {} fragments as headings",
            self.artifact.version,
            labeled.len(),
            vectors.len()
        );
        Ok(labeled)
    }

    fn name(&self) -> &'static str {
        "learned"
    }
}
