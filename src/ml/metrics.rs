//! Held-out evaluation of a classifier.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::HeadingLevel;

/// Precision, recall, and F1 for one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: HeadingLevel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true rows of this class
    pub support: usize,
}

/// Per-class metrics, overall accuracy, and the confusion matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    /// `confusion[actual][predicted]`, indexed like `classes`
    pub confusion: Vec<Vec<usize>>,
    pub total: usize,
}

impl ClassificationReport {
    /// Compare predictions against true labels.
    ///
    /// `labels` fixes the class order; pairs whose label is not listed are
    /// ignored. Undefined ratios (no predictions or no support) are 0.
    pub fn compute(labels: &[HeadingLevel], actual: &[HeadingLevel], predicted: &[HeadingLevel]) -> Self {
        let k = labels.len();
        let mut confusion = vec![vec![0usize; k]; k];
        let index = |l: &HeadingLevel| labels.iter().position(|c| c == l);

        let mut total = 0;
        let mut correct = 0;
        for (a, p) in actual.iter().zip(predicted) {
            if let (Some(ai), Some(pi)) = (index(a), index(p)) {
                confusion[ai][pi] += 1;
                total += 1;
                if ai == pi {
                    correct += 1;
                }
            }
        }

        let classes = labels
            .iter()
            .enumerate()
            .map(|(i, &label)| {
                let tp = confusion[i][i];
                let support: usize = confusion[i].iter().sum();
                let predicted: usize = confusion.iter().map(|row| row[i]).sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        Self {
            classes,
            accuracy: ratio(correct, total),
            confusion,
            total,
        }
    }

    /// Unweighted mean F1 across classes with support.
    pub fn macro_f1(&self) -> f64 {
        let supported: Vec<f64> = self
            .classes
            .iter()
            .filter(|c| c.support > 0)
            .map(|c| c.f1)
            .collect();
        if supported.is_empty() {
            0.0
        } else {
            supported.iter().sum::<f64>() / supported.len() as f64
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>8} {:>10} {:>10} {:>10} {:>8}",
            "", "precision", "recall", "f1", "support"
        )?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>8} {:>10.2} {:>10.2} {:>10.2} {:>8}",
                c.label.as_str(),
                c.precision,
                c.recall,
                c.f1,
                c.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "accuracy {:.4} ({} rows)", self.accuracy, self.total)?;
        writeln!(f, "macro f1 {:.4}", self.macro_f1())?;
        writeln!(f)?;
        writeln!(f, "confusion (rows = actual, columns = predicted)")?;
        write!(f, "{:>8}", "")?;
        for c in &self.classes {
            write!(f, " {:>6}", c.label.as_str())?;
        }
        writeln!(f)?;
        for (c, row) in self.classes.iter().zip(&self.confusion) {
            write!(f, "{:>8}", c.label.as_str())?;
            for n in row {
                write!(f, " {:>6}", n)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
