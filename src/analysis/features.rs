//! Layout normalizer: per-fragment feature vectors and the tabular encoding
//! shared by training and inference.
//!
//! Column order is fixed: the [`BASE_COLUMNS`] followed by one
//! `alignment_<category>` column per non-reference alignment category
//! present in the table (drop-first one-hot, reference = [`Alignment::REFERENCE`]).

use super::noise::is_noise;
use super::profile::DocumentFontProfile;
use crate::error::{Error, Result};
use crate::model::{Alignment, TextFragment};

/// Numeric columns every feature table starts with, in order.
pub const BASE_COLUMNS: [&str; 11] = [
    "font_size",
    "relative_to_max",
    "relative_to_mean",
    "above_std",
    "is_bold",
    "is_italic",
    "line_spacing_before",
    "line_spacing_after",
    "text_len",
    "y0",
    "page_number",
];

const ALIGNMENT_PREFIX: &str = "alignment_";

/// Column name for an alignment category.
pub fn alignment_column(alignment: Alignment) -> String {
    format!("{}{}", ALIGNMENT_PREFIX, alignment)
}

/// Derived features of one fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub font_size: f64,
    pub relative_to_max: f64,
    pub relative_to_mean: f64,
    pub above_std: f64,
    pub is_bold: bool,
    pub is_italic: bool,
    pub line_spacing_before: Option<f64>,
    pub line_spacing_after: Option<f64>,
    pub text_len: usize,
    pub y0: f64,
    pub page_number: u32,
    pub alignment: Alignment,
}

impl FeatureVector {
    /// Derive the features of a fragment against its document's profile.
    pub fn from_fragment(fragment: &TextFragment, profile: &DocumentFontProfile) -> Self {
        let size = fragment.font_size as f64;
        Self {
            font_size: size,
            relative_to_max: profile.relative_to_max(size),
            relative_to_mean: profile.relative_to_mean(size),
            above_std: profile.above_std(size),
            is_bold: fragment.is_bold,
            is_italic: fragment.is_italic,
            line_spacing_before: fragment.line_spacing_before.map(f64::from),
            line_spacing_after: fragment.line_spacing_after.map(f64::from),
            text_len: fragment.text.chars().count(),
            y0: fragment.bbox.y0 as f64,
            page_number: fragment.page_number,
            alignment: fragment.alignment,
        }
    }

    /// Values for [`BASE_COLUMNS`]; missing spacing is encoded as 0.
    pub fn base_values(&self) -> [f64; 11] {
        [
            self.font_size,
            self.relative_to_max,
            self.relative_to_mean,
            self.above_std,
            bool_value(self.is_bold),
            bool_value(self.is_italic),
            self.line_spacing_before.unwrap_or(0.0),
            self.line_spacing_after.unwrap_or(0.0),
            self.text_len as f64,
            self.y0,
            self.page_number as f64,
        ]
    }
}

fn bool_value(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// A fragment that survived normalization, with its features.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    /// Index into the document's fragment list
    pub fragment_index: usize,
    pub features: FeatureVector,
}

/// Output of the layout normalizer for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDocument {
    pub profile: DocumentFontProfile,
    pub rows: Vec<NormalizedRow>,
}

/// Compute the font profile and a feature vector per non-noise fragment.
///
/// Returns `None` when every fragment is noise.
pub fn normalize(fragments: &[TextFragment]) -> Option<NormalizedDocument> {
    let profile = DocumentFontProfile::from_fragments(fragments)?;
    let rows = fragments
        .iter()
        .enumerate()
        .filter(|(_, f)| !is_noise(&f.text))
        .map(|(fragment_index, f)| NormalizedRow {
            fragment_index,
            features: FeatureVector::from_fragment(f, &profile),
        })
        .collect();

    Some(NormalizedDocument { profile, rows })
}

/// Dense numeric encoding of a set of feature vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureTable {
    /// Encode vectors with drop-first one-hot alignment columns.
    pub fn encode<'a, I>(vectors: I) -> Self
    where
        I: IntoIterator<Item = &'a FeatureVector>,
    {
        let vectors: Vec<&FeatureVector> = vectors.into_iter().collect();

        let mut present: Vec<Alignment> = vectors
            .iter()
            .map(|v| v.alignment)
            .filter(|a| *a != Alignment::REFERENCE)
            .collect();
        present.sort();
        present.dedup();

        let mut columns: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.extend(present.iter().map(|a| alignment_column(*a)));

        let rows = vectors
            .iter()
            .map(|v| {
                let mut row = v.base_values().to_vec();
                row.extend(present.iter().map(|a| bool_value(v.alignment == *a)));
                row
            })
            .collect();

        Self { columns, rows }
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Encoded rows.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Re-project rows onto the column set a model was trained with.
    ///
    /// Alignment columns the trained set has but this table lacks are
    /// injected as all-zero. Any other difference (base columns, an
    /// alignment column unknown at training time) is a schema error.
    pub fn reconcile(&self, trained: &[String]) -> Result<Vec<Vec<f64>>> {
        let base = BASE_COLUMNS.len();
        if trained.len() < base
            || trained[..base]
                .iter()
                .zip(BASE_COLUMNS.iter())
                .any(|(t, b)| t != b)
        {
            return Err(Error::Schema(format!(
                "trained columns {:?} do not start with {:?}",
                trained, BASE_COLUMNS
            )));
        }
        if let Some(bad) = trained[base..]
            .iter()
            .find(|c| !c.starts_with(ALIGNMENT_PREFIX))
        {
            return Err(Error::Schema(format!("unexpected trained column '{}'", bad)));
        }
        if let Some(unknown) = self.columns[base..].iter().find(|c| !trained.contains(c)) {
            return Err(Error::Schema(format!(
                "column '{}' was not present at training time",
                unknown
            )));
        }

        // Position of each trained alignment column in this table, if present
        let sources: Vec<Option<usize>> = trained[base..]
            .iter()
            .map(|t| self.columns.iter().position(|c| c == t))
            .collect();
        let injected = sources.iter().filter(|s| s.is_none()).count();
        if injected > 0 {
            log::debug!("injecting {} all-zero alignment column(s)", injected);
        }

        Ok(self
            .rows
            .iter()
            .map(|row| {
                let mut out = row[..base].to_vec();
                out.extend(sources.iter().map(|s| s.map_or(0.0, |i| row[i])));
                out
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;

    fn frag(text: &str, size: f32, alignment: Alignment) -> TextFragment {
        TextFragment::new(text, size, "Helvetica-Bold", BBox::new(72.0, 40.0, 300.0, 52.0), 1)
            .unwrap()
            .with_alignment(alignment)
    }

    #[test]
    fn test_normalize_skips_noise() {
        let frags = vec![
            frag("Heading One", 18.0, Alignment::Left),
            frag("42", 12.0, Alignment::Left),
            frag("Body text line", 12.0, Alignment::Indented),
        ];
        let doc = normalize(&frags).unwrap();
        assert_eq!(doc.rows.len(), 2);
        assert_eq!(doc.rows[1].fragment_index, 2);
        assert_eq!(doc.profile.max_font, 18.0);

        let heading = &doc.rows[0].features;
        assert_eq!(heading.relative_to_max, 1.0);
        assert!(heading.above_std > 0.0);
        assert!(heading.is_bold);
        assert_eq!(heading.text_len, 11);
    }

    #[test]
    fn test_normalize_uniform_document() {
        let frags = vec![
            frag("Only one size", 11.0, Alignment::Left),
            frag("Still one size", 11.0, Alignment::Left),
        ];
        let doc = normalize(&frags).unwrap();
        assert!(doc.rows.iter().all(|r| r.features.above_std == 0.0));
    }

    #[test]
    fn test_encode_drop_first_alignment() {
        let frags = [
            frag("Centered title", 20.0, Alignment::Center),
            frag("Left body", 12.0, Alignment::Left),
        ];
        let profile = DocumentFontProfile::from_fragments(&frags).unwrap();
        let vectors: Vec<FeatureVector> = frags
            .iter()
            .map(|f| FeatureVector::from_fragment(f, &profile))
            .collect();

        let table = FeatureTable::encode(&vectors);
        assert_eq!(table.columns().len(), BASE_COLUMNS.len() + 1);
        assert_eq!(table.columns().last().unwrap(), "alignment_left");
        // Reference category: all one-hot columns zero
        assert_eq!(*table.rows()[0].last().unwrap(), 0.0);
        assert_eq!(*table.rows()[1].last().unwrap(), 1.0);
    }

    #[test]
    fn test_reconcile_injects_missing_alignment() {
        let frags = [frag("Left body", 12.0, Alignment::Left)];
        let profile = DocumentFontProfile::from_fragments(&frags).unwrap();
        let vectors = vec![FeatureVector::from_fragment(&frags[0], &profile)];
        let table = FeatureTable::encode(&vectors);

        let mut trained: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
        trained.push("alignment_indented".to_string());
        trained.push("alignment_left".to_string());

        let rows = table.reconcile(&trained).unwrap();
        assert_eq!(rows[0].len(), trained.len());
        assert_eq!(rows[0][BASE_COLUMNS.len()], 0.0);
        assert_eq!(rows[0][BASE_COLUMNS.len() + 1], 1.0);
    }

    #[test]
    fn test_reconcile_rejects_unknown_column() {
        let frags = [frag("Indented body", 12.0, Alignment::Indented)];
        let profile = DocumentFontProfile::from_fragments(&frags).unwrap();
        let vectors = vec![FeatureVector::from_fragment(&frags[0], &profile)];
        let table = FeatureTable::encode(&vectors);

        let mut trained: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
        trained.push("alignment_left".to_string());
        assert!(matches!(table.reconcile(&trained), Err(Error::Schema(_))));
    }

    #[test]
    fn test_reconcile_rejects_base_mismatch() {
        let table = FeatureTable::encode(&Vec::<FeatureVector>::new());
        let trained = vec!["font_size".to_string(), "text_len".to_string()];
        assert!(matches!(table.reconcile(&trained), Err(Error::Schema(_))));
    }
}
