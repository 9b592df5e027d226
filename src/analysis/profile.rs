//! Per-document font statistics.

use super::noise::is_noise;
use crate::model::TextFragment;

/// Font size statistics over the non-noise fragments of one document.
///
/// Computed fresh for every document and passed explicitly through the
/// pipeline; never shared between documents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentFontProfile {
    pub max_font: f64,
    pub mean_font: f64,
    /// Population standard deviation
    pub std_font: f64,
    /// Number of fragments the statistics cover
    pub samples: usize,
}

impl DocumentFontProfile {
    /// Compute the profile over fragments that survive the noise filter.
    ///
    /// Returns `None` when no fragment survives.
    pub fn from_fragments<'a, I>(fragments: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a TextFragment>,
    {
        let sizes: Vec<f64> = fragments
            .into_iter()
            .filter(|f| !is_noise(&f.text))
            .map(|f| f.font_size as f64)
            .collect();
        Self::from_sizes(&sizes)
    }

    /// Compute the profile over raw font sizes.
    pub fn from_sizes(sizes: &[f64]) -> Option<Self> {
        if sizes.is_empty() {
            return None;
        }
        let n = sizes.len() as f64;
        let max_font = sizes.iter().copied().fold(f64::MIN, f64::max);
        let mean_font = sizes.iter().sum::<f64>() / n;
        let variance = sizes.iter().map(|s| (s - mean_font).powi(2)).sum::<f64>() / n;

        Some(Self {
            max_font,
            mean_font,
            std_font: variance.sqrt(),
            samples: sizes.len(),
        })
    }

    /// `size / max_font`.
    pub fn relative_to_max(&self, size: f64) -> f64 {
        if self.max_font > 0.0 {
            size / self.max_font
        } else {
            0.0
        }
    }

    /// `size / mean_font`.
    pub fn relative_to_mean(&self, size: f64) -> f64 {
        if self.mean_font > 0.0 {
            size / self.mean_font
        } else {
            0.0
        }
    }

    /// Z-score of `size`; 0 when every fragment has the same size.
    pub fn above_std(&self, size: f64) -> f64 {
        if self.std_font > f64::EPSILON {
            (size - self.mean_font) / self.std_font
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;

    fn frag(text: &str, size: f32) -> TextFragment {
        TextFragment::new(text, size, "Helvetica", BBox::default(), 1).unwrap()
    }

    #[test]
    fn test_profile_statistics() {
        let profile = DocumentFontProfile::from_sizes(&[10.0, 12.0, 14.0]).unwrap();
        assert_eq!(profile.max_font, 14.0);
        assert!((profile.mean_font - 12.0).abs() < 1e-9);
        assert!((profile.std_font - (8.0f64 / 3.0).sqrt()).abs() < 1e-9);
        assert!((profile.relative_to_max(7.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_profile_excludes_noise() {
        let frags = vec![
            frag("Introduction", 12.0),
            frag("Page 3", 40.0),
            frag("Body paragraph", 12.0),
        ];
        let profile = DocumentFontProfile::from_fragments(&frags).unwrap();
        assert_eq!(profile.max_font, 12.0);
        assert_eq!(profile.samples, 2);
    }

    #[test]
    fn test_uniform_sizes_zero_std() {
        let profile = DocumentFontProfile::from_sizes(&[11.0, 11.0, 11.0]).unwrap();
        assert_eq!(profile.std_font, 0.0);
        assert_eq!(profile.above_std(11.0), 0.0);
        assert_eq!(profile.above_std(20.0), 0.0);
    }

    #[test]
    fn test_empty_profile() {
        assert!(DocumentFontProfile::from_sizes(&[]).is_none());
        let noise_only = vec![frag("12", 12.0)];
        assert!(DocumentFontProfile::from_fragments(&noise_only).is_none());
    }
}
