//! Positioned text fragments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Axis-aligned bounding box in top-down page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    /// Create a bounding box from its corners.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Width of the box.
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Height of the box.
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// Horizontal placement class of a fragment.
///
/// Variants are declared in their canonical (alphabetical) order; the first
/// one is the reference category of the one-hot encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Center,
    Indented,
    #[default]
    Left,
}

impl Alignment {
    /// All categories in canonical order.
    pub const ALL: [Alignment; 3] = [Alignment::Center, Alignment::Indented, Alignment::Left];

    /// The category implied when no one-hot column is set.
    pub const REFERENCE: Alignment = Alignment::Center;

    /// Lowercase category name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Center => "center",
            Alignment::Indented => "indented",
            Alignment::Left => "left",
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Alignment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "center" => Ok(Alignment::Center),
            "indented" => Ok(Alignment::Indented),
            // Tables written before alignment was recorded leave it blank
            "left" | "" => Ok(Alignment::Left),
            other => Err(Error::Schema(format!("unknown alignment '{}'", other))),
        }
    }
}

/// Thresholds for deriving [`Alignment`] from a fragment's geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentRule {
    /// Left edge beyond which a fragment counts as indented
    pub indent_threshold: f32,
    /// Max difference between fragment and page width for centered text
    pub center_tolerance: f32,
}

impl Default for AlignmentRule {
    fn default() -> Self {
        Self {
            indent_threshold: 100.0,
            center_tolerance: 50.0,
        }
    }
}

impl AlignmentRule {
    /// Classify a fragment box on a page of the given width.
    pub fn classify(&self, bbox: &BBox, page_width: f32) -> Alignment {
        if (bbox.width() - page_width).abs() < self.center_tolerance {
            Alignment::Center
        } else if bbox.x0 > self.indent_threshold {
            Alignment::Indented
        } else {
            Alignment::Left
        }
    }
}

/// One visually atomic run of text on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    /// Trimmed text content
    pub text: String,
    /// Font size in points (bbox height for OCR fragments)
    pub font_size: f32,
    /// Font name (e.g., "Helvetica-Bold", or "OCR")
    pub font_name: String,
    /// Position on the page
    pub bbox: BBox,
    /// 1-based page number
    pub page_number: u32,
    pub is_bold: bool,
    pub is_italic: bool,
    pub alignment: Alignment,
    /// Gap to the previous fragment on the same page
    pub line_spacing_before: Option<f32>,
    /// Gap to the next fragment on the same page
    pub line_spacing_after: Option<f32>,
}

impl TextFragment {
    /// Create a fragment, deriving emphasis flags from the font name.
    ///
    /// Returns `None` when the invariants cannot hold: empty text after
    /// trimming, a non-positive font size, or page number zero.
    pub fn new(
        text: impl AsRef<str>,
        font_size: f32,
        font_name: impl Into<String>,
        bbox: BBox,
        page_number: u32,
    ) -> Option<Self> {
        let text = text.as_ref().trim();
        if text.is_empty() || !(font_size > 0.0) || page_number == 0 {
            return None;
        }
        let font_name = font_name.into();
        let (is_bold, is_italic) = emphasis_from_font_name(&font_name);

        Some(Self {
            text: text.to_string(),
            font_size,
            font_name,
            bbox,
            page_number,
            is_bold,
            is_italic,
            alignment: Alignment::Left,
            line_spacing_before: None,
            line_spacing_after: None,
        })
    }

    /// Set the alignment class.
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Font size quantized to 0.1pt, used wherever sizes are compared for equality.
    pub fn size_key(&self) -> i32 {
        size_key(self.font_size)
    }
}

/// Quantize a font size to 0.1pt.
pub fn size_key(size: f32) -> i32 {
    (size * 10.0).round() as i32
}

/// Inverse of [`size_key`].
pub fn size_from_key(key: i32) -> f32 {
    key as f32 / 10.0
}

/// Derive (bold, italic) flags from a font name by substring match.
pub fn emphasis_from_font_name(font_name: &str) -> (bool, bool) {
    let lower = font_name.to_lowercase();
    let is_bold = lower.contains("bold");
    let is_italic = lower.contains("italic") || lower.contains("oblique");
    (is_bold, is_italic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_emphasis_detection() {
        let frag = TextFragment::new("Test", 12.0, "Helvetica-Bold", BBox::default(), 1).unwrap();
        assert!(frag.is_bold);
        assert!(!frag.is_italic);

        let frag =
            TextFragment::new("Test", 12.0, "Times-BoldOblique", BBox::default(), 1).unwrap();
        assert!(frag.is_bold);
        assert!(frag.is_italic);
    }

    #[test]
    fn test_fragment_invariants() {
        assert!(TextFragment::new("   ", 12.0, "F", BBox::default(), 1).is_none());
        assert!(TextFragment::new("Text", 0.0, "F", BBox::default(), 1).is_none());
        assert!(TextFragment::new("Text", 12.0, "F", BBox::default(), 0).is_none());

        let frag = TextFragment::new("  Padded  ", 12.0, "F", BBox::default(), 2).unwrap();
        assert_eq!(frag.text, "Padded");
    }

    #[test]
    fn test_alignment_rule() {
        let rule = AlignmentRule::default();
        assert_eq!(
            rule.classify(&BBox::new(72.0, 0.0, 300.0, 10.0), 612.0),
            Alignment::Left
        );
        assert_eq!(
            rule.classify(&BBox::new(144.0, 0.0, 300.0, 10.0), 612.0),
            Alignment::Indented
        );
        assert_eq!(
            rule.classify(&BBox::new(10.0, 0.0, 600.0, 10.0), 612.0),
            Alignment::Center
        );
    }

    #[test]
    fn test_alignment_parse() {
        assert_eq!("Center".parse::<Alignment>().unwrap(), Alignment::Center);
        assert_eq!("".parse::<Alignment>().unwrap(), Alignment::Left);
        assert!("justified".parse::<Alignment>().is_err());
        assert!(Alignment::REFERENCE < Alignment::Indented);
    }

    #[test]
    fn test_size_key_rounding() {
        assert_eq!(size_key(11.99), 120);
        assert_eq!(size_key(12.04), 120);
        assert!((size_from_key(185) - 18.5).abs() < f32::EPSILON);
    }
}
