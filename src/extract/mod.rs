//! Fragment extraction.
//!
//! Two extractors produce the same [`TextFragment`] schema: the text-native
//! extractor walks the page-text engine's spans ([`PageSource`]), the OCR
//! extractor flattens recognised tokens ([`OcrEngine`]). [`DocumentRouter`]
//! decides which one a document needs.

mod lopdf_source;
mod native;
mod ocr;
mod router;

pub use lopdf_source::LopdfSource;
pub use native::NativeExtractor;
pub use ocr::{OcrEngine, OcrExtractor, OcrOptions, OcrPage, OcrToken};
pub use router::{DocumentRouter, RouteReport, RouterConfig};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::model::{BBox, TextFragment};
use crate::storage::write_atomic;

/// A span as reported by the page-text engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSpan {
    pub text: String,
    pub font_name: String,
    pub font_size: f32,
    /// Box in top-down page coordinates
    pub bbox: BBox,
}

/// Page-level access to a text-bearing document.
///
/// Implementations wrap a concrete page-text engine; pages are 1-based.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Page (width, height) in points.
    fn page_size(&self, page: u32) -> Result<(f32, f32)>;

    /// Text spans on a page, in content order.
    fn page_spans(&self, page: u32) -> Result<Vec<RawSpan>>;

    /// Length in characters of the extractable text on a page.
    fn page_text_len(&self, page: u32) -> Result<usize> {
        let spans = self.page_spans(page)?;
        let text: String = spans.iter().map(|s| s.text.as_str()).collect();
        Ok(text.trim().chars().count())
    }
}

/// Which extractor produced a set of fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionSource {
    /// Text-native extraction from embedded fonts
    #[default]
    Native,
    /// Optical character recognition on rendered pages
    Ocr,
}

/// Fragments extracted from one document.
///
/// This is also the intermediate extraction artifact written by
/// `pdfoutline extract`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Document identity (file name) used to key feature tables
    pub pdf_name: String,
    pub source: ExtractionSource,
    /// Number of pages read
    pub page_count: u32,
    pub text_blocks: Vec<TextFragment>,
}

impl ExtractedDocument {
    /// Create a document from fragments.
    pub fn new(
        pdf_name: impl Into<String>,
        source: ExtractionSource,
        page_count: u32,
        text_blocks: Vec<TextFragment>,
    ) -> Self {
        Self {
            pdf_name: pdf_name.into(),
            source,
            page_count,
            text_blocks,
        }
    }

    /// Check if nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.text_blocks.is_empty()
    }

    /// Load an extraction artifact from JSON.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Write this extraction artifact as pretty JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        write_atomic(path.as_ref(), data.as_bytes())
    }
}

/// Fill `line_spacing_before`/`after` from vertical neighbours on the same page.
///
/// Fragments must be in encounter order. The first fragment on a page has no
/// spacing before and the last has none after.
pub fn assign_line_spacing(fragments: &mut [TextFragment]) {
    for i in 0..fragments.len() {
        let before = match i.checked_sub(1).map(|p| &fragments[p]) {
            Some(prev) if prev.page_number == fragments[i].page_number => {
                Some(round2(fragments[i].bbox.y0 - prev.bbox.y1))
            }
            _ => None,
        };
        let after = match fragments.get(i + 1) {
            Some(next) if next.page_number == fragments[i].page_number => {
                Some(round2(next.bbox.y0 - fragments[i].bbox.y1))
            }
            _ => None,
        };
        fragments[i].line_spacing_before = before;
        fragments[i].line_spacing_after = after;
    }
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(text: &str, page: u32, y0: f32, y1: f32) -> TextFragment {
        TextFragment::new(text, 12.0, "Helvetica", BBox::new(72.0, y0, 200.0, y1), page).unwrap()
    }

    #[test]
    fn test_line_spacing_respects_page_boundaries() {
        let mut frags = vec![
            frag("First", 1, 100.0, 112.0),
            frag("Second", 1, 120.0, 132.0),
            frag("Third", 2, 50.0, 62.0),
        ];
        assign_line_spacing(&mut frags);

        assert_eq!(frags[0].line_spacing_before, None);
        assert_eq!(frags[0].line_spacing_after, Some(8.0));
        assert_eq!(frags[1].line_spacing_before, Some(8.0));
        assert_eq!(frags[1].line_spacing_after, None);
        assert_eq!(frags[2].line_spacing_before, None);
        assert_eq!(frags[2].line_spacing_after, None);
    }

    #[test]
    fn test_extracted_document_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let doc = ExtractedDocument::new(
            "doc.pdf",
            ExtractionSource::Ocr,
            1,
            vec![frag("Heading", 1, 10.0, 20.0)],
        );
        doc.save_json(&path).unwrap();

        let loaded = ExtractedDocument::load_json(&path).unwrap();
        assert_eq!(loaded, doc);
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"source\": \"ocr\""));
    }
}
