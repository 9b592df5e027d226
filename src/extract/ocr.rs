//! OCR extraction: flatten recognised tokens into fragments.
//!
//! OCR fragments carry synthesized metrics: `font_name` is `"OCR"`, emphasis
//! flags are always false and `font_size` is the token box height in pixels.

use std::path::Path;

use super::{assign_line_spacing, ExtractedDocument, ExtractionSource};
use crate::error::Result;
use crate::model::{Alignment, BBox, TextFragment};

/// Font name recorded on every OCR fragment.
pub const OCR_FONT_NAME: &str = "OCR";

/// One recognised token.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrToken {
    pub text: String,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    /// Engine confidence (0-100, negative for non-word rows)
    pub confidence: f32,
}

/// Tokens recognised on one rendered page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OcrPage {
    /// 1-based page number
    pub page_number: u32,
    pub tokens: Vec<OcrToken>,
}

/// Options for the OCR path.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOptions {
    /// Rendering resolution handed to the engine
    pub dpi: u32,
    /// Token left edge beyond which it counts as indented
    pub indent_threshold: f32,
    /// Token width above which it counts as centered
    pub center_min_width: f32,
}

impl OcrOptions {
    /// Create OCR options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set rendering resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            dpi: 300,
            indent_threshold: 100.0,
            center_min_width: 500.0,
        }
    }
}

/// Renders document pages and recognises their text.
pub trait OcrEngine: Send + Sync {
    /// Recognise every page of the document at `path`, up to `max_pages`.
    fn recognize(&self, path: &Path, max_pages: u32, options: &OcrOptions)
        -> Result<Vec<OcrPage>>;
}

/// Flattens OCR pages into [`TextFragment`]s.
#[derive(Debug, Clone, Default)]
pub struct OcrExtractor {
    options: OcrOptions,
}

impl OcrExtractor {
    /// Create an extractor with the given options.
    pub fn new(options: OcrOptions) -> Self {
        Self { options }
    }

    /// Run the engine over a document and flatten its tokens.
    pub fn extract(
        &self,
        engine: &dyn OcrEngine,
        path: &Path,
        pdf_name: &str,
        max_pages: u32,
    ) -> Result<ExtractedDocument> {
        let pages = engine.recognize(path, max_pages, &self.options)?;
        Ok(self.flatten(pages, pdf_name, max_pages))
    }

    /// Flatten already-recognised pages.
    pub fn flatten(&self, pages: Vec<OcrPage>, pdf_name: &str, max_pages: u32) -> ExtractedDocument {
        let mut fragments = Vec::new();
        let mut page_count = 0;

        for page in pages.into_iter().filter(|p| p.page_number <= max_pages) {
            page_count = page_count.max(page.page_number);
            for token in page.tokens {
                let bbox = BBox::new(
                    token.left,
                    token.top,
                    token.left + token.width,
                    token.top + token.height,
                );
                let Some(fragment) =
                    TextFragment::new(&token.text, token.height, OCR_FONT_NAME, bbox, page.page_number)
                else {
                    continue;
                };
                let alignment = self.alignment_for(&token);
                fragments.push(fragment.with_alignment(alignment));
            }
        }

        assign_line_spacing(&mut fragments);
        log::debug!("{}: {} OCR fragments", pdf_name, fragments.len());

        ExtractedDocument::new(pdf_name, ExtractionSource::Ocr, page_count, fragments)
    }

    fn alignment_for(&self, token: &OcrToken) -> Alignment {
        if token.width > self.options.center_min_width {
            Alignment::Center
        } else if token.left > self.options.indent_threshold {
            Alignment::Indented
        } else {
            Alignment::Left
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, left: f32, top: f32, width: f32, height: f32) -> OcrToken {
        OcrToken {
            text: text.to_string(),
            left,
            top,
            width,
            height,
            confidence: 90.0,
        }
    }

    #[test]
    fn test_ocr_flatten_synthesizes_metrics() {
        let pages = vec![OcrPage {
            page_number: 1,
            tokens: vec![
                token("Scanned Heading", 40.0, 100.0, 600.0, 48.0),
                token("", 40.0, 160.0, 10.0, 10.0),
                token("body", 150.0, 170.0, 80.0, 20.0),
            ],
        }];

        let doc = OcrExtractor::default().flatten(pages, "scan.pdf", 50);

        assert_eq!(doc.source, ExtractionSource::Ocr);
        assert_eq!(doc.text_blocks.len(), 2);
        let heading = &doc.text_blocks[0];
        assert_eq!(heading.font_name, OCR_FONT_NAME);
        assert!(!heading.is_bold && !heading.is_italic);
        assert_eq!(heading.font_size, 48.0);
        assert_eq!(heading.alignment, Alignment::Center);
        assert_eq!(doc.text_blocks[1].alignment, Alignment::Indented);
        assert_eq!(doc.text_blocks[1].line_spacing_before, Some(22.0));
    }

    #[test]
    fn test_ocr_page_cap() {
        let pages = (1..=4)
            .map(|n| OcrPage {
                page_number: n,
                tokens: vec![token("words", 10.0, 10.0, 50.0, 12.0)],
            })
            .collect();

        let doc = OcrExtractor::default().flatten(pages, "scan.pdf", 3);
        assert_eq!(doc.page_count, 3);
        assert_eq!(doc.text_blocks.len(), 3);
    }
}
