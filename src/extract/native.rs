//! Text-native extraction: flatten engine spans into fragments.

use unicode_normalization::UnicodeNormalization;

use super::{assign_line_spacing, ExtractedDocument, ExtractionSource, PageSource};
use crate::error::Result;
use crate::model::{AlignmentRule, TextFragment};

/// Flattens the spans of a [`PageSource`] into [`TextFragment`]s.
#[derive(Debug, Clone)]
pub struct NativeExtractor {
    alignment: AlignmentRule,
    max_pages: u32,
}

impl NativeExtractor {
    /// Create an extractor reading at most `max_pages` pages.
    pub fn new(alignment: AlignmentRule, max_pages: u32) -> Self {
        Self {
            alignment,
            max_pages,
        }
    }

    /// Extract fragments from every page up to the page cap.
    pub fn extract(&self, source: &dyn PageSource, pdf_name: &str) -> Result<ExtractedDocument> {
        let page_count = source.page_count().min(self.max_pages);
        let mut fragments = Vec::new();

        for page in 1..=page_count {
            let (page_width, _) = source.page_size(page)?;
            let spans = source.page_spans(page)?;
            let before = fragments.len();

            for span in spans {
                let text: String = span.text.nfkc().collect();
                let Some(fragment) =
                    TextFragment::new(&text, span.font_size, span.font_name, span.bbox, page)
                else {
                    continue;
                };
                let alignment = self.alignment.classify(&fragment.bbox, page_width);
                fragments.push(fragment.with_alignment(alignment));
            }

            log::debug!(
                "page {}: {} native fragments",
                page,
                fragments.len() - before
            );
        }

        assign_line_spacing(&mut fragments);

        Ok(ExtractedDocument::new(
            pdf_name,
            ExtractionSource::Native,
            page_count,
            fragments,
        ))
    }
}

impl Default for NativeExtractor {
    fn default() -> Self {
        Self::new(AlignmentRule::default(), 50)
    }
}
