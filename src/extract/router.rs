//! Text-bearing vs. image-only routing.

use super::{ExtractionSource, PageSource};
use crate::error::{Error, Result};

/// Sampling parameters for [`DocumentRouter`].
#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    /// Number of leading pages to sample
    pub sample_pages: u32,
    /// Pages with fewer extractable characters count as empty
    pub min_text_chars: usize,
    /// Route to OCR when `empty_pages / sampled_pages` reaches this ratio
    pub empty_ratio_threshold: f32,
}

impl RouterConfig {
    /// Create a router config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of sampled pages.
    pub fn with_sample_pages(mut self, pages: u32) -> Self {
        self.sample_pages = pages;
        self
    }

    /// Set the empty-ratio threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.empty_ratio_threshold = threshold;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            sample_pages: 3,
            min_text_chars: 10,
            empty_ratio_threshold: 0.9,
        }
    }
}

/// Outcome of sampling a document.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteReport {
    pub sampled_pages: u32,
    pub empty_pages: u32,
    pub empty_ratio: f32,
    pub decision: ExtractionSource,
}

/// Decides whether a document needs the native or the OCR extractor.
#[derive(Debug, Clone, Default)]
pub struct DocumentRouter {
    config: RouterConfig,
}

impl DocumentRouter {
    /// Create a router.
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    /// Sample the leading pages and pick an extractor.
    pub fn route(&self, source: &dyn PageSource) -> Result<RouteReport> {
        let sampled_pages = source.page_count().min(self.config.sample_pages);
        if sampled_pages == 0 {
            return Err(Error::EmptyDocument("document has no pages".to_string()));
        }

        let mut empty_pages = 0;
        for page in 1..=sampled_pages {
            let chars = source.page_text_len(page)?;
            if chars < self.config.min_text_chars {
                empty_pages += 1;
            }
        }

        let empty_ratio = empty_pages as f32 / sampled_pages as f32;
        let decision = if empty_ratio >= self.config.empty_ratio_threshold {
            ExtractionSource::Ocr
        } else {
            ExtractionSource::Native
        };

        log::info!(
            "routing: {}/{} sampled pages empty (ratio {:.2}) -> {:?}",
            empty_pages,
            sampled_pages,
            empty_ratio,
            decision
        );

        Ok(RouteReport {
            sampled_pages,
            empty_pages,
            empty_ratio,
            decision,
        })
    }
}
