//! Title selection from first-page fragments.

use super::noise::{is_noise, is_valid_heading};
use crate::model::TextFragment;

/// Picks the document title: the largest, topmost plausible first-page text.
#[derive(Debug, Clone)]
pub struct TitleSelector {
    /// How many of the top-ranked fragments to consider
    pub max_candidates: usize,
    /// Exclusive lower bound on title length
    pub min_len: usize,
    /// Exclusive upper bound on title length
    pub max_len: usize,
}

impl Default for TitleSelector {
    fn default() -> Self {
        Self {
            max_candidates: 5,
            min_len: 10,
            max_len: 200,
        }
    }
}

impl TitleSelector {
    /// Select the title, or an empty string when no candidate qualifies.
    pub fn select(&self, fragments: &[TextFragment]) -> String {
        let mut candidates: Vec<&TextFragment> = fragments
            .iter()
            .filter(|f| f.page_number == 1 && !is_noise(&f.text))
            .collect();

        candidates.sort_by(|a, b| {
            b.font_size
                .total_cmp(&a.font_size)
                .then(a.bbox.y0.total_cmp(&b.bbox.y0))
        });

        candidates
            .into_iter()
            .take(self.max_candidates)
            .map(|f| f.text.trim())
            .find(|text| {
                let len = text.chars().count();
                len > self.min_len && len < self.max_len && is_valid_heading(text)
            })
            .map(str::to_string)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;

    fn frag(text: &str, size: f32, y0: f32, page: u32) -> TextFragment {
        TextFragment::new(text, size, "Helvetica", BBox::new(72.0, y0, 400.0, y0 + size), page)
            .unwrap()
    }

    #[test]
    fn test_selects_largest_topmost() {
        let frags = vec![
            frag("Subtitle of the work", 18.0, 120.0, 1),
            frag("Annual Project Report", 24.0, 80.0, 1),
            frag("Second Large Line", 24.0, 100.0, 1),
        ];
        assert_eq!(TitleSelector::default().select(&frags), "Annual Project Report");
    }

    #[test]
    fn test_skips_short_and_noise_candidates() {
        let frags = vec![
            frag("ACME", 30.0, 20.0, 1),
            frag("Author: Jane Roe", 26.0, 40.0, 1),
            frag("Quarterly Summary", 20.0, 60.0, 1),
        ];
        assert_eq!(TitleSelector::default().select(&frags), "Quarterly Summary");
    }

    #[test]
    fn test_ignores_later_pages() {
        let frags = vec![
            frag("Short", 12.0, 50.0, 1),
            frag("A Heading On Page Two", 30.0, 50.0, 2),
        ];
        assert_eq!(TitleSelector::default().select(&frags), "");
    }

    #[test]
    fn test_scans_at_most_five_candidates() {
        let mut frags: Vec<TextFragment> = (0..5)
            .map(|i| frag("Tiny", 30.0 - i as f32, 10.0 * i as f32, 1))
            .collect();
        frags.push(frag("A Perfectly Good Title", 10.0, 300.0, 1));
        assert_eq!(TitleSelector::default().select(&frags), "");
    }
}
