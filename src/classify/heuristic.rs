//! Font-rank heading classifier.

use std::collections::{HashMap, HashSet};

use super::{ClassifyContext, HeadingClassifier, LabeledFragment};
use crate::analysis::{is_noise, is_valid_heading};
use crate::error::Result;
use crate::model::{size_from_key, HeadingLevel, TextFragment};

/// Font size ranking of one document.
///
/// Sizes are compared on a 0.1pt grid (see [`crate::model::size_key`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontRanking {
    /// Most frequent size; ties go to the size seen first
    pub body_size: f32,
    /// Heading-candidate sizes, largest first (at most four)
    pub heading_sizes: Vec<f32>,
    /// Size key → occurrences
    pub size_histogram: HashMap<i32, usize>,
    heading_keys: Vec<i32>,
}

impl FontRanking {
    /// Rank the sizes of the given fragments.
    pub fn from_fragments<'a, I>(fragments: I, max_levels: usize) -> Self
    where
        I: IntoIterator<Item = &'a TextFragment>,
    {
        let mut size_histogram: HashMap<i32, usize> = HashMap::new();
        let mut encounter: Vec<i32> = Vec::new();
        for fragment in fragments {
            let key = fragment.size_key();
            let count = size_histogram.entry(key).or_insert(0);
            if *count == 0 {
                encounter.push(key);
            }
            *count += 1;
        }

        let Some(body_key) = encounter
            .iter()
            .copied()
            .fold(None, |best: Option<(i32, usize)>, key| {
                let count = size_histogram[&key];
                match best {
                    Some((_, c)) if c >= count => best,
                    _ => Some((key, count)),
                }
            })
            .map(|(key, _)| key)
        else {
            return Self::default();
        };

        let mut distinct = encounter;
        distinct.sort_unstable_by(|a, b| b.cmp(a));

        let mut heading_keys: Vec<i32> = distinct
            .iter()
            .copied()
            .filter(|k| *k > body_key)
            .take(max_levels)
            .collect();
        if heading_keys.is_empty() {
            log::debug!("no size above body text, ranking the largest sizes overall");
            heading_keys = distinct.into_iter().take(max_levels).collect();
        }

        Self {
            body_size: size_from_key(body_key),
            heading_sizes: heading_keys.iter().map(|k| size_from_key(*k)).collect(),
            size_histogram,
            heading_keys,
        }
    }

    /// Level of a font size, if it is a heading-candidate size.
    pub fn level_for(&self, fragment: &TextFragment) -> Option<HeadingLevel> {
        let key = fragment.size_key();
        self.heading_keys
            .iter()
            .position(|k| *k == key)
            .and_then(HeadingLevel::from_rank)
    }
}

/// Assigns H1..H4 by descending rank of the sizes larger than body text.
#[derive(Debug, Clone)]
pub struct FontRankClassifier {
    /// Number of heading levels to assign
    pub max_levels: usize,
}

impl Default for FontRankClassifier {
    fn default() -> Self {
        Self {
            max_levels: HeadingLevel::RANKED.len(),
        }
    }
}

impl FontRankClassifier {
    /// Create a classifier with the default four levels.
    pub fn new() -> Self {
        Self::default()
    }
}

impl HeadingClassifier for FontRankClassifier {
    fn classify<'a>(
        &self,
        fragments: &'a [TextFragment],
        context: &ClassifyContext<'_>,
    ) -> Result<Vec<LabeledFragment<'a>>> {
        let content: Vec<&TextFragment> = fragments.iter().filter(|f| !is_noise(&f.text)).collect();
        let ranking = FontRanking::from_fragments(
            content.iter().copied(),
            self.max_levels.min(HeadingLevel::RANKED.len()),
        );
        log::debug!(
            "body size {}, heading sizes {:?}",
            ranking.body_size,
            ranking.heading_sizes
        );

        let mut seen: HashSet<&str> = HashSet::new();
        let labeled = content
            .into_iter()
            .filter(|f| !context.is_title(&f.text))
            .filter_map(|f| ranking.level_for(f).map(|level| (f, level)))
            .filter(|(f, _)| is_valid_heading(&f.text))
            .filter(|(f, _)| seen.insert(f.text.as_str()))
            .map(|(fragment, level)| LabeledFragment { fragment, level })
            .collect();

        Ok(labeled)
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;

    fn frag(text: &str, size: f32, page: u32) -> TextFragment {
        TextFragment::new(text, size, "Times", BBox::new(72.0, 100.0, 300.0, 100.0 + size), page)
            .unwrap()
    }

    fn levels(labeled: &[LabeledFragment<'_>]) -> Vec<(String, HeadingLevel)> {
        labeled
            .iter()
            .map(|l| (l.fragment.text.clone(), l.level))
            .collect()
    }

    #[test]
    fn test_font_ranking_body_and_headings() {
        let frags = vec![
            frag("Title Text", 24.0, 1),
            frag("Body one", 12.0, 1),
            frag("Body two", 12.0, 1),
            frag("Section", 18.0, 1),
            frag("Small print", 9.0, 1),
        ];
        let ranking = FontRanking::from_fragments(&frags, 4);
        assert_eq!(ranking.body_size, 12.0);
        assert_eq!(ranking.heading_sizes, vec![24.0, 18.0]);
        assert_eq!(ranking.level_for(&frags[3]), Some(HeadingLevel::H2));
        assert_eq!(ranking.level_for(&frags[4]), None);
    }

    #[test]
    fn test_body_tie_goes_to_first_seen() {
        let frags = vec![
            frag("Alpha text", 14.0, 1),
            frag("Beta text", 11.0, 1),
            frag("Gamma text", 11.0, 1),
            frag("Delta text", 14.0, 1),
        ];
        let ranking = FontRanking::from_fragments(&frags, 4);
        assert_eq!(ranking.body_size, 14.0);
    }

    #[test]
    fn test_caps_at_four_levels() {
        let frags: Vec<TextFragment> = [30.0, 26.0, 22.0, 18.0, 16.0, 12.0, 12.0, 12.0]
            .iter()
            .enumerate()
            .map(|(i, s)| frag(&format!("Heading {}", i), *s, 1))
            .collect();
        let labeled = FontRankClassifier::new()
            .classify(&frags, &ClassifyContext::new("", None))
            .unwrap();
        assert_eq!(labeled.len(), 4);
        assert_eq!(labeled[0].level, HeadingLevel::H1);
        assert_eq!(labeled[3].level, HeadingLevel::H4);
        assert!(labeled.iter().all(|l| l.fragment.font_size >= 18.0));
    }

    #[test]
    fn test_excludes_title_and_duplicates() {
        let frags = vec![
            frag("Project Report", 24.0, 1),
            frag("Introduction", 18.0, 1),
            frag("Body text here.", 12.0, 1),
            frag("Body text here.", 12.0, 2),
            frag("Introduction", 18.0, 2),
            frag("Methods", 18.0, 2),
        ];
        let labeled = FontRankClassifier::new()
            .classify(&frags, &ClassifyContext::new("Project Report", None))
            .unwrap();
        assert_eq!(
            levels(&labeled),
            vec![
                ("Introduction".to_string(), HeadingLevel::H2),
                ("Methods".to_string(), HeadingLevel::H2),
            ]
        );
        assert_eq!(labeled[1].fragment.page_number, 2);
    }

    #[test]
    fn test_uniform_font_falls_back() {
        let frags = vec![
            frag("First line", 11.0, 1),
            frag("Second line", 11.0, 1),
            frag("42", 11.0, 1),
        ];
        let labeled = FontRankClassifier::new()
            .classify(&frags, &ClassifyContext::new("", None))
            .unwrap();
        assert_eq!(labeled.len(), 2);
        assert!(labeled.iter().all(|l| l.level == HeadingLevel::H1));
    }

    #[test]
    fn test_empty_document() {
        let labeled = FontRankClassifier::new()
            .classify(&[], &ClassifyContext::new("", None))
            .unwrap();
        assert!(labeled.is_empty());
        assert_eq!(FontRanking::from_fragments(&[], 4), FontRanking::default());
    }
}
