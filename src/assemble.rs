//! Outline assembly: title plus classified fragments into the final document.

use std::collections::HashSet;

use crate::classify::LabeledFragment;
use crate::model::{OutlineDocument, OutlineEntry, OutlineMetadata, TextFragment};

/// Builds the [`OutlineDocument`] from whichever classifier ran.
#[derive(Debug, Clone)]
pub struct OutlineAssembler {
    /// Cap applied to the reported page count
    pub max_pages: u32,
}

impl Default for OutlineAssembler {
    fn default() -> Self {
        Self { max_pages: 50 }
    }
}

impl OutlineAssembler {
    /// Create an assembler with a page cap.
    pub fn new(max_pages: u32) -> Self {
        Self { max_pages }
    }

    /// Merge the title and labelled fragments.
    ///
    /// The first occurrence of each heading text wins; later duplicates and
    /// entries repeating the title are dropped. `fragments` is the full
    /// extracted set, used only for metadata.
    pub fn assemble(
        &self,
        title: &str,
        labeled: &[LabeledFragment<'_>],
        fragments: &[TextFragment],
        page_count: u32,
    ) -> OutlineDocument {
        let entries = labeled
            .iter()
            .map(|l| OutlineEntry::new(l.fragment.text.clone(), l.level, l.fragment.page_number));
        let outline = dedup_entries(title, entries);

        let font_sizes: HashSet<i32> = fragments.iter().map(TextFragment::size_key).collect();
        let metadata = OutlineMetadata {
            total_pages: page_count.min(self.max_pages),
            total_headings: outline.len(),
            font_sizes_found: font_sizes.len(),
        };

        OutlineDocument {
            title: title.to_string(),
            outline,
            metadata,
        }
    }

    /// Re-run deduplication over an existing outline.
    pub fn reassemble(&self, doc: &OutlineDocument) -> OutlineDocument {
        let outline = dedup_entries(&doc.title, doc.outline.iter().cloned());
        OutlineDocument {
            title: doc.title.clone(),
            metadata: OutlineMetadata {
                total_pages: doc.metadata.total_pages.min(self.max_pages),
                total_headings: outline.len(),
                font_sizes_found: doc.metadata.font_sizes_found,
            },
            outline,
        }
    }
}

fn dedup_entries<I>(title: &str, entries: I) -> Vec<OutlineEntry>
where
    I: IntoIterator<Item = OutlineEntry>,
{
    let mut seen: HashSet<String> = HashSet::new();
    entries
        .into_iter()
        .filter(|e| title.is_empty() || e.text != title)
        .filter(|e| seen.insert(e.text.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, HeadingLevel};

    fn frag(text: &str, size: f32, page: u32) -> TextFragment {
        TextFragment::new(text, size, "Arial", BBox::new(72.0, 100.0, 300.0, 120.0), page).unwrap()
    }

    #[test]
    fn test_assemble_dedup_and_metadata() {
        let frags = vec![
            frag("Report Title Here", 24.0, 1),
            frag("Intro", 18.0, 1),
            frag("Intro", 16.0, 3),
            frag("Body", 12.0, 1),
        ];
        let labeled = vec![
            LabeledFragment { fragment: &frags[0], level: HeadingLevel::H1 },
            LabeledFragment { fragment: &frags[1], level: HeadingLevel::H2 },
            LabeledFragment { fragment: &frags[2], level: HeadingLevel::H3 },
        ];

        let doc = OutlineAssembler::new(2).assemble("Report Title Here", &labeled, &frags, 3);
        assert_eq!(doc.outline, vec![OutlineEntry::new("Intro", HeadingLevel::H2, 1)]);
        assert_eq!(doc.metadata.total_pages, 2);
        assert_eq!(doc.metadata.total_headings, 1);
        assert_eq!(doc.metadata.font_sizes_found, 4);
    }

    #[test]
    fn test_reassemble_is_idempotent() {
        let frags = vec![frag("Alpha", 18.0, 1), frag("Alpha", 18.0, 2), frag("Beta", 14.0, 2)];
        let labeled: Vec<LabeledFragment<'_>> = frags
            .iter()
            .map(|f| LabeledFragment { fragment: f, level: HeadingLevel::H1 })
            .collect();
        let assembler = OutlineAssembler::default();
        let once = assembler.assemble("", &labeled, &frags, 2);
        let twice = assembler.reassemble(&once);
        assert_eq!(once, twice);
        assert_eq!(once.outline.len(), 2);
    }
}
