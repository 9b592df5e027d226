//! Outline output types.
//!
//! [`OutlineDocument`] is the externally consumed artifact:
//! `{title, outline: [{text, level, page}], metadata: {total_pages, total_headings, font_sizes_found}}`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Heading level assigned to a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
    H4,
    /// Not a heading
    None,
}

impl HeadingLevel {
    /// Heading levels in font-rank order (largest size first).
    pub const RANKED: [HeadingLevel; 4] = [
        HeadingLevel::H1,
        HeadingLevel::H2,
        HeadingLevel::H3,
        HeadingLevel::H4,
    ];

    /// Level for the given font-rank index (0 = largest), if any.
    pub fn from_rank(rank: usize) -> Option<Self> {
        Self::RANKED.get(rank).copied()
    }

    /// Label string as stored in label tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            HeadingLevel::H1 => "H1",
            HeadingLevel::H2 => "H2",
            HeadingLevel::H3 => "H3",
            HeadingLevel::H4 => "H4",
            HeadingLevel::None => "None",
        }
    }

    /// Whether this level represents a heading.
    pub fn is_heading(&self) -> bool {
        *self != HeadingLevel::None
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeadingLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "H1" | "h1" => Ok(HeadingLevel::H1),
            "H2" | "h2" => Ok(HeadingLevel::H2),
            "H3" | "h3" => Ok(HeadingLevel::H3),
            "H4" | "h4" => Ok(HeadingLevel::H4),
            "None" | "none" => Ok(HeadingLevel::None),
            other => Err(Error::InvalidLabel(other.to_string())),
        }
    }
}

/// One outline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub text: String,
    pub level: HeadingLevel,
    pub page: u32,
}

impl OutlineEntry {
    /// Create a new entry.
    pub fn new(text: impl Into<String>, level: HeadingLevel, page: u32) -> Self {
        Self {
            text: text.into(),
            level,
            page,
        }
    }
}

/// Summary counts reported alongside the outline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineMetadata {
    /// Page count, capped by the configured page limit
    pub total_pages: u32,
    pub total_headings: usize,
    /// Number of distinct font sizes among extracted fragments
    pub font_sizes_found: usize,
}

/// Title plus ordered, deduplicated headings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlineDocument {
    /// Detected title; empty when none was found
    pub title: String,
    pub outline: Vec<OutlineEntry>,
    pub metadata: OutlineMetadata,
}

impl OutlineDocument {
    /// Whether a title was found.
    pub fn has_title(&self) -> bool {
        !self.title.is_empty()
    }

    /// Headings at the given level.
    pub fn headings_at(&self, level: HeadingLevel) -> impl Iterator<Item = &OutlineEntry> {
        self.outline.iter().filter(move |e| e.level == level)
    }
}
