//! Delimited feature, label, and corpus tables.
//!
//! Rows are keyed by `(file_name, page_number, text)` so tables from the
//! extraction and correction stages can be joined.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::extract::ExtractedDocument;
use crate::model::{Alignment, BBox, HeadingLevel, OutlineDocument, TextFragment};
use crate::storage::write_atomic;

/// Join key shared by every table.
pub type RowKey = (String, u32, String);

/// One extracted fragment in flat form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub file_name: String,
    pub page_number: u32,
    pub text: String,
    pub font_size: f32,
    pub font_name: String,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    #[serde(deserialize_with = "flexible_bool")]
    pub is_bold: bool,
    #[serde(deserialize_with = "flexible_bool")]
    pub is_italic: bool,
    #[serde(deserialize_with = "alignment_field")]
    pub alignment: Alignment,
    pub line_spacing_before: Option<f32>,
    pub line_spacing_after: Option<f32>,
}

impl FeatureRecord {
    /// Flatten a fragment of the named document.
    pub fn from_fragment(file_name: &str, fragment: &TextFragment) -> Self {
        Self {
            file_name: file_name.to_string(),
            page_number: fragment.page_number,
            text: fragment.text.clone(),
            font_size: fragment.font_size,
            font_name: fragment.font_name.clone(),
            x0: fragment.bbox.x0,
            y0: fragment.bbox.y0,
            x1: fragment.bbox.x1,
            y1: fragment.bbox.y1,
            is_bold: fragment.is_bold,
            is_italic: fragment.is_italic,
            alignment: fragment.alignment,
            line_spacing_before: fragment.line_spacing_before,
            line_spacing_after: fragment.line_spacing_after,
        }
    }

    /// Rebuild the fragment, keeping the recorded emphasis flags.
    ///
    /// Returns `None` for rows that violate fragment invariants.
    pub fn to_fragment(&self) -> Option<TextFragment> {
        let bbox = BBox::new(self.x0, self.y0, self.x1, self.y1);
        let mut fragment = TextFragment::new(
            &self.text,
            self.font_size,
            self.font_name.clone(),
            bbox,
            self.page_number,
        )?
        .with_alignment(self.alignment);
        fragment.is_bold = self.is_bold;
        fragment.is_italic = self.is_italic;
        fragment.line_spacing_before = self.line_spacing_before;
        fragment.line_spacing_after = self.line_spacing_after;
        Some(fragment)
    }

    /// Join key of this row.
    pub fn key(&self) -> RowKey {
        (self.file_name.clone(), self.page_number, self.text.clone())
    }
}

/// A corrected heading level for one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub file_name: String,
    pub page_number: u32,
    pub text: String,
    #[serde(deserialize_with = "level_field")]
    pub level: HeadingLevel,
}

impl LabelRecord {
    /// Join key of this row.
    pub fn key(&self) -> RowKey {
        (self.file_name.clone(), self.page_number, self.text.clone())
    }
}

/// A feature row with its confirmed level; the unit of the training corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub file_name: String,
    pub page_number: u32,
    pub text: String,
    pub font_size: f32,
    pub font_name: String,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    #[serde(deserialize_with = "flexible_bool")]
    pub is_bold: bool,
    #[serde(deserialize_with = "flexible_bool")]
    pub is_italic: bool,
    #[serde(deserialize_with = "alignment_field")]
    pub alignment: Alignment,
    pub line_spacing_before: Option<f32>,
    pub line_spacing_after: Option<f32>,
    #[serde(deserialize_with = "level_field")]
    pub level: HeadingLevel,
}

impl CorpusRecord {
    /// Attach a level to a feature row.
    pub fn new(features: FeatureRecord, level: HeadingLevel) -> Self {
        Self {
            file_name: features.file_name,
            page_number: features.page_number,
            text: features.text,
            font_size: features.font_size,
            font_name: features.font_name,
            x0: features.x0,
            y0: features.y0,
            x1: features.x1,
            y1: features.y1,
            is_bold: features.is_bold,
            is_italic: features.is_italic,
            alignment: features.alignment,
            line_spacing_before: features.line_spacing_before,
            line_spacing_after: features.line_spacing_after,
            level,
        }
    }

    /// The feature part of the row.
    pub fn features(&self) -> FeatureRecord {
        FeatureRecord {
            file_name: self.file_name.clone(),
            page_number: self.page_number,
            text: self.text.clone(),
            font_size: self.font_size,
            font_name: self.font_name.clone(),
            x0: self.x0,
            y0: self.y0,
            x1: self.x1,
            y1: self.y1,
            is_bold: self.is_bold,
            is_italic: self.is_italic,
            alignment: self.alignment,
            line_spacing_before: self.line_spacing_before,
            line_spacing_after: self.line_spacing_after,
        }
    }
}

/// Feature rows of an extraction artifact, in fragment order.
pub fn feature_records(doc: &ExtractedDocument) -> Vec<FeatureRecord> {
    doc.text_blocks
        .iter()
        .map(|f| FeatureRecord::from_fragment(&doc.pdf_name, f))
        .collect()
}

/// Label rows for every fragment of `doc`, pre-filled from an outline.
///
/// Fragments whose `(page, text)` appears in the outline get that level;
/// all others (the title included) are labelled `None`. Analysts then
/// correct the table by hand.
pub fn label_records(doc: &ExtractedDocument, outline: &OutlineDocument) -> Vec<LabelRecord> {
    let levels: HashMap<(u32, &str), HeadingLevel> = outline
        .outline
        .iter()
        .map(|e| ((e.page, e.text.as_str()), e.level))
        .collect();

    doc.text_blocks
        .iter()
        .map(|f| LabelRecord {
            file_name: doc.pdf_name.clone(),
            page_number: f.page_number,
            text: f.text.clone(),
            level: levels
                .get(&(f.page_number, f.text.as_str()))
                .copied()
                .unwrap_or(HeadingLevel::None),
        })
        .collect()
}

/// Read a headered table from a reader.
pub fn read_table_from<T: DeserializeOwned, R: Read>(reader: R) -> Result<Vec<T>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let mut rows = Vec::new();
    for result in csv_reader.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}

/// Read a headered table from a file.
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)
        .map_err(|e| Error::Table(format!("cannot open {}: {}", path.display(), e)))?;
    read_table_from(file)
}

/// Write rows with a header line.
pub fn write_table_to<T: Serialize, W: Write>(writer: W, rows: &[T]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(true).from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Replace the file at `path` with the given rows.
///
/// An empty row set still produces no header line, so readers must accept
/// empty files.
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut buffer = Vec::new();
    write_table_to(&mut buffer, rows)?;
    write_atomic(path, &buffer)
}

fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid boolean '{}'", other))),
    }
}

fn alignment_field<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Alignment, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

fn level_field<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<HeadingLevel, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}
