//! [`PageSource`] backed by lopdf.
//!
//! Walks each page's content stream, tracking the text matrix and current
//! font, and reports one span per text-showing operator.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use lopdf::content::Content;
use lopdf::{Dictionary, Document as LopdfDocument, Encoding, Object, ObjectId};

use super::{PageSource, RawSpan};
use crate::error::{Error, Result};
use crate::model::BBox;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// US Letter, used when a page has no readable MediaBox.
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// TJ adjustment (thousandths of text space) treated as a word gap.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Glyph widths are not resolved; half an em per character approximates them.
const GLYPH_WIDTH_EM: f32 = 0.5;

/// A PDF opened with lopdf.
pub struct LopdfSource {
    doc: LopdfDocument,
    pages: BTreeMap<u32, ObjectId>,
}

impl LopdfSource {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Open a PDF held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if !data.starts_with(PDF_MAGIC) {
            return Err(Error::UnknownFormat);
        }
        let doc = LopdfDocument::load_mem(data)?;
        let pages = doc.get_pages();
        Ok(Self { doc, pages })
    }

    /// Open a PDF from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.pages
            .get(&page)
            .copied()
            .ok_or(Error::PageOutOfRange(page, self.pages.len() as u32))
    }

    fn font_names(fonts: &BTreeMap<Vec<u8>, &Dictionary>) -> HashMap<Vec<u8>, String> {
        fonts
            .iter()
            .map(|(key, font)| {
                let base = font
                    .get(b"BaseFont")
                    .ok()
                    .and_then(|o| o.as_name().ok())
                    .map(|n| String::from_utf8_lossy(n).to_string())
                    .unwrap_or_else(|| String::from_utf8_lossy(key).to_string());
                (key.clone(), base)
            })
            .collect()
    }
}

impl PageSource for LopdfSource {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page: u32) -> Result<(f32, f32)> {
        let page_id = self.page_id(page)?;
        let media_box = self
            .doc
            .get_dictionary(page_id)
            .ok()
            .and_then(|dict| dict.get(b"MediaBox").ok())
            .and_then(|obj| obj.as_array().ok())
            .filter(|arr| arr.len() >= 4)
            .and_then(|arr| {
                let nums: Vec<f32> = arr.iter().take(4).filter_map(number).collect();
                (nums.len() == 4).then(|| (nums[2] - nums[0], nums[3] - nums[1]))
            });
        Ok(media_box.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    fn page_spans(&self, page: u32) -> Result<Vec<RawSpan>> {
        let page_id = self.page_id(page)?;
        let (_, page_height) = self.page_size(page)?;
        let fonts = self.doc.get_page_fonts(page_id)?;
        let names = Self::font_names(&fonts);
        let encodings: HashMap<Vec<u8>, Encoding> = fonts
            .iter()
            .filter_map(|(key, font)| {
                font.get_font_encoding(&self.doc)
                    .ok()
                    .map(|enc| (key.clone(), enc))
            })
            .collect();

        let raw = self.doc.get_page_content(page_id)?;
        let content = Content::decode(&raw)?;

        let mut state = TextState::default();
        let mut spans = Vec::new();

        for op in &content.operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "BT" => state.begin(),
                "ET" => state.in_text = false,
                "Tf" if operands.len() >= 2 => {
                    if let Object::Name(key) = &operands[0] {
                        state.font_key = key.clone();
                    }
                    state.font_size = number(&operands[1]).unwrap_or(12.0);
                }
                "TL" => state.leading = operands.first().and_then(number).unwrap_or(0.0),
                "Td" if operands.len() >= 2 => {
                    state.translate(number(&operands[0]).unwrap_or(0.0), number(&operands[1]).unwrap_or(0.0));
                }
                "TD" if operands.len() >= 2 => {
                    let ty = number(&operands[1]).unwrap_or(0.0);
                    state.leading = -ty;
                    state.translate(number(&operands[0]).unwrap_or(0.0), ty);
                }
                "Tm" if operands.len() >= 6 => {
                    let m: Vec<f32> = operands.iter().take(6).map(|o| number(o).unwrap_or(0.0)).collect();
                    state.set_matrix([m[0], m[1], m[2], m[3], m[4], m[5]]);
                }
                "T*" => state.next_line(),
                "Tj" | "'" | "\"" | "TJ" => {
                    if matches!(op.operator.as_str(), "'" | "\"") {
                        state.next_line();
                    }
                    if !state.in_text {
                        continue;
                    }
                    let encoding = encodings.get(&state.font_key);
                    let (text, advance) = match op.operator.as_str() {
                        "TJ" => match operands.first() {
                            Some(array) => (
                                decode_array(array, encoding),
                                state.array_advance(array, encoding),
                            ),
                            None => continue,
                        },
                        _ => {
                            let index = if op.operator == "\"" { 2 } else { 0 };
                            let text = operands
                                .get(index)
                                .map(|o| decode_string(o, encoding))
                                .unwrap_or_default();
                            let advance = state.text_advance(&text);
                            (text, advance)
                        }
                    };
                    if !text.trim().is_empty() {
                        let font_name = names
                            .get(&state.font_key)
                            .cloned()
                            .unwrap_or_else(|| String::from_utf8_lossy(&state.font_key).to_string());
                        spans.push(state.span(text, font_name, page_height));
                    }
                    state.advance(advance);
                }
                _ => {}
            }
        }

        Ok(spans)
    }
}

/// Text-object state while walking a content stream.
struct TextState {
    in_text: bool,
    font_key: Vec<u8>,
    font_size: f32,
    leading: f32,
    /// Text matrix [a b c d e f]
    matrix: [f32; 6],
    /// Start of the current line
    line_matrix: [f32; 6],
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            in_text: false,
            font_key: Vec::new(),
            font_size: 12.0,
            leading: 0.0,
            matrix: IDENTITY,
            line_matrix: IDENTITY,
        }
    }
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

impl TextState {
    fn begin(&mut self) {
        self.in_text = true;
        self.matrix = IDENTITY;
        self.line_matrix = IDENTITY;
    }

    fn set_matrix(&mut self, m: [f32; 6]) {
        self.matrix = m;
        self.line_matrix = m;
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        let [a, b, c, d, e, f] = self.line_matrix;
        self.line_matrix = [a, b, c, d, e + tx * a + ty * c, f + tx * b + ty * d];
        self.matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = if self.leading > 0.0 { self.leading } else { self.font_size * 1.2 };
        self.translate(0.0, -leading);
    }

    /// Horizontal advance in text space of a shown string.
    fn text_advance(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.font_size * GLYPH_WIDTH_EM
    }

    /// Advance of a TJ array: shown strings plus kerning adjustments, which
    /// are in thousandths of an em and move the pen left when positive.
    fn array_advance(&self, obj: &Object, encoding: Option<&Encoding>) -> f32 {
        let Object::Array(items) = obj else {
            return 0.0;
        };
        items
            .iter()
            .map(|item| match number(item) {
                Some(adjust) => -adjust / 1000.0 * self.font_size,
                None => self.text_advance(&decode_string(item, encoding)),
            })
            .sum()
    }

    /// Move the pen along the baseline by `tx` text-space units.
    fn advance(&mut self, tx: f32) {
        let [a, b, ..] = self.matrix;
        self.matrix[4] += tx * a;
        self.matrix[5] += tx * b;
    }

    fn effective_size(&self) -> f32 {
        let [_, b, _, d, _, _] = self.matrix;
        self.font_size * (b * b + d * d).sqrt()
    }

    /// Build a span at the current position, flipping to top-down coordinates.
    fn span(&self, text: String, font_name: String, page_height: f32) -> RawSpan {
        let size = self.effective_size();
        let (x, baseline) = (self.matrix[4], self.matrix[5]);
        let width = text.chars().count() as f32 * size * GLYPH_WIDTH_EM;
        let bbox = BBox::new(
            x,
            page_height - (baseline + size * 0.8),
            x + width,
            page_height - (baseline - size * 0.2),
        );
        RawSpan {
            text,
            font_name,
            font_size: size,
            bbox,
        }
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn decode_string(obj: &Object, encoding: Option<&Encoding>) -> String {
    match obj {
        Object::String(bytes, _) => match encoding {
            Some(enc) => LopdfDocument::decode_text(enc, bytes).unwrap_or_default(),
            None => decode_bytes(bytes),
        },
        _ => String::new(),
    }
}

/// Decode a TJ array, inserting a space where a large negative kern marks a word gap.
fn decode_array(obj: &Object, encoding: Option<&Encoding>) -> String {
    let Object::Array(items) = obj else {
        return String::new();
    };
    let mut out = String::new();
    for item in items {
        match number(item) {
            Some(adjust) => {
                if -adjust > TJ_SPACE_THRESHOLD && !out.is_empty() && !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            None => out.push_str(&decode_string(item, encoding)),
        }
    }
    out
}

/// Fallback decoding: UTF-16BE with BOM, then UTF-8, then Latin-1.
fn decode_bytes(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
