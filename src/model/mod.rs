//! Document model types for outline inference.
//!
//! Fragments flow in from the extractors; outline types flow out of the
//! assembler and form the stable output contract.

mod fragment;
mod outline;

pub use fragment::{
    emphasis_from_font_name, size_from_key, size_key, Alignment, AlignmentRule, BBox, TextFragment,
};
pub use outline::{HeadingLevel, OutlineDocument, OutlineEntry, OutlineMetadata};
