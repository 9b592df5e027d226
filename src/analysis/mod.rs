//! Layout analysis: noise filtering, font statistics, feature derivation
//! and title selection.

mod features;
mod noise;
mod profile;
mod title;

pub use features::{
    alignment_column, normalize, FeatureTable, FeatureVector, NormalizedDocument, NormalizedRow,
    BASE_COLUMNS,
};
pub use noise::{is_noise, is_valid_heading, BOILERPLATE_KEYWORDS};
pub use profile::DocumentFontProfile;
pub use title::TitleSelector;
