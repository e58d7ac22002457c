//! Font subsetting on top of hb-subset.
//!
//! [`SubsetSpecBuilder`] decides what a subset keeps; [`Subsetter`] hands
//! that to HarfBuzz. Everything operates on byte slices.
//!
//! # Example
//!
//! ```no_run
//! use read_fonts::FontRef;
//! use upsetter_font_subsetter::{SubsetSpecBuilder, Subsetter};
//!
//! let data = std::fs::read("input.ttf").unwrap();
//! let font = FontRef::new(&data).unwrap();
//! let spec = SubsetSpecBuilder::from_font(&font)
//!     .unicodes(Some("20-7E"))
//!     .build(&font)
//!     .unwrap();
//! let subset = Subsetter::from_spec(&spec).subset(&data).unwrap();
//! ```

mod spec;
mod unicodes;

use anyhow::{Context, Result};
use hb_subset::{Blob, FontFace, SubsetInput, Tag};
use log::debug;

pub use spec::{SubsetSpec, SubsetSpecBuilder, encoded_unicodes, font_feature_tags};
pub use unicodes::{UnicodeParseError, UnicodeSet, parse_unicodes};

/// HarfBuzz subsetter configured from a [`SubsetSpec`].
///
/// The layout feature set is exact: HarfBuzz's default feature list is
/// cleared before the `SubsetSpec` features are added.
#[derive(Debug, Default, Clone)]
pub struct Subsetter {
    unicodes: Vec<char>,
    layout_features: Vec<[u8; 4]>,
    retain_glyph_names: bool,
}

impl Subsetter {
    pub fn from_spec(spec: &SubsetSpec) -> Self {
        Self {
            unicodes: spec.unicodes.chars().collect(),
            layout_features: spec
                .layout_features
                .iter()
                .map(|tag| tag.to_be_bytes())
                .collect(),
            retain_glyph_names: spec.retain_glyph_names,
        }
    }

    pub fn subset(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut input = SubsetInput::new().context("failed to create subset input")?;

        if self.retain_glyph_names {
            input.flags().retain_glyph_names();
        }

        {
            let mut feature_set = input.layout_feature_tag_set();
            feature_set.clear();
            for tag in &self.layout_features {
                feature_set.insert(Tag::new(tag));
            }
        }

        {
            let mut unicode_set = input.unicode_set();
            for &c in &self.unicodes {
                unicode_set.insert(c);
            }
        }

        debug!(
            "subsetting {} bytes to {} codepoints and {} features",
            data.len(),
            self.unicodes.len(),
            self.layout_features.len()
        );
        let font = FontFace::new(Blob::from_bytes(data)?).context("failed to load font")?;
        let subset_font = input.subset_font(&font).context("HarfBuzz subsetting failed")?;
        Ok(subset_font.underlying_blob().to_vec())
    }
}
