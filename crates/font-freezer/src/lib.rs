//! # Font Feature Freezer
//!
//! Make OpenType GSUB features permanent so a shaper applies them without
//! being asked.
//!
//! Each requested feature is classified first. A feature whose lookups are
//! all single substitutions from encoded glyphs can be frozen by re-pointing
//! the cmap ([`FreezeStrategy::DirectGlyphRemap`]). Every matched feature is
//! also moved onto an always-on feature (`rclt` by default) so contextual,
//! multiple and ligature substitutions survive too
//! ([`FreezeStrategy::RuleInjection`]).
//!
//! ## Example
//!
//! ```no_run
//! use font_feature_freezer::{Font, RemapLayoutOptions, parse_tags};
//!
//! let data = std::fs::read("input.ttf").unwrap();
//! let tags = parse_tags(["ss01", "ss02"]).unwrap();
//! let frozen = Font::new(&data)
//!     .unwrap()
//!     .freeze(&tags, &RemapLayoutOptions::default())
//!     .unwrap();
//! std::fs::write("output.ttf", frozen.data).unwrap();
//! ```

mod classify;
mod error;
mod font;
mod gsub;
mod inspect;
mod layout;
mod remap;
mod types;

pub use classify::{FreezeDecisions, FreezeStrategy, classify};
pub use error::{Error, Result};
pub use font::{Font, FontEditor};
pub use gsub::GlyphSubstitutions;
pub use inspect::{
    FeatureInfo, FeatureInspection, FeatureInspector, GlyphSet, LayoutFeatures, LookupInfo,
    SINGLE_SUBSTITUTION, SingleSubstitution,
};
pub use layout::inject;
pub use read_fonts::types::Tag;
pub use remap::{DEFAULT_TARGET_FEATURE, RemapCommand, RemapLayoutOptions, RemapPlan};
pub use types::{FontReport, FreezeResult, FreezeStats};

/// Generate a report of available scripts, languages, and features.
pub fn report(data: &[u8]) -> Result<FontReport> {
    Font::new(data)?.report()
}

/// Classify `tags` against the font and build the remap plan.
pub fn plan(data: &[u8], tags: &[Tag], options: &RemapLayoutOptions) -> Result<RemapPlan> {
    Font::new(data)?.plan(tags, options)
}

/// Direct glyph remap of the given features.
pub fn remap_cmap(data: &[u8], tags: &[Tag]) -> Result<FreezeResult> {
    Font::new(data)?.remap_cmap(tags)
}

/// Rule injection for the given commands.
pub fn inject_rules(
    data: &[u8],
    commands: &[RemapCommand],
    options: RemapLayoutOptions,
) -> Result<Vec<u8>> {
    Font::new(data)?
        .inject_rules(commands, &options)
        .map(|r| r.data)
}

/// Freeze features with both strategies.
pub fn freeze(data: &[u8], tags: &[Tag], options: &RemapLayoutOptions) -> Result<FreezeResult> {
    Font::new(data)?.freeze(tags, options)
}

/// Parse feature tags, rejecting anything that is not 1-4 printable ASCII
/// characters.
///
/// ```
/// use font_feature_freezer::parse_tags;
///
/// let tags = parse_tags(["smcp", "onum"]).unwrap();
/// assert_eq!(tags.len(), 2);
/// assert!(parse_tags(["toolong"]).is_err());
/// ```
pub fn parse_tags<I, S>(tags: I) -> Result<Vec<Tag>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|s| {
            let s = s.as_ref().trim();
            Tag::new_checked(s.as_bytes()).map_err(|_| Error::InvalidTag(s.to_owned()))
        })
        .collect()
}
