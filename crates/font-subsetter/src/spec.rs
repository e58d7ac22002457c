//! What a subset keeps: codepoints, layout features and glyph names.

use std::collections::BTreeSet;

use log::debug;
use read_fonts::{
    FontRef, TableProvider,
    tables::cmap::{Cmap14, CmapSubtable, PlatformId},
    types::Tag,
};

use crate::unicodes::{UnicodeParseError, UnicodeSet, parse_unicodes};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubsetSpec {
    pub unicodes: UnicodeSet,
    pub layout_features: BTreeSet<Tag>,
    pub retain_glyph_names: bool,
}

/// Builds a [`SubsetSpec`] from the font's current features and the
/// caller's requests.
#[derive(Debug, Clone, Default)]
pub struct SubsetSpecBuilder<'a> {
    font_features: BTreeSet<Tag>,
    remove: BTreeSet<Tag>,
    unicodes: Option<&'a str>,
    retain_glyph_names: bool,
}

impl<'a> SubsetSpecBuilder<'a> {
    pub fn new(font_features: impl IntoIterator<Item = Tag>) -> Self {
        Self {
            font_features: font_features.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Starts from every GSUB and GPOS feature tag of `font`.
    pub fn from_font(font: &FontRef) -> Self {
        Self::new(font_feature_tags(font))
    }

    /// Features to drop from the subset.
    pub fn remove(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.remove.extend(tags);
        self
    }

    /// Explicit codepoint list; `None` keeps everything the cmap encodes.
    pub fn unicodes(mut self, unicodes: Option<&'a str>) -> Self {
        self.unicodes = unicodes;
        self
    }

    pub fn retain_glyph_names(mut self, retain: bool) -> Self {
        self.retain_glyph_names = retain;
        self
    }

    pub fn build(self, font: &FontRef) -> Result<SubsetSpec, UnicodeParseError> {
        let unicodes = match self.unicodes {
            Some(request) => parse_unicodes(request)?,
            None => encoded_unicodes(font),
        };
        let layout_features: BTreeSet<Tag> = self
            .font_features
            .difference(&self.remove)
            .copied()
            .collect();
        debug!(
            "subset keeps {} codepoints, {} variation sequences, features {:?}",
            unicodes.codepoints.len(),
            unicodes.variation_sequences.len(),
            layout_features
        );

        Ok(SubsetSpec {
            unicodes,
            layout_features,
            retain_glyph_names: self.retain_glyph_names,
        })
    }
}

/// Feature tags of the GSUB and GPOS feature lists.
pub fn font_feature_tags(font: &FontRef) -> BTreeSet<Tag> {
    let mut tags = BTreeSet::new();
    if let Ok(list) = font.gsub().and_then(|gsub| gsub.feature_list()) {
        tags.extend(list.feature_records().iter().map(|r| r.feature_tag()));
    }
    if let Ok(list) = font.gpos().and_then(|gpos| gpos.feature_list()) {
        tags.extend(list.feature_records().iter().map(|r| r.feature_tag()));
    }
    tags
}

/// Every codepoint a Unicode cmap subtable maps to a real glyph, and every
/// variation sequence of a format 14 subtable.
pub fn encoded_unicodes(font: &FontRef) -> UnicodeSet {
    let mut set = UnicodeSet::new();
    let Ok(cmap) = font.cmap() else {
        return set;
    };

    for record in cmap.encoding_records() {
        let unicode = matches!(
            (record.platform_id(), record.encoding_id()),
            (PlatformId::Unicode, _) | (PlatformId::Windows, 1 | 10)
        );
        if !unicode {
            continue;
        }
        match record.subtable(cmap.offset_data()) {
            Ok(CmapSubtable::Format14(uvs)) => add_variation_sequences(&uvs, &mut set),
            Ok(subtable) => set.codepoints.extend(
                subtable
                    .iter()
                    .filter(|(_, gid)| gid.to_u32() != 0)
                    .map(|(cp, _)| cp),
            ),
            Err(e) => debug!("skipping unreadable cmap subtable: {e}"),
        }
    }
    set
}

fn add_variation_sequences(uvs: &Cmap14, set: &mut UnicodeSet) {
    for record in uvs.var_selector() {
        let selector = record.var_selector().to_u32();
        if let Some(Ok(default)) = record.default_uvs(uvs.offset_data()) {
            for range in default.ranges() {
                let start = range.start_unicode_value().to_u32();
                for base in start..=start + range.additional_count() as u32 {
                    set.insert_variation_sequence(base, selector);
                }
            }
        }
        if let Some(Ok(non_default)) = record.non_default_uvs(uvs.offset_data()) {
            for mapping in non_default.uvs_mapping() {
                set.insert_variation_sequence(mapping.unicode_value().to_u32(), selector);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upsetter_test_fonts::{TestFont, substitution_test};

    fn tag(s: &[u8; 4]) -> Tag {
        Tag::new(s)
    }

    #[test]
    fn keeps_all_features_without_removals() {
        let data = TestFont::new(&[".notdef", "a"])
            .map('a', "a")
            .feature("liga", &[])
            .feature("ss01", &[])
            .gpos_feature("kern")
            .build();
        let font = FontRef::new(&data).unwrap();

        let spec = SubsetSpecBuilder::from_font(&font).build(&font).unwrap();
        assert_eq!(
            spec.layout_features,
            BTreeSet::from([tag(b"kern"), tag(b"liga"), tag(b"ss01")])
        );
    }

    #[test]
    fn removing_every_feature_keeps_none() {
        let data = substitution_test().build();
        let font = FontRef::new(&data).unwrap();
        let all = font_feature_tags(&font);

        let spec = SubsetSpecBuilder::new(all.clone())
            .remove(all)
            .build(&font)
            .unwrap();
        assert!(spec.layout_features.is_empty());
    }

    #[test]
    fn removal_of_absent_tags_is_ignored() {
        let spec = SubsetSpecBuilder::new([tag(b"liga"), tag(b"ss01")])
            .remove([tag(b"ss01"), tag(b"smcp")])
            .build(&FontRef::new(&substitution_test().build()).unwrap())
            .unwrap();
        assert_eq!(spec.layout_features, BTreeSet::from([tag(b"liga")]));
    }

    #[test]
    fn default_unicodes_come_from_cmap() {
        let data = TestFont::new(&[".notdef", "a", "b"])
            .map('a', "a")
            .map('b', "b")
            .build();
        let font = FontRef::new(&data).unwrap();

        let spec = SubsetSpecBuilder::from_font(&font)
            .retain_glyph_names(true)
            .build(&font)
            .unwrap();
        assert_eq!(spec.unicodes.codepoints, BTreeSet::from([0x61, 0x62]));
        assert!(spec.retain_glyph_names);
    }

    #[test]
    fn explicit_unicodes_replace_cmap() {
        let data = substitution_test().build();
        let font = FontRef::new(&data).unwrap();

        let spec = SubsetSpecBuilder::from_font(&font)
            .unicodes(Some("20-21"))
            .build(&font)
            .unwrap();
        assert_eq!(spec.unicodes.codepoints, BTreeSet::from([0x20, 0x21]));
    }

    #[test]
    fn malformed_unicodes_fail() {
        let data = substitution_test().build();
        let font = FontRef::new(&data).unwrap();

        let err = SubsetSpecBuilder::from_font(&font)
            .unicodes(Some("41,nope"))
            .build(&font)
            .unwrap_err();
        assert_eq!(err, UnicodeParseError::InvalidToken("nope".into()));
    }
}
