//! Read-only view of a font's GSUB features and encoded glyphs.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use read_fonts::{FontRef, ReadError, TableProvider, tables::cmap::CmapSubtable, types::Tag};

use crate::Result;

/// GSUB lookup type 1.
pub const SINGLE_SUBSTITUTION: u16 = 1;

/// Source glyph to target glyph pairs of one single-substitution subtable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SingleSubstitution(pub BTreeMap<u16, u16>);

impl SingleSubstitution {
    pub fn sources(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.keys().copied()
    }

    pub fn targets(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.values().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupInfo {
    /// Index into the GSUB lookup list.
    pub index: u16,
    /// GSUB lookup type, with extension lookups resolved.
    pub lookup_type: u16,
    /// Only populated for single substitution lookups.
    pub subtables: Vec<SingleSubstitution>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureInfo {
    pub tag: Tag,
    pub lookups: Vec<LookupInfo>,
}

/// All GSUB features of a font, one entry per tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutFeatures(Vec<FeatureInfo>);

impl LayoutFeatures {
    /// Merges features sharing a tag, keeping the first occurrence's position.
    pub fn new(features: Vec<FeatureInfo>) -> Self {
        let mut merged: Vec<FeatureInfo> = Vec::with_capacity(features.len());
        for feature in features {
            match merged.iter_mut().find(|f| f.tag == feature.tag) {
                Some(existing) => {
                    for lookup in feature.lookups {
                        if !existing.lookups.iter().any(|l| l.index == lookup.index) {
                            existing.lookups.push(lookup);
                        }
                    }
                }
                None => merged.push(feature),
            }
        }
        Self(merged)
    }

    /// A font without a GSUB table has no features. A GSUB that fails to
    /// parse is an error.
    pub fn from_font(font: &FontRef) -> Result<Self> {
        match font.gsub() {
            Ok(gsub) => Self::from_gsub(&gsub),
            Err(ReadError::TableIsMissing(_)) => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, tag: Tag) -> Option<&FeatureInfo> {
        self.0.iter().find(|f| f.tag == tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.0.iter().map(|f| f.tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureInfo> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Glyph ids reachable through any cmap subtable. Variation sequences
/// (format 14) do not make a glyph encoded on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphSet(HashSet<u16>);

impl GlyphSet {
    pub fn from_font(font: &FontRef) -> Self {
        font.cmap()
            .ok()
            .map(|cmap| {
                cmap.encoding_records()
                    .iter()
                    .filter_map(|r| r.subtable(cmap.offset_data()).ok())
                    .filter(|st| !matches!(st, CmapSubtable::Format14(_)))
                    .flat_map(|st| st.iter().map(|(_, gid)| gid.to_u32() as u16))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, gid: u16) -> bool {
        self.0.contains(&gid)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<u16> for GlyphSet {
    fn from_iter<T: IntoIterator<Item = u16>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// What a feature's lookups do, as far as classification cares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureInspection {
    pub lookup_types: BTreeSet<u16>,
    /// Union of source glyphs over every single-substitution subtable.
    /// `None` when the feature uses any other lookup type.
    pub source_glyphs: Option<BTreeSet<u16>>,
    /// Union of target glyphs, present exactly when `source_glyphs` is.
    pub target_glyphs: Option<BTreeSet<u16>>,
}

impl FeatureInspection {
    pub fn is_single_substitution_only(&self) -> bool {
        self.lookup_types.len() == 1 && self.lookup_types.contains(&SINGLE_SUBSTITUTION)
    }
}

/// Summarises the lookups of one feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureInspector;

impl FeatureInspector {
    pub fn inspect(feature: &FeatureInfo) -> FeatureInspection {
        let lookup_types: BTreeSet<u16> =
            feature.lookups.iter().map(|l| l.lookup_type).collect();
        let single_only =
            lookup_types.len() == 1 && lookup_types.contains(&SINGLE_SUBSTITUTION);

        let subtables = || feature.lookups.iter().flat_map(|l| l.subtables.iter());
        let source_glyphs =
            single_only.then(|| subtables().flat_map(SingleSubstitution::sources).collect());
        let target_glyphs =
            single_only.then(|| subtables().flat_map(SingleSubstitution::targets).collect());

        FeatureInspection {
            lookup_types,
            source_glyphs,
            target_glyphs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(index: u16, pairs: &[(u16, u16)]) -> LookupInfo {
        LookupInfo {
            index,
            lookup_type: SINGLE_SUBSTITUTION,
            subtables: vec![SingleSubstitution(pairs.iter().copied().collect())],
        }
    }

    fn other(index: u16, lookup_type: u16) -> LookupInfo {
        LookupInfo {
            index,
            lookup_type,
            subtables: vec![],
        }
    }

    #[test]
    fn single_only_feature_collects_sources() {
        let feature = FeatureInfo {
            tag: Tag::new(b"ss01"),
            lookups: vec![single(0, &[(1, 5), (2, 6)]), single(1, &[(3, 7)])],
        };
        let inspection = FeatureInspector::inspect(&feature);
        assert!(inspection.is_single_substitution_only());
        assert_eq!(inspection.source_glyphs, Some(BTreeSet::from([1, 2, 3])));
        assert_eq!(inspection.target_glyphs, Some(BTreeSet::from([5, 6, 7])));
    }

    #[test]
    fn mixed_feature_has_no_sources() {
        let feature = FeatureInfo {
            tag: Tag::new(b"liga"),
            lookups: vec![single(0, &[(1, 5)]), other(1, 4)],
        };
        let inspection = FeatureInspector::inspect(&feature);
        assert!(!inspection.is_single_substitution_only());
        assert_eq!(inspection.lookup_types, BTreeSet::from([1, 4]));
        assert_eq!(inspection.source_glyphs, None);
    }

    #[test]
    fn feature_without_lookups_is_not_single_only() {
        let feature = FeatureInfo {
            tag: Tag::new(b"ss09"),
            lookups: vec![],
        };
        let inspection = FeatureInspector::inspect(&feature);
        assert!(inspection.lookup_types.is_empty());
        assert!(!inspection.is_single_substitution_only());
    }

    #[test]
    fn duplicate_tags_are_merged() {
        let layout = LayoutFeatures::new(vec![
            FeatureInfo {
                tag: Tag::new(b"salt"),
                lookups: vec![single(0, &[])],
            },
            FeatureInfo {
                tag: Tag::new(b"calt"),
                lookups: vec![other(2, 6)],
            },
            FeatureInfo {
                tag: Tag::new(b"salt"),
                lookups: vec![single(0, &[]), single(1, &[])],
            },
        ]);
        assert_eq!(layout.len(), 2);
        let tags: Vec<Tag> = layout.tags().collect();
        assert_eq!(tags, vec![Tag::new(b"salt"), Tag::new(b"calt")]);
        assert_eq!(layout.get(Tag::new(b"salt")).unwrap().lookups.len(), 2);
    }
}
