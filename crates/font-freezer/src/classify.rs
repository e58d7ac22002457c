//! Per-feature choice between rewriting the cmap and injecting rules.

use std::{collections::BTreeSet, fmt};

use indexmap::IndexMap;
use log::debug;
use read_fonts::types::Tag;

use crate::inspect::{FeatureInspection, FeatureInspector, GlyphSet, LayoutFeatures};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FreezeStrategy {
    /// Re-point the cmap at the substituted glyphs.
    DirectGlyphRemap,
    /// Move the feature's lookups onto an always-on feature.
    RuleInjection,
}

impl fmt::Display for FreezeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectGlyphRemap => f.write_str("direct glyph remap"),
            Self::RuleInjection => f.write_str("rule injection"),
        }
    }
}

/// Decisions keyed by feature tag, in the order the tags were requested.
pub type FreezeDecisions = IndexMap<Tag, FreezeStrategy>;

/// Decide a strategy for every requested tag the font defines.
///
/// A feature qualifies for [`FreezeStrategy::DirectGlyphRemap`] when all of
/// its lookups are single substitutions and every source glyph is encoded,
/// unless one of its target glyphs is itself a source of a remapped feature.
/// Every frozen feature is also injected, so such a target would be
/// substituted a second time. Tags missing from `layout` are left out of the
/// result.
pub fn classify(freeze: &[Tag], glyphs: &GlyphSet, layout: &LayoutFeatures) -> FreezeDecisions {
    let mut decisions = FreezeDecisions::new();
    let mut remapped: IndexMap<Tag, FeatureInspection> = IndexMap::new();

    for &tag in freeze {
        if decisions.contains_key(&tag) {
            continue;
        }
        let Some(feature) = layout.get(tag) else {
            debug!("{tag}: not in GSUB, skipped");
            continue;
        };

        let inspection = FeatureInspector::inspect(feature);
        let strategy = match &inspection.source_glyphs {
            Some(sources) if sources.iter().all(|&g| glyphs.contains(g)) => {
                FreezeStrategy::DirectGlyphRemap
            }
            _ => FreezeStrategy::RuleInjection,
        };
        debug!(
            "{tag}: lookup types {:?} -> {strategy}",
            inspection.lookup_types
        );
        if strategy == FreezeStrategy::DirectGlyphRemap {
            remapped.insert(tag, inspection);
        }
        decisions.insert(tag, strategy);
    }

    let sources: BTreeSet<u16> = remapped
        .values()
        .filter_map(|i| i.source_glyphs.as_ref())
        .flatten()
        .copied()
        .collect();
    for (&tag, inspection) in &remapped {
        if inspection
            .target_glyphs
            .iter()
            .flatten()
            .any(|g| sources.contains(g))
        {
            debug!("{tag}: remapped glyphs would be substituted again, rule injection only");
            decisions.insert(tag, FreezeStrategy::RuleInjection);
        }
    }

    decisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::{FeatureInfo, LookupInfo, SINGLE_SUBSTITUTION, SingleSubstitution};

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

    fn feature(tag: &[u8; 4], lookups: Vec<LookupInfo>) -> FeatureInfo {
        FeatureInfo {
            tag: Tag::new(tag),
            lookups,
        }
    }

    #[test]
    fn encoded_single_substitution_is_direct() {
        let layout = LayoutFeatures::new(vec![feature(b"ss01", vec![single(0, &[(1, 2), (3, 4)])])]);
        let glyphs: GlyphSet = [1, 3].into_iter().collect();

        let decisions = classify(&[Tag::new(b"ss01")], &glyphs, &layout);
        assert_eq!(
            decisions.get(&Tag::new(b"ss01")),
            Some(&FreezeStrategy::DirectGlyphRemap)
        );
    }

    #[test]
    fn one_unencoded_source_flips_to_injection() {
        let layout = LayoutFeatures::new(vec![feature(b"ss01", vec![single(0, &[(1, 2), (3, 4)])])]);
        let glyphs: GlyphSet = [1].into_iter().collect();

        let decisions = classify(&[Tag::new(b"ss01")], &glyphs, &layout);
        assert_eq!(
            decisions.get(&Tag::new(b"ss01")),
            Some(&FreezeStrategy::RuleInjection)
        );
    }

    #[test]
    fn feature_without_lookups_is_never_direct() {
        let layout = LayoutFeatures::new(vec![feature(b"ss01", vec![])]);
        let glyphs: GlyphSet = (0..10).collect();

        let decisions = classify(&[Tag::new(b"ss01")], &glyphs, &layout);
        assert_eq!(
            decisions.get(&Tag::new(b"ss01")),
            Some(&FreezeStrategy::RuleInjection)
        );
    }

    #[test]
    fn single_substitution_without_coverage_is_direct() {
        let layout = LayoutFeatures::new(vec![feature(b"ss02", vec![single(0, &[])])]);
        let glyphs: GlyphSet = (0..10).collect();

        let decisions = classify(&[Tag::new(b"ss02")], &glyphs, &layout);
        assert_eq!(
            decisions.get(&Tag::new(b"ss02")),
            Some(&FreezeStrategy::DirectGlyphRemap)
        );
    }

    #[test]
    fn self_feeding_substitution_is_injected() {
        let layout = LayoutFeatures::new(vec![feature(b"ss01", vec![single(0, &[(1, 2), (2, 3)])])]);
        let glyphs: GlyphSet = [1, 2, 3].into_iter().collect();

        let decisions = classify(&[Tag::new(b"ss01")], &glyphs, &layout);
        assert_eq!(
            decisions.get(&Tag::new(b"ss01")),
            Some(&FreezeStrategy::RuleInjection)
        );
    }

    #[test]
    fn feeding_another_remapped_feature_is_injected() {
        let layout = LayoutFeatures::new(vec![
            feature(b"ss01", vec![single(0, &[(2, 3)])]),
            feature(b"ss02", vec![single(1, &[(1, 2)])]),
        ]);
        let glyphs: GlyphSet = [1, 2, 3].into_iter().collect();
        let tags = [Tag::new(b"ss01"), Tag::new(b"ss02")];

        let decisions = classify(&tags, &glyphs, &layout);
        assert_eq!(
            decisions.get(&Tag::new(b"ss01")),
            Some(&FreezeStrategy::DirectGlyphRemap)
        );
        assert_eq!(
            decisions.get(&Tag::new(b"ss02")),
            Some(&FreezeStrategy::RuleInjection)
        );
        let order: Vec<Tag> = decisions.keys().copied().collect();
        assert_eq!(order, tags);
    }

    #[test]
    fn other_and_mixed_types_use_injection() {
        let layout = LayoutFeatures::new(vec![
            feature(b"liga", vec![other(0, 4)]),
            feature(b"calt", vec![single(1, &[(1, 2)]), other(2, 6)]),
            feature(b"ccmp", vec![other(3, 2)]),
        ]);
        let glyphs: GlyphSet = (0..10).collect();
        let tags = [Tag::new(b"liga"), Tag::new(b"calt"), Tag::new(b"ccmp")];

        let decisions = classify(&tags, &glyphs, &layout);
        assert_eq!(decisions.len(), 3);
        assert!(
            decisions
                .values()
                .all(|s| *s == FreezeStrategy::RuleInjection)
        );
    }

    #[test]
    fn absent_tags_are_dropped_and_order_is_kept() {
        let layout = LayoutFeatures::new(vec![
            feature(b"ss01", vec![single(0, &[(1, 2)])]),
            feature(b"ss02", vec![single(1, &[(2, 3)])]),
        ]);
        let glyphs: GlyphSet = [1].into_iter().collect();
        let tags = [Tag::new(b"ss02"), Tag::new(b"smcp"), Tag::new(b"ss01")];

        let decisions = classify(&tags, &glyphs, &layout);
        let order: Vec<Tag> = decisions.keys().copied().collect();
        assert_eq!(order, vec![Tag::new(b"ss02"), Tag::new(b"ss01")]);
    }
}
