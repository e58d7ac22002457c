//! Font parsing, freezing, and serialization.

use std::{collections::BTreeSet, fmt::Formatter, iter::once, result};

use log::debug;
use read_fonts::{
    FontRef, TableProvider, tables::cmap::CmapSubtable as ReadCmapSubtable, types::Tag,
};
use write_fonts::{
    BuilderError, FontBuilder,
    types::GlyphId,
    from_obj::ToOwnedTable,
    tables::{
        cmap::{Cmap, CmapSubtable, EncodingRecord, SequentialMapGroup},
        gsub::Gsub,
    },
};

use crate::{
    Result,
    classify::classify,
    error::Error,
    gsub::GlyphSubstitutions,
    inspect::{GlyphSet, LayoutFeatures},
    layout,
    remap::{RemapCommand, RemapLayoutOptions, RemapPlan},
    types::*,
};

/// A parsed font ready for feature freezing.
pub struct Font<'a> {
    data: &'a [u8],
    inner: FontRef<'a>,
}

impl std::fmt::Debug for Font<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("data_len", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl<'a> TryFrom<&'a [u8]> for Font<'a> {
    type Error = Error;

    fn try_from(data: &'a [u8]) -> Result<Self> {
        Self::new(data)
    }
}

impl AsRef<[u8]> for Font<'_> {
    fn as_ref(&self) -> &[u8] {
        self.data
    }
}

impl<'a> Font<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        Ok(Self {
            data,
            inner: FontRef::new(data)?,
        })
    }

    pub fn report(&self) -> Result<FontReport> {
        let gsub = self.inner.gsub().map_err(|_| Error::NoGsub)?;
        let script_list = gsub.script_list()?;

        let scripts_langs = script_list
            .script_records()
            .iter()
            .flat_map(|sr| {
                let tag = sr.script_tag();
                let langs = sr
                    .script(script_list.offset_data())
                    .into_iter()
                    .flat_map(|s| s.lang_sys_records())
                    .map(move |lr| format!("{tag}/{}", lr.lang_sys_tag()));
                once(tag.to_string()).chain(langs)
            })
            .collect();

        let features = gsub
            .feature_list()?
            .feature_records()
            .iter()
            .map(|r| r.feature_tag().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Ok(FontReport {
            scripts_langs,
            features,
        })
    }

    pub fn layout(&self) -> Result<LayoutFeatures> {
        LayoutFeatures::from_font(&self.inner)
    }

    pub fn glyphs(&self) -> GlyphSet {
        GlyphSet::from_font(&self.inner)
    }

    /// Classify `freeze` against this font and build the remap plan.
    pub fn plan(&self, freeze: &[Tag], options: &RemapLayoutOptions) -> Result<RemapPlan> {
        let decisions = classify(freeze, &self.glyphs(), &self.layout()?);
        Ok(RemapPlan::build(&decisions, options))
    }

    /// Rewrite every cmap subtable so codepoints map to the glyphs the given
    /// features would substitute.
    pub fn remap_cmap(&self, tags: &[Tag]) -> Result<FreezeResult> {
        let layout = self.layout()?;
        let selected: Vec<_> = tags.iter().filter_map(|&t| layout.get(t)).collect();

        let subs = GlyphSubstitutions::from_features(selected.iter().copied());
        let stats = FreezeStats {
            features_requested: tags.len(),
            lookups_processed: GlyphSubstitutions::lookup_count(selected.iter().copied()),
            substitutions_applied: subs.len(),
            lang_systems_changed: 0,
        };
        if subs.is_empty() {
            debug!("no single substitutions for {tags:?}, cmap left as is");
            return Ok(FreezeResult {
                data: self.data.to_vec(),
                stats,
            });
        }

        let data = FontEditor(self.inner.clone()).with_remapped_cmap(&subs)?;
        Ok(FreezeResult { data, stats })
    }

    /// Point every language system that uses a command's source feature at
    /// an always-on feature carrying the same lookups.
    pub fn inject_rules(
        &self,
        commands: &[RemapCommand],
        options: &RemapLayoutOptions,
    ) -> Result<FreezeResult> {
        let stats = FreezeStats {
            features_requested: commands.len(),
            ..Default::default()
        };
        if commands.is_empty() {
            return Ok(FreezeResult {
                data: self.data.to_vec(),
                stats,
            });
        }

        let mut gsub: Gsub = self
            .inner
            .gsub()
            .map_err(|_| Error::NoGsub)?
            .to_owned_table();
        let changed = layout::inject(&mut gsub, commands, options);

        let data = FontEditor(self.inner.clone()).with_gsub(&gsub)?;
        Ok(FreezeResult {
            data,
            stats: FreezeStats {
                lang_systems_changed: changed,
                ..stats
            },
        })
    }

    /// Both executors: cmap remap for eligible features, then rule injection
    /// for every matched feature.
    pub fn freeze(&self, tags: &[Tag], options: &RemapLayoutOptions) -> Result<FreezeResult> {
        let plan = self.plan(tags, options)?;
        let mut result = self.remap_cmap(&plan.direct_remap)?;
        let injected = Font::new(&result.data)?.inject_rules(&plan.commands, options)?;
        result.stats += injected.stats;
        result.stats.features_requested = plan.decisions.len();
        result.data = injected.data;
        Ok(result)
    }

    pub fn data(&self) -> &[u8] {
        self.data
    }
}

pub struct FontEditor<'a>(FontRef<'a>);

impl<'a> FontEditor<'a> {
    /// Format 12 subtables, and anything reaching past the BMP, are written
    /// as format 12; the rest as format 4. Variation sequence subtables are
    /// kept as they are.
    pub fn with_remapped_cmap(&self, subs: &GlyphSubstitutions) -> Result<Vec<u8>> {
        let cmap = self.0.cmap().map_err(|_| Error::NoCmap)?;
        let mut owned: Cmap = cmap.to_owned_table();

        for (record, read_record) in owned
            .encoding_records
            .iter_mut()
            .zip(cmap.encoding_records())
        {
            let Ok(subtable) = read_record.subtable(cmap.offset_data()) else {
                continue;
            };
            if matches!(subtable, ReadCmapSubtable::Format14(_)) {
                continue;
            }
            let mut mappings: Vec<_> = subtable
                .iter()
                .map(|(cp, gid)| (cp, subs.remap(gid.to_u32() as u16)))
                .collect();
            mappings.sort_by_key(|&(cp, _)| cp);
            mappings.dedup_by_key(|&mut (cp, _)| cp);

            let bmp_only = mappings.iter().all(|&(cp, _)| cp <= 0xFFFF);
            let format_4 = match subtable {
                ReadCmapSubtable::Format12(_) => None,
                _ if bmp_only => format_4_record(&mappings)?,
                _ => None,
            };
            record.subtable = match format_4 {
                Some(bmp) => bmp.subtable,
                None => CmapSubtable::format_12(0, build_groups(&mappings)).into(),
            };
        }

        self.rebuild(|b| b.add_table(&owned).map(|_| ()))
    }

    pub fn with_gsub(&self, gsub: &Gsub) -> Result<Vec<u8>> {
        self.rebuild(|b| b.add_table(gsub).map(|_| ()))
    }

    fn rebuild(
        &self,
        add: impl FnOnce(&mut FontBuilder) -> result::Result<(), BuilderError>,
    ) -> Result<Vec<u8>> {
        let mut builder = FontBuilder::new();
        for rec in self.0.table_directory.table_records() {
            if let Some(data) = self.0.table_data(rec.tag()) {
                builder.add_raw(rec.tag(), data);
            }
        }
        add(&mut builder)?;
        Ok(builder.build())
    }
}

/// A format 4 encoding record for BMP `mappings`, `None` when there are none.
fn format_4_record(mappings: &[(u32, u16)]) -> Result<Option<EncodingRecord>> {
    let chars = mappings
        .iter()
        .filter_map(|&(cp, gid)| Some((char::from_u32(cp)?, GlyphId::new(gid as u32))));
    Ok(Cmap::from_mappings(chars)?.encoding_records.into_iter().next())
}

fn build_groups(mappings: &[(u32, u16)]) -> Vec<SequentialMapGroup> {
    let mut groups: Vec<SequentialMapGroup> = Vec::with_capacity(mappings.len());
    for &(cp, gid) in mappings {
        if let Some(last) = groups.last_mut() {
            let expected_cp = last.end_char_code + 1;
            let expected_gid =
                last.start_glyph_id + (last.end_char_code + 1 - last.start_char_code);
            if cp == expected_cp && gid as u32 == expected_gid {
                last.end_char_code = cp;
                continue;
            }
        }
        groups.push(SequentialMapGroup {
            start_char_code: cp,
            end_char_code: cp,
            start_glyph_id: gid as u32,
        });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use upsetter_test_fonts::{ligature_test, mapped_glyph, substitution_test};

    #[test]
    fn groups_merge_consecutive_runs() {
        let groups = build_groups(&[(0x41, 3), (0x42, 4), (0x43, 5), (0x45, 9)]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].end_char_code, 0x43);
        assert_eq!(groups[1].start_glyph_id, 9);
    }

    #[test]
    fn remap_cmap_points_codepoint_at_substitute() {
        let font = substitution_test();
        let data = font.build();

        let result = Font::new(&data)
            .unwrap()
            .remap_cmap(&[Tag::new(b"ss01")])
            .unwrap();

        assert_eq!(result.stats.substitutions_applied, 1);
        assert_eq!(mapped_glyph(&result.data, 'a'), Some(font.gid("a.ss01")));
    }

    fn subtable_formats(data: &[u8]) -> Vec<u8> {
        let cmap = FontRef::new(data).unwrap().cmap().unwrap();
        cmap.encoding_records()
            .iter()
            .map(|r| match r.subtable(cmap.offset_data()).unwrap() {
                ReadCmapSubtable::Format4(_) => 4,
                ReadCmapSubtable::Format12(_) => 12,
                _ => 0,
            })
            .collect()
    }

    #[test]
    fn remap_cmap_keeps_bmp_subtables_in_format_4() {
        let data = substitution_test().build();
        assert_eq!(subtable_formats(&data), vec![4, 4]);

        let result = Font::new(&data)
            .unwrap()
            .remap_cmap(&[Tag::new(b"ss01")])
            .unwrap();
        assert_eq!(subtable_formats(&result.data), vec![4, 4]);
    }

    #[test]
    fn format_4_record_skips_supplementary_codepoints() {
        let record = format_4_record(&[(0x41, 3), (0x1F600, 4)]).unwrap().unwrap();
        assert_eq!(record.encoding_id, 3);
        assert!(format_4_record(&[(0x1F600, 4)]).unwrap().is_none());
    }

    #[test]
    fn remap_cmap_without_matches_keeps_data() {
        let data = substitution_test().build();
        let result = Font::new(&data)
            .unwrap()
            .remap_cmap(&[Tag::new(b"smcp")])
            .unwrap();
        assert_eq!(result.data, data);
    }

    #[test]
    fn plan_follows_encoding() {
        let data = ligature_test().build();
        let plan = Font::new(&data)
            .unwrap()
            .plan(
                &[Tag::new(b"ss01"), Tag::new(b"liga")],
                &RemapLayoutOptions::default(),
            )
            .unwrap();

        assert_eq!(plan.commands.len(), 2);
        assert!(plan.direct_remap.is_empty());
    }

    #[test]
    fn inject_rules_adds_target_feature() {
        let data = substitution_test().build();
        let commands = [RemapCommand {
            source: Tag::new(b"ss02"),
            target: Tag::new(b"rclt"),
        }];

        let result = Font::new(&data)
            .unwrap()
            .inject_rules(&commands, &RemapLayoutOptions::default())
            .unwrap();

        // DFLT and latn default language systems.
        assert_eq!(result.stats.lang_systems_changed, 2);
        let layout = Font::new(&result.data).unwrap().layout().unwrap();
        let rclt = layout.get(Tag::new(b"rclt")).unwrap();
        assert_eq!(rclt.lookups.len(), 1);
        assert_eq!(rclt.lookups[0].index, 1);
    }

    #[test]
    fn report_lists_scripts_and_features() {
        let data = substitution_test().build();
        let report = Font::new(&data).unwrap().report().unwrap();
        assert_eq!(report.scripts_langs, vec!["DFLT", "latn"]);
        assert_eq!(report.features, vec!["ss01", "ss02", "ss03"]);
    }
}
