//! Synthetic TrueType fonts for tests.
//!
//! Every font carries the table set HarfBuzz and read-fonts need to load and
//! shape it (head, hhea, hmtx, maxp, cmap, post, glyf, loca), plus optional
//! GSUB, GPOS and name tables. Glyphs are empty outlines; only glyph ids,
//! encodings and layout rules matter to the tests.
//!
//! [`variable_test`] is the exception: a two-axis variable font with one
//! real outline.

use std::collections::BTreeMap;

use font_types::{F2Dot14, FWord, Fixed, GlyphId16, LongDateTime, Tag, UfWord, Version16Dot16};
use read_fonts::{
    FontRef, TableProvider,
    tables::glyf::CurvePoint,
    types::{GlyphId, NameId},
};
use write_fonts::{
    FontBuilder,
    tables::{
        cmap::Cmap,
        fvar::{AxisInstanceArrays, Fvar, InstanceRecord, VariationAxisRecord},
        glyf::{Bbox, Contour, GlyfLocaBuilder, Glyph, SimpleGlyph},
        gpos::{Gpos, PositionLookupList},
        gvar::{GlyphDelta, GlyphDeltas, GlyphVariations, Gvar, Tent},
        gsub::{
            Gsub, Ligature, LigatureSet, LigatureSubstFormat1, MultipleSubstFormat1, Sequence,
            SingleSubst, SubstitutionLookup, SubstitutionLookupList,
        },
        head::{Flags, Head, MacStyle},
        hhea::Hhea,
        hmtx::{Hmtx, LongMetric},
        layout::{
            CoverageTable, Feature, FeatureList, FeatureRecord, LangSys, Lookup, LookupFlag,
            Script, ScriptList, ScriptRecord,
        },
        loca::LocaFormat,
        maxp::Maxp,
        name::{Name, NameRecord},
        post::Post,
    },
};

/// A GSUB lookup described by glyph names.
#[derive(Debug, Clone)]
pub enum TestLookup {
    /// Type 1: one glyph to one glyph.
    Single(Vec<(&'static str, &'static str)>),
    /// Type 2: one glyph to a sequence.
    Multiple(Vec<(&'static str, Vec<&'static str>)>),
    /// Type 4: a sequence to one glyph.
    Ligature(Vec<(Vec<&'static str>, &'static str)>),
}

/// Builder for a synthetic font.
#[derive(Debug, Clone, Default)]
pub struct TestFont {
    glyphs: Vec<&'static str>,
    cmap: Vec<(char, &'static str)>,
    lookups: Vec<TestLookup>,
    gsub_features: Vec<(Tag, Vec<u16>)>,
    gpos_features: Vec<Tag>,
    names: Vec<(u16, String)>,
}

impl TestFont {
    /// Glyph order, `.notdef` first by convention.
    pub fn new(glyphs: &[&'static str]) -> Self {
        Self {
            glyphs: glyphs.to_vec(),
            ..Default::default()
        }
    }

    pub fn map(mut self, ch: char, glyph: &'static str) -> Self {
        self.cmap.push((ch, glyph));
        self
    }

    /// Appends a lookup; its index is the number of lookups added before it.
    pub fn lookup(mut self, lookup: TestLookup) -> Self {
        self.lookups.push(lookup);
        self
    }

    pub fn feature(mut self, tag: &str, lookups: &[u16]) -> Self {
        self.gsub_features.push((make_tag(tag), lookups.to_vec()));
        self
    }

    /// Adds a GPOS feature without lookups.
    pub fn gpos_feature(mut self, tag: &str) -> Self {
        self.gpos_features.push(make_tag(tag));
        self
    }

    /// Adds a Windows / Unicode BMP / US English name record.
    pub fn name(mut self, name_id: u16, value: &str) -> Self {
        self.names.push((name_id, value.to_string()));
        self
    }

    /// Glyph id of a glyph name. Panics when the glyph does not exist.
    pub fn gid(&self, glyph: &str) -> u16 {
        self.glyphs
            .iter()
            .position(|g| *g == glyph)
            .unwrap_or_else(|| panic!("unknown glyph {glyph}")) as u16
    }

    fn gid16(&self, glyph: &str) -> GlyphId16 {
        GlyphId16::new(self.gid(glyph))
    }

    pub fn build(&self) -> Vec<u8> {
        let num_glyphs = self.glyphs.len() as u16;

        let mut glyf_builder = GlyfLocaBuilder::new();
        for _ in &self.glyphs {
            let simple = SimpleGlyph {
                bbox: Bbox {
                    x_min: 0,
                    y_min: 0,
                    x_max: 500,
                    y_max: 700,
                },
                contours: vec![],
                instructions: vec![],
            };
            glyf_builder
                .add_glyph(&Glyph::Simple(simple))
                .expect("add glyph");
        }
        let (glyf, loca, loca_format) = glyf_builder.build();

        let mappings: Vec<(char, GlyphId)> = self
            .cmap
            .iter()
            .map(|(ch, glyph)| (*ch, GlyphId::new(self.gid(glyph) as u32)))
            .collect();
        let cmap = Cmap::from_mappings(mappings).expect("cmap");

        let mut builder = FontBuilder::new();
        builder.add_table(&make_head(loca_format)).expect("head");
        builder.add_table(&make_hhea(num_glyphs)).expect("hhea");
        builder
            .add_table(&Hmtx {
                h_metrics: self
                    .glyphs
                    .iter()
                    .map(|_| LongMetric {
                        advance: 500,
                        side_bearing: 0,
                    })
                    .collect(),
                left_side_bearings: vec![],
            })
            .expect("hmtx");
        builder.add_table(&make_maxp(num_glyphs)).expect("maxp");
        builder.add_table(&cmap).expect("cmap");
        builder.add_table(&make_post(num_glyphs)).expect("post");
        builder.add_table(&glyf).expect("glyf");
        builder.add_table(&loca).expect("loca");

        if !self.gsub_features.is_empty() {
            builder.add_table(&self.make_gsub()).expect("GSUB");
        }
        if !self.gpos_features.is_empty() {
            builder.add_table(&self.make_gpos()).expect("GPOS");
        }
        if !self.names.is_empty() {
            let records = self
                .names
                .iter()
                .map(|(id, value)| {
                    NameRecord::new(3, 1, 0x409, NameId::new(*id), value.clone().into())
                })
                .collect();
            builder.add_table(&Name::new(records)).expect("name");
        }

        builder.build()
    }

    fn make_gsub(&self) -> Gsub {
        let lookups = self.lookups.iter().map(|l| self.make_lookup(l)).collect();
        let features = self
            .gsub_features
            .iter()
            .map(|(tag, lookups)| FeatureRecord::new(*tag, Feature::new(None, lookups.clone())))
            .collect();
        Gsub::new(
            script_list(self.gsub_features.len()),
            FeatureList::new(features),
            SubstitutionLookupList::new(lookups),
        )
    }

    fn make_gpos(&self) -> Gpos {
        let features = self
            .gpos_features
            .iter()
            .map(|tag| FeatureRecord::new(*tag, Feature::new(None, vec![])))
            .collect();
        Gpos::new(
            script_list(self.gpos_features.len()),
            FeatureList::new(features),
            PositionLookupList::new(vec![]),
        )
    }

    fn make_lookup(&self, lookup: &TestLookup) -> SubstitutionLookup {
        match lookup {
            TestLookup::Single(pairs) => {
                let mut pairs: Vec<_> = pairs
                    .iter()
                    .map(|(from, to)| (self.gid16(from), self.gid16(to)))
                    .collect();
                pairs.sort();
                let (from, to): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
                let subtable = SingleSubst::format_2(CoverageTable::format_1(from), to);
                SubstitutionLookup::Single(Lookup::new(LookupFlag::empty(), vec![subtable]))
            }
            TestLookup::Multiple(rules) => {
                let mut rules: Vec<_> = rules
                    .iter()
                    .map(|(from, to)| {
                        (
                            self.gid16(from),
                            to.iter().map(|g| self.gid16(g)).collect::<Vec<_>>(),
                        )
                    })
                    .collect();
                rules.sort();
                let (from, to): (Vec<_>, Vec<_>) = rules.into_iter().unzip();
                let subtable = MultipleSubstFormat1::new(
                    CoverageTable::format_1(from),
                    to.into_iter().map(Sequence::new).collect(),
                );
                SubstitutionLookup::Multiple(Lookup::new(LookupFlag::empty(), vec![subtable]))
            }
            TestLookup::Ligature(rules) => {
                let mut sets: BTreeMap<GlyphId16, Vec<Ligature>> = BTreeMap::new();
                for (components, ligature) in rules {
                    let (first, rest) = components.split_first().expect("empty ligature");
                    sets.entry(self.gid16(first)).or_default().push(Ligature::new(
                        self.gid16(ligature),
                        rest.iter().map(|g| self.gid16(g)).collect(),
                    ));
                }
                let coverage = CoverageTable::format_1(sets.keys().copied().collect());
                let subtable = LigatureSubstFormat1::new(
                    coverage,
                    sets.into_values().map(LigatureSet::new).collect(),
                );
                SubstitutionLookup::Ligature(Lookup::new(LookupFlag::empty(), vec![subtable]))
            }
        }
    }
}

/// `a` chained through three stylistic sets:
/// `a -ss01-> a.ss01 -ss02-> a.ss01.ss02 -ss03-> a.ss01.ss02.ss03`.
pub fn substitution_test() -> TestFont {
    TestFont::new(&[".notdef", "a", "a.ss01", "a.ss01.ss02", "a.ss01.ss02.ss03"])
        .map('a', "a")
        .lookup(TestLookup::Single(vec![("a", "a.ss01")]))
        .lookup(TestLookup::Single(vec![("a.ss01", "a.ss01.ss02")]))
        .lookup(TestLookup::Single(vec![("a.ss01.ss02", "a.ss01.ss02.ss03")]))
        .feature("ss01", &[0])
        .feature("ss02", &[1])
        .feature("ss03", &[2])
        .name(1, "SubstitutionTest")
        .name(4, "SubstitutionTest Regular")
        .name(6, "SubstitutionTest-Regular")
}

/// `f l` ligates through `liga`; `ss01` swaps the unencoded ligature glyph.
pub fn ligature_test() -> TestFont {
    TestFont::new(&[".notdef", "f", "l", "fl", "fl.ss01"])
        .map('f', "f")
        .map('l', "l")
        .lookup(TestLookup::Ligature(vec![(vec!["f", "l"], "fl")]))
        .lookup(TestLookup::Single(vec![("fl", "fl.ss01")]))
        .feature("liga", &[0])
        .feature("ss01", &[1])
        .name(1, "Ligature Test")
        .name(6, "LigatureTest-Regular")
}

/// A variable font with `wght` 100..400..900 and `wdth` 50..100..200.
///
/// Glyph 1 is a 500 x 700 box encoded as `a`, points counter-clockwise from
/// the bottom left. At the `wght` maximum its right side and advance grow by
/// 100, at the `wdth` maximum by 50, and at both maxima together the whole
/// box also rises by 20 through a tuple that only stores the top right
/// point. Named instances: Regular (400, 100), Bold (900, 100) and Bold Wide
/// (900, 200).
pub fn variable_test() -> Vec<u8> {
    let box_glyph = {
        let points = [(0, 0), (500, 0), (500, 700), (0, 700)]
            .into_iter()
            .map(|(x, y)| CurvePoint::new(x, y, true))
            .collect::<Vec<_>>();
        let mut simple = SimpleGlyph {
            bbox: Bbox::default(),
            contours: vec![Contour::from(points)],
            instructions: vec![],
        };
        simple.recompute_bounding_box();
        Glyph::Simple(simple)
    };
    let mut glyf_builder = GlyfLocaBuilder::new();
    glyf_builder.add_glyph(&Glyph::Empty).expect("add .notdef");
    glyf_builder.add_glyph(&box_glyph).expect("add box");
    let (glyf, loca, loca_format) = glyf_builder.build();

    let tent = |peak: f32| Tent::new(F2Dot14::from_f32(peak), None);
    // Four outline points, then the phantom points.
    let right_side = |dx: i16| {
        [(0, 0), (dx, 0), (dx, 0), (0, 0), (0, 0), (dx, 0), (0, 0), (0, 0)]
            .into_iter()
            .map(|(x, y)| GlyphDelta::required(x, y))
            .collect::<Vec<_>>()
    };
    let mut rise = vec![GlyphDelta::optional(0, 20); 4];
    rise[2] = GlyphDelta::required(0, 20);
    rise.extend([GlyphDelta::optional(0, 0); 4]);
    let gvar = Gvar::new(
        vec![
            GlyphVariations::new(GlyphId::new(0), vec![]),
            GlyphVariations::new(
                GlyphId::new(1),
                vec![
                    GlyphDeltas::new(vec![tent(1.0), tent(0.0)], right_side(100)),
                    GlyphDeltas::new(vec![tent(0.0), tent(1.0)], right_side(50)),
                    GlyphDeltas::new(vec![tent(1.0), tent(1.0)], rise),
                ],
            ),
        ],
        2,
    )
    .expect("gvar");

    let axis = |tag: &[u8; 4], min: f64, default: f64, max: f64, name: u16| VariationAxisRecord {
        axis_tag: Tag::new(tag),
        min_value: Fixed::from_f64(min),
        default_value: Fixed::from_f64(default),
        max_value: Fixed::from_f64(max),
        flags: 0,
        axis_name_id: NameId::new(name),
    };
    let instance = |name: u16, wght: f64, wdth: f64| InstanceRecord {
        subfamily_name_id: NameId::new(name),
        flags: 0,
        coordinates: vec![Fixed::from_f64(wght), Fixed::from_f64(wdth)],
        post_script_name_id: None,
    };
    let fvar = Fvar {
        axis_instance_arrays: AxisInstanceArrays {
            axes: vec![
                axis(b"wght", 100.0, 400.0, 900.0, 256),
                axis(b"wdth", 50.0, 100.0, 200.0, 257),
            ],
            instances: vec![
                instance(258, 400.0, 100.0),
                instance(259, 900.0, 100.0),
                instance(260, 900.0, 200.0),
            ],
        }
        .into(),
    };

    let cmap = Cmap::from_mappings([('a', GlyphId::new(1))]).expect("cmap");
    let names = [
        (1, "Variable Test"),
        (2, "Regular"),
        (256, "Weight"),
        (257, "Width"),
        (258, "Regular"),
        (259, "Bold"),
        (260, "Bold Wide"),
    ]
    .into_iter()
    .map(|(id, value)| NameRecord::new(3, 1, 0x409, NameId::new(id), value.to_string().into()))
    .collect();

    let mut builder = FontBuilder::new();
    builder.add_table(&make_head(loca_format)).expect("head");
    builder.add_table(&make_hhea(2)).expect("hhea");
    builder
        .add_table(&Hmtx {
            h_metrics: vec![
                LongMetric {
                    advance: 500,
                    side_bearing: 0,
                };
                2
            ],
            left_side_bearings: vec![],
        })
        .expect("hmtx");
    builder.add_table(&make_maxp(2)).expect("maxp");
    builder.add_table(&cmap).expect("cmap");
    builder.add_table(&make_post(2)).expect("post");
    builder.add_table(&glyf).expect("glyf");
    builder.add_table(&loca).expect("loca");
    builder.add_table(&fvar).expect("fvar");
    builder.add_table(&gvar).expect("gvar");
    builder.add_table(&Name::new(names)).expect("name");
    builder.build()
}

/// Outline points of a simple glyph, `None` for anything else.
pub fn glyph_points(data: &[u8], gid: u32) -> Option<Vec<(i16, i16)>> {
    let font = FontRef::new(data).ok()?;
    let glyf = font.glyf().ok()?;
    let loca = font.loca(None).ok()?;
    match loca.get_glyf(GlyphId::new(gid), &glyf).ok()?? {
        read_fonts::tables::glyf::Glyph::Simple(simple) => {
            Some(simple.points().map(|p| (p.x, p.y)).collect())
        }
        read_fonts::tables::glyf::Glyph::Composite(_) => None,
    }
}

/// Glyph id the font's cmap assigns to `ch`.
pub fn mapped_glyph(data: &[u8], ch: char) -> Option<u16> {
    let font = FontRef::new(data).ok()?;
    let cmap = font.cmap().ok()?;
    cmap.map_codepoint(ch).map(|gid| gid.to_u32() as u16)
}

/// Every name record string with the given id.
pub fn name_strings(data: &[u8], name_id: u16) -> Vec<String> {
    let Ok(font) = FontRef::new(data) else {
        return vec![];
    };
    let Ok(name) = font.name() else {
        return vec![];
    };
    name.name_record()
        .iter()
        .filter(|r| r.name_id().to_u16() == name_id)
        .filter_map(|r| r.string(name.string_data()).ok())
        .map(|s| s.chars().collect())
        .collect()
}

fn make_tag(tag: &str) -> Tag {
    Tag::new_checked(tag.as_bytes()).expect("valid tag")
}

fn script_list(feature_count: usize) -> ScriptList {
    let indices: Vec<u16> = (0..feature_count as u16).collect();
    let records = [b"DFLT", b"latn"]
        .into_iter()
        .map(|tag| {
            ScriptRecord::new(
                Tag::new(tag),
                Script::new(Some(LangSys::new(indices.clone())), vec![]),
            )
        })
        .collect();
    ScriptList::new(records)
}

fn make_head(loca_format: LocaFormat) -> Head {
    Head {
        font_revision: Fixed::from_f64(1.0),
        checksum_adjustment: 0,
        magic_number: 0x5F0F3CF5,
        flags: Flags::empty(),
        units_per_em: 1000,
        created: LongDateTime::new(0),
        modified: LongDateTime::new(0),
        x_min: 0,
        y_min: 0,
        x_max: 500,
        y_max: 700,
        mac_style: MacStyle::empty(),
        lowest_rec_ppem: 8,
        font_direction_hint: 2,
        index_to_loc_format: match loca_format {
            LocaFormat::Short => 0,
            LocaFormat::Long => 1,
        },
    }
}

fn make_hhea(num_glyphs: u16) -> Hhea {
    Hhea {
        ascender: FWord::new(700),
        descender: FWord::new(-200),
        line_gap: FWord::new(0),
        advance_width_max: UfWord::new(500),
        min_left_side_bearing: FWord::new(0),
        min_right_side_bearing: FWord::new(0),
        x_max_extent: FWord::new(500),
        caret_slope_rise: 1,
        caret_slope_run: 0,
        caret_offset: 0,
        number_of_h_metrics: num_glyphs,
    }
}

fn make_maxp(num_glyphs: u16) -> Maxp {
    Maxp {
        num_glyphs,
        max_points: Some(0),
        max_contours: Some(0),
        max_composite_points: Some(0),
        max_composite_contours: Some(0),
        max_zones: Some(1),
        max_twilight_points: Some(0),
        max_storage: Some(0),
        max_function_defs: Some(0),
        max_instruction_defs: Some(0),
        max_stack_elements: Some(0),
        max_size_of_instructions: Some(0),
        max_component_elements: Some(0),
        max_component_depth: Some(0),
    }
}

fn make_post(num_glyphs: u16) -> Post {
    Post {
        version: Version16Dot16::VERSION_3_0,
        italic_angle: Fixed::from_f64(0.0),
        underline_position: FWord::new(-100),
        underline_thickness: FWord::new(50),
        is_fixed_pitch: 0,
        min_mem_type42: 0,
        max_mem_type42: 0,
        min_mem_type1: 0,
        max_mem_type1: 0,
        num_glyphs: Some(num_glyphs),
        glyph_name_index: None,
        string_data: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitution_test_font_parses() {
        let font = substitution_test();
        let data = font.build();
        let font_ref = FontRef::new(&data).unwrap();
        assert_eq!(font_ref.maxp().unwrap().num_glyphs(), 5);
        assert_eq!(mapped_glyph(&data, 'a'), Some(font.gid("a")));
        assert_eq!(
            font_ref.gsub().unwrap().feature_list().unwrap().feature_count(),
            3
        );
    }

    #[test]
    fn names_are_written() {
        let data = substitution_test().build();
        assert_eq!(name_strings(&data, 6), vec!["SubstitutionTest-Regular"]);
    }
}
