//! Variable font instantiation.

use log::{debug, info};
use read_fonts::{
    FontRef, TableProvider,
    tables::{fvar::Fvar, glyf::Glyf, gvar::Gvar, loca::Loca},
    types::{F2Dot14, Fixed, GlyphId, MajorMinor, Tag},
};
use write_fonts::{
    FontBuilder,
    tables::{glyf::GlyfLocaBuilder, gvar::Gvar as WriteGvar},
};

use crate::{
    AxisLocation,
    axes::{build_avar, build_fvar},
    error::{Error, Result},
    glyphs::{GlyphInstancer, InstancedGlyph, glyph_bbox, resolve_composite_bounds},
    limits::AxisLimits,
    location::{Subspace, resolve_subspace},
    metrics::{
        FontBounds, MetricDeltas, build_head, build_hhea, build_hmtx, build_os2, build_post,
        build_stat,
    },
};

/// Tables that only make sense in a variable font.
const VARIATION_TABLES: [Tag; 7] = [
    Tag::new(b"fvar"),
    Tag::new(b"gvar"),
    Tag::new(b"avar"),
    Tag::new(b"cvar"),
    Tag::new(b"HVAR"),
    Tag::new(b"MVAR"),
    Tag::new(b"VVAR"),
];

/// Variation tables that would need their axes rewritten once an axis is
/// pinned. Advances keep varying through the gvar phantom points.
const PINNED_AWAY_TABLES: [Tag; 4] = [
    Tag::new(b"cvar"),
    Tag::new(b"HVAR"),
    Tag::new(b"MVAR"),
    Tag::new(b"VVAR"),
];

/// A signature no longer matches the rewritten font.
const DSIG: Tag = Tag::new(b"DSIG");

const AVAR: Tag = Tag::new(b"avar");

/// Instantiate a variable font at `limits`.
///
/// When every axis ends up pinned the result is a static font. Otherwise
/// pinned axes leave fvar and gvar, narrowed axes get their new range and an
/// avar map back into the old one, and unlimited axes stay as they are.
///
/// # Errors
///
/// - `Error::NotVariableFont` if the font has no fvar table
/// - `Error::NoCff2Support` if the font uses CFF outlines (no glyf table)
/// - `Error::NoGvar` if the font has no gvar table
/// - `Error::AxisNotFound`, `Error::InvalidAxisValue` and
///   `Error::DefaultMoved` when the limits don't fit the font's axes
/// - `Error::PartialInstancingUnsupported` for an avar version 2 font that
///   stays variable, or GDEF variations when only some axes are pinned
pub fn instantiate(data: &[u8], limits: &AxisLimits) -> Result<Vec<u8>> {
    let source = VariableFont::new(data)?;
    let subspace = resolve_subspace(&source.font, limits)?;
    if subspace.is_static() {
        source.instance(&subspace.pinned())
    } else {
        source.limit(&subspace)
    }
}

struct VariableFont<'a> {
    font: FontRef<'a>,
    fvar: Fvar<'a>,
    glyf: Glyf<'a>,
    loca: Loca<'a>,
    gvar: Gvar<'a>,
}

impl<'a> VariableFont<'a> {
    fn new(data: &'a [u8]) -> Result<Self> {
        let font = FontRef::new(data)?;
        let fvar = font.fvar().map_err(|_| Error::NotVariableFont)?;
        let glyf = font.glyf().map_err(|_| Error::NoCff2Support)?;
        let loca = font.loca(None).map_err(|_| Error::NoCff2Support)?;
        let gvar = font.gvar().map_err(|_| Error::NoGvar)?;
        Ok(Self {
            font,
            fvar,
            glyf,
            loca,
            gvar,
        })
    }

    fn normalize(&self, location: &[AxisLocation]) -> Vec<F2Dot14> {
        let mut coords = vec![F2Dot14::default(); self.fvar.axis_count() as usize];
        let user = location
            .iter()
            .map(|axis| (axis.tag, Fixed::from_f64(f64::from(axis.value))));
        self.fvar
            .user_to_normalized(self.font.avar().ok().as_ref(), user, &mut coords);
        coords
    }

    fn glyph_instancer(&self) -> GlyphInstancer<'a> {
        GlyphInstancer::new(self.glyf.clone(), self.loca.clone(), self.gvar.clone())
    }

    fn num_glyphs(&self) -> Result<u32> {
        Ok(u32::from(self.font.maxp()?.num_glyphs()))
    }

    fn instance(&self, location: &[AxisLocation]) -> Result<Vec<u8>> {
        let coords = self.normalize(location);
        debug!("normalized location {coords:?}");

        let instancer = self.glyph_instancer();
        let glyphs = (0..self.num_glyphs()?)
            .map(|gid| instancer.instance(GlyphId::new(gid), &coords))
            .collect::<Result<Vec<_>>>()?;

        let mut builder = FontBuilder::new();
        self.add_outline_tables(&mut builder, glyphs, &coords, location)?;
        builder.add_table(&build_stat(&self.fvar, location))?;
        self.copy_remaining(&mut builder, |tag| VARIATION_TABLES.contains(&tag));

        info!("instanced at {}", summary(location));
        Ok(builder.build())
    }

    /// A font that stays variable over `subspace`.
    fn limit(&self, subspace: &Subspace) -> Result<Vec<u8>> {
        let avar = self.font.avar().ok();
        if avar
            .as_ref()
            .is_some_and(|avar| avar.version() != MajorMinor::VERSION_1_0)
        {
            return Err(Error::PartialInstancingUnsupported("avar version 2".into()));
        }

        let mut builder = FontBuilder::new();
        builder.add_table(&build_fvar(&self.fvar, subspace)?)?;
        // Without a map the avar table is left out; copying the old one
        // would remap the new ranges.
        if let Some(avar) = build_avar(&self.fvar, avar.as_ref(), subspace)? {
            builder.add_table(&avar)?;
        }

        let pinned = subspace.pinned();
        if pinned.is_empty() {
            self.copy_remaining(&mut builder, |tag| tag == AVAR);
        } else {
            self.pin_some(&mut builder, subspace, &pinned)?;
            self.copy_remaining(&mut builder, |tag| {
                tag == AVAR || PINNED_AWAY_TABLES.contains(&tag)
            });
        }

        info!(
            "limited to {}",
            subspace
                .axes()
                .iter()
                .map(|(tag, placement)| format!("{tag} {placement:?}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(builder.build())
    }

    /// Moves the default to the pinned location and rebuilds gvar over the
    /// axes that stay.
    fn pin_some(
        &self,
        builder: &mut FontBuilder<'a>,
        subspace: &Subspace,
        pinned: &[AxisLocation],
    ) -> Result<()> {
        if self
            .font
            .gdef()
            .is_ok_and(|gdef| gdef.item_var_store().is_some())
        {
            return Err(Error::PartialInstancingUnsupported("GDEF variations".into()));
        }

        let coords = self.normalize(pinned);
        let variable = subspace.variable_indices();
        debug!("pinning {coords:?}, keeping axes {variable:?}");

        let instancer = self.glyph_instancer();
        let mut glyphs = Vec::new();
        let mut variations = Vec::new();
        for gid in 0..self.num_glyphs()? {
            let (glyph, deltas) = instancer.partial(GlyphId::new(gid), &coords, &variable)?;
            glyphs.push(glyph);
            variations.push(deltas);
        }

        builder.add_table(&WriteGvar::new(variations, variable.len() as u16)?)?;
        self.add_outline_tables(builder, glyphs, &coords, pinned)
    }

    /// glyf, loca and hmtx for `glyphs`, and the font-wide tables that
    /// follow from them.
    fn add_outline_tables(
        &self,
        builder: &mut FontBuilder<'a>,
        glyphs: Vec<InstancedGlyph>,
        coords: &[F2Dot14],
        location: &[AxisLocation],
    ) -> Result<()> {
        let font = &self.font;
        let hmtx = font.hmtx()?;
        let num_h_metrics = font.hhea()?.number_of_h_metrics() as usize;

        let mut outlines = Vec::with_capacity(glyphs.len());
        let mut advances = Vec::with_capacity(glyphs.len());
        let mut side_bearings = Vec::with_capacity(glyphs.len());
        for (gid, instanced) in glyphs.into_iter().enumerate() {
            let gid = GlyphId::new(gid as u32);
            let advance = i32::from(hmtx.advance(gid).unwrap_or(0)) + instanced.advance_delta;
            advances.push(advance.clamp(0, i32::from(u16::MAX)) as u16);
            side_bearings.push(hmtx.side_bearing(gid).unwrap_or(0));
            outlines.push(instanced.glyph);
        }
        resolve_composite_bounds(&mut outlines);

        let mut glyf_builder = GlyfLocaBuilder::new();
        let mut bounds = FontBounds::default();
        for ((glyph, advance), lsb) in outlines.iter().zip(&advances).zip(side_bearings.iter_mut()) {
            let bbox = glyph_bbox(glyph);
            // The side bearing follows the instanced outline.
            if let Some(bbox) = bbox {
                *lsb = bbox.x_min;
            }
            bounds.add(bbox, *advance);
            glyf_builder.add_glyph(glyph)?;
        }
        let (glyf, loca, loca_format) = glyf_builder.build();

        let deltas = MetricDeltas::new(font.mvar().ok(), coords);
        builder.add_table(&glyf)?;
        builder.add_table(&loca)?;
        builder.add_table(&build_hmtx(&advances, &side_bearings, num_h_metrics))?;
        if let Ok(head) = font.head() {
            builder.add_table(&build_head(&head, &bounds, loca_format))?;
        }
        if let Ok(hhea) = font.hhea() {
            builder.add_table(&build_hhea(&hhea, &bounds, &deltas))?;
        }
        if let Ok(os2) = font.os2() {
            builder.add_table(&build_os2(&os2, &deltas, location))?;
        }
        if let Ok(post) = font.post() {
            builder.add_table(&build_post(&post, &deltas))?;
        }
        debug!("rebuilt {} glyphs", outlines.len());
        Ok(())
    }

    /// Copies every table not yet built, except DSIG and those `skip` names.
    fn copy_remaining(&self, builder: &mut FontBuilder<'a>, skip: impl Fn(Tag) -> bool) {
        for record in self.font.table_directory.table_records() {
            let tag = record.tag();
            if builder.contains(tag) || tag == DSIG || skip(tag) {
                continue;
            }
            if let Some(data) = self.font.table_data(tag) {
                builder.add_raw(tag, data);
            }
        }
    }
}

fn summary(location: &[AxisLocation]) -> String {
    location
        .iter()
        .map(|axis| format!("{}={}", axis.tag, axis.value))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use read_fonts::tables::glyf::Glyph;
    use upsetter_test_fonts::variable_test;

    use super::*;

    fn limits(s: &str) -> AxisLimits {
        s.parse().unwrap()
    }

    fn glyph_points(font: &FontRef, gid: u32) -> Option<Vec<(i16, i16)>> {
        let glyf = font.glyf().ok()?;
        let loca = font.loca(None).ok()?;
        match loca.get_glyf(GlyphId::new(gid), &glyf).ok()?? {
            Glyph::Simple(simple) => Some(simple.points().map(|p| (p.x, p.y)).collect()),
            Glyph::Composite(_) => None,
        }
    }

    fn advance(font: &FontRef, gid: u32) -> Option<u16> {
        font.hmtx().ok()?.advance(GlyphId::new(gid))
    }

    #[test]
    fn instance_drops_variation_tables() {
        let result = instantiate(font_test_data::VAZIRMATN_VAR, &limits("wght=400")).unwrap();

        let output = FontRef::new(&result).unwrap();
        assert!(output.fvar().is_err());
        assert!(output.gvar().is_err());
        assert!(output.avar().is_err());
        assert!(output.glyf().is_ok());
        assert!(output.hmtx().is_ok());
        assert!(output.stat().is_ok());
    }

    #[test]
    fn drop_matches_default_pin() {
        let dropped = instantiate(font_test_data::VAZIRMATN_VAR, &limits("wght=drop")).unwrap();
        let pinned = instantiate(font_test_data::VAZIRMATN_VAR, &limits("wght=400")).unwrap();
        assert_eq!(dropped, pinned);
    }

    #[test]
    fn preserves_glyph_count() {
        let data = font_test_data::VAZIRMATN_VAR;
        let before = FontRef::new(data).unwrap().maxp().unwrap().num_glyphs();

        let result = instantiate(data, &limits("wght=700")).unwrap();
        let after = FontRef::new(&result).unwrap().maxp().unwrap().num_glyphs();
        assert_eq!(before, after);
    }

    #[test]
    fn extremes_differ() {
        let data = font_test_data::VAZIRMATN_VAR;
        let thin = instantiate(data, &limits("wght=100")).unwrap();
        let black = instantiate(data, &limits("wght=900")).unwrap();
        let thin = FontRef::new(&thin).unwrap();
        let black = FontRef::new(&black).unwrap();

        let (a, b) = (glyph_points(&thin, 1).unwrap(), glyph_points(&black, 1).unwrap());
        assert_eq!(a.len(), b.len());
        assert_ne!(a, b);
        assert_ne!(advance(&thin, 1), advance(&black, 1));
    }

    #[test]
    fn weight_class_follows_wght() {
        let result = instantiate(font_test_data::VAZIRMATN_VAR, &limits("wght=700")).unwrap();
        let os2 = FontRef::new(&result).unwrap().os2().unwrap();
        assert_eq!(os2.us_weight_class(), 700);
    }

    #[test]
    fn lsb_equals_glyph_xmin() {
        let result = instantiate(font_test_data::VAZIRMATN_VAR, &limits("wght=500")).unwrap();
        let font = FontRef::new(&result).unwrap();
        let hmtx = font.hmtx().unwrap();

        for gid in 1..font.maxp().unwrap().num_glyphs().min(20) {
            let Some(points) = glyph_points(&font, gid.into()) else {
                continue;
            };
            let Some(x_min) = points.iter().map(|p| p.0).min() else {
                continue;
            };
            let lsb = hmtx.side_bearing(GlyphId::new(gid.into())).unwrap_or(0);
            assert_eq!(lsb, x_min, "glyph {gid}");
        }
    }

    #[test]
    fn rejects_cff_font() {
        let result = instantiate(font_test_data::CANTARELL_VF_TRIMMED, &limits("wght=700"));
        assert!(matches!(result, Err(Error::NoCff2Support)));
    }

    #[test]
    fn rejects_non_variable_font() {
        let result = instantiate(font_test_data::SIMPLE_GLYF, &limits("wght=400"));
        assert!(matches!(result, Err(Error::NotVariableFont)));
    }

    #[test]
    fn unlimited_axes_keep_the_font_variable() {
        let data = font_test_data::VAZIRMATN_VAR;
        let result = instantiate(data, &AxisLimits::new()).unwrap();
        let output = FontRef::new(&result).unwrap();
        assert!(output.gvar().is_ok());
        assert_eq!(output.fvar().unwrap().axis_count(), 1);
        assert_eq!(
            glyph_points(&output, 1),
            glyph_points(&FontRef::new(data).unwrap(), 1)
        );
    }

    #[test]
    fn ranges_narrow_fvar() {
        let result = instantiate(font_test_data::VAZIRMATN_VAR, &limits("wght=300:700")).unwrap();
        let output = FontRef::new(&result).unwrap();
        let fvar = output.fvar().unwrap();
        let axis = &fvar.axes().unwrap()[0];
        assert_eq!(axis.min_value().to_f64(), 300.0);
        assert_eq!(axis.max_value().to_f64(), 700.0);
        assert!(output.gvar().is_ok());
        assert!(output.avar().is_ok());
    }

    #[test]
    fn narrowed_fonts_instance_like_the_original() {
        let data = font_test_data::VAZIRMATN_VAR;
        let narrowed = instantiate(data, &limits("wght=300:700")).unwrap();
        for wght in ["wght=300", "wght=600", "wght=700"] {
            let from_narrow = instantiate(&narrowed, &limits(wght)).unwrap();
            let from_original = instantiate(data, &limits(wght)).unwrap();
            let a = glyph_points(&FontRef::new(&from_narrow).unwrap(), 1).unwrap();
            let b = glyph_points(&FontRef::new(&from_original).unwrap(), 1).unwrap();
            assert_eq!(a.len(), b.len());
            for (p, q) in a.iter().zip(&b) {
                assert!(
                    (p.0 - q.0).abs() <= 1 && (p.1 - q.1).abs() <= 1,
                    "{wght}: {p:?} vs {q:?}"
                );
            }
        }
    }

    #[test]
    fn pinning_one_axis_keeps_the_other() {
        let result = instantiate(&variable_test(), &limits("wght=900")).unwrap();
        let output = FontRef::new(&result).unwrap();

        let fvar = output.fvar().unwrap();
        let axes = fvar.axes().unwrap();
        assert_eq!(axes.len(), 1);
        assert_eq!(axes[0].axis_tag(), Tag::new(b"wdth"));
        let instances = fvar
            .instances()
            .unwrap()
            .iter()
            .map(|instance| instance.unwrap().subfamily_name_id.to_u16())
            .collect::<Vec<_>>();
        assert_eq!(instances, vec![259, 260]);

        assert_eq!(output.gvar().unwrap().axis_count(), 1);
        assert_eq!(
            glyph_points(&output, 1).unwrap(),
            vec![(0, 0), (600, 0), (600, 700), (0, 700)]
        );
        assert_eq!(advance(&output, 1), Some(600));
    }

    #[test]
    fn pinning_in_steps_matches_pinning_at_once() {
        let data = variable_test();
        let partial = instantiate(&data, &limits("wght=650")).unwrap();
        let stepwise = instantiate(&partial, &limits("wdth=150")).unwrap();
        let at_once = instantiate(&data, &limits("wght=650,wdth=150")).unwrap();

        let stepwise = FontRef::new(&stepwise).unwrap();
        let at_once = FontRef::new(&at_once).unwrap();
        let expected = vec![(0, 5), (575, 5), (575, 705), (0, 705)];
        assert_eq!(glyph_points(&at_once, 1).unwrap(), expected);
        assert_eq!(glyph_points(&stepwise, 1).unwrap(), expected);
        assert_eq!(advance(&stepwise, 1), Some(575));
        assert_eq!(advance(&at_once, 1), Some(575));
    }

    #[test]
    fn ranges_must_keep_the_default() {
        let result = instantiate(&variable_test(), &limits("wdth=150:200"));
        assert!(matches!(result, Err(Error::DefaultMoved { .. })));
    }
}
