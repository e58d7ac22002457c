//! Font-wide tables recomputed for a static instance.

use read_fonts::{
    tables::{
        fvar::Fvar,
        head::Head,
        hhea::Hhea,
        mvar::{Mvar, tags as mvar_tags},
        os2::Os2,
        post::Post,
    },
    types::{F2Dot14, Fixed, Tag},
};
use write_fonts::{
    from_obj::ToOwnedTable,
    tables::{
        glyf::Bbox,
        head::Head as WriteHead,
        hhea::Hhea as WriteHhea,
        hmtx::{Hmtx, LongMetric},
        loca::LocaFormat,
        os2::Os2 as WriteOs2,
        post::Post as WritePost,
        stat::{AxisRecord, AxisValue, AxisValueTableFlags, Stat},
    },
    types::NameId,
};

use crate::{AxisLocation, glyphs::clamp_i16};

/// Extremes over every inked glyph.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FontBounds {
    bbox: Option<Bbox>,
    min_left_side_bearing: Option<i16>,
    min_right_side_bearing: Option<i16>,
    x_max_extent: Option<i16>,
    advance_width_max: u16,
}

impl FontBounds {
    pub(crate) fn add(&mut self, bbox: Option<Bbox>, advance: u16) {
        self.advance_width_max = self.advance_width_max.max(advance);
        let Some(bbox) = bbox.filter(|b| (b.x_min, b.y_min, b.x_max, b.y_max) != (0, 0, 0, 0))
        else {
            return;
        };

        self.bbox = Some(match self.bbox {
            None => bbox,
            Some(acc) => Bbox {
                x_min: acc.x_min.min(bbox.x_min),
                y_min: acc.y_min.min(bbox.y_min),
                x_max: acc.x_max.max(bbox.x_max),
                y_max: acc.y_max.max(bbox.y_max),
            },
        });

        let width = bbox.x_max.saturating_sub(bbox.x_min);
        let lsb = bbox.x_min;
        let rsb = clamp_i16(i32::from(advance)).saturating_sub(lsb).saturating_sub(width);
        let extent = lsb.saturating_add(width);
        self.min_left_side_bearing = Some(self.min_left_side_bearing.map_or(lsb, |v| v.min(lsb)));
        self.min_right_side_bearing = Some(self.min_right_side_bearing.map_or(rsb, |v| v.min(rsb)));
        self.x_max_extent = Some(self.x_max_extent.map_or(extent, |v| v.max(extent)));
    }

    pub(crate) fn bbox(&self) -> Bbox {
        self.bbox.unwrap_or_default()
    }
}

/// MVAR deltas at one location; a font without MVAR yields zero deltas.
pub(crate) struct MetricDeltas<'a> {
    mvar: Option<Mvar<'a>>,
    coords: &'a [F2Dot14],
}

impl<'a> MetricDeltas<'a> {
    pub(crate) fn new(mvar: Option<Mvar<'a>>, coords: &'a [F2Dot14]) -> Self {
        Self { mvar, coords }
    }

    fn delta(&self, tag: Tag) -> i32 {
        self.mvar
            .as_ref()
            .and_then(|mvar| mvar.metric_delta(tag, self.coords).ok())
            .map_or(0, |delta| delta.to_i32())
    }

    fn apply(&self, tag: Tag, value: i16) -> i16 {
        clamp_i16(i32::from(value) + self.delta(tag))
    }
}

pub(crate) fn build_hmtx(advances: &[u16], lsbs: &[i16], num_h_metrics: usize) -> Hmtx {
    let split = num_h_metrics.min(advances.len());
    let h_metrics = advances[..split]
        .iter()
        .zip(lsbs)
        .map(|(&advance, &side_bearing)| LongMetric {
            advance,
            side_bearing,
        })
        .collect();
    Hmtx {
        h_metrics,
        left_side_bearings: lsbs[split..].to_vec(),
    }
}

pub(crate) fn build_head(original: &Head, bounds: &FontBounds, loca_format: LocaFormat) -> WriteHead {
    let mut head: WriteHead = original.to_owned_table();
    let bbox = bounds.bbox();
    head.x_min = bbox.x_min;
    head.y_min = bbox.y_min;
    head.x_max = bbox.x_max;
    head.y_max = bbox.y_max;
    head.index_to_loc_format = match loca_format {
        LocaFormat::Short => 0,
        LocaFormat::Long => 1,
    };
    head
}

pub(crate) fn build_hhea(original: &Hhea, bounds: &FontBounds, deltas: &MetricDeltas) -> WriteHhea {
    let mut hhea: WriteHhea = original.to_owned_table();
    hhea.ascender = deltas.apply(mvar_tags::HASC, original.ascender().to_i16()).into();
    hhea.descender = deltas.apply(mvar_tags::HDSC, original.descender().to_i16()).into();
    hhea.line_gap = deltas.apply(mvar_tags::HLGP, original.line_gap().to_i16()).into();
    hhea.caret_slope_rise = deltas.apply(mvar_tags::HCRS, original.caret_slope_rise());
    hhea.caret_slope_run = deltas.apply(mvar_tags::HCRN, original.caret_slope_run());
    hhea.caret_offset = deltas.apply(mvar_tags::HCOF, original.caret_offset());
    hhea.advance_width_max = bounds.advance_width_max.into();
    hhea.min_left_side_bearing = bounds.min_left_side_bearing.unwrap_or(0).into();
    hhea.min_right_side_bearing = bounds.min_right_side_bearing.unwrap_or(0).into();
    hhea.x_max_extent = bounds.x_max_extent.unwrap_or(0).into();
    hhea
}

/// usWidthClass for a `wdth` percentage, at the midpoints between classes.
fn width_class(wdth: f32) -> u16 {
    const UPPER_BOUNDS: [f32; 8] = [56.25, 68.75, 81.25, 93.75, 106.25, 118.75, 137.5, 175.0];
    UPPER_BOUNDS
        .iter()
        .position(|&bound| wdth <= bound)
        .map_or(9, |i| i as u16 + 1)
}

pub(crate) fn build_os2(original: &Os2, deltas: &MetricDeltas, location: &[AxisLocation]) -> WriteOs2 {
    let mut os2: WriteOs2 = original.to_owned_table();

    for axis in location {
        match &axis.tag.to_be_bytes() {
            b"wght" => os2.us_weight_class = axis.value.round().clamp(1.0, 1000.0) as u16,
            b"wdth" => os2.us_width_class = width_class(axis.value),
            _ => {}
        }
    }

    os2.y_strikeout_size = deltas.apply(mvar_tags::STRS, original.y_strikeout_size());
    os2.y_strikeout_position = deltas.apply(mvar_tags::STRO, original.y_strikeout_position());
    os2.s_typo_ascender = deltas.apply(mvar_tags::HASC, original.s_typo_ascender());
    os2.s_typo_descender = deltas.apply(mvar_tags::HDSC, original.s_typo_descender());
    os2.s_typo_line_gap = deltas.apply(mvar_tags::HLGP, original.s_typo_line_gap());
    os2.y_subscript_x_offset = deltas.apply(mvar_tags::SBXO, original.y_subscript_x_offset());
    os2.y_subscript_y_offset = deltas.apply(mvar_tags::SBYO, original.y_subscript_y_offset());
    os2.y_subscript_x_size = deltas.apply(mvar_tags::SBXS, original.y_subscript_x_size());
    os2.y_subscript_y_size = deltas.apply(mvar_tags::SBYS, original.y_subscript_y_size());
    os2.y_superscript_x_offset = deltas.apply(mvar_tags::SPXO, original.y_superscript_x_offset());
    os2.y_superscript_y_offset = deltas.apply(mvar_tags::SPYO, original.y_superscript_y_offset());
    os2.y_superscript_x_size = deltas.apply(mvar_tags::SPXS, original.y_superscript_x_size());
    os2.y_superscript_y_size = deltas.apply(mvar_tags::SPYS, original.y_superscript_y_size());
    os2.sx_height = original
        .sx_height()
        .map(|v| deltas.apply(mvar_tags::XHGT, v));
    os2.s_cap_height = original
        .s_cap_height()
        .map(|v| deltas.apply(mvar_tags::CPHT, v));
    os2
}

pub(crate) fn build_post(original: &Post, deltas: &MetricDeltas) -> WritePost {
    let mut post: WritePost = original.to_owned_table();
    post.underline_position = deltas
        .apply(mvar_tags::UNDO, original.underline_position().to_i16())
        .into();
    post.underline_thickness = deltas
        .apply(mvar_tags::UNDS, original.underline_thickness().to_i16())
        .into();
    post
}

/// A STAT describing the pinned location: one design axis per fvar axis
/// and one format 1 value per pinned axis, elidable at the axis default.
pub(crate) fn build_stat(fvar: &Fvar, location: &[AxisLocation]) -> Stat {
    let Ok(arrays) = fvar.axis_instance_arrays() else {
        return Stat::new(vec![], vec![], NameId::new(2));
    };
    let axes = arrays.axes();

    let design_axes = axes
        .iter()
        .enumerate()
        .map(|(i, axis)| AxisRecord::new(axis.axis_tag(), axis.axis_name_id(), i as u16))
        .collect();

    let values = location
        .iter()
        .filter_map(|pinned| {
            let index = axes.iter().position(|a| a.axis_tag() == pinned.tag)?;
            let axis = axes.get(index)?;
            let flags = if pinned.value == axis.default_value().to_f64() as f32 {
                AxisValueTableFlags::ELIDABLE_AXIS_VALUE_NAME
            } else {
                AxisValueTableFlags::empty()
            };
            Some(AxisValue::format_1(
                index as u16,
                flags,
                axis.axis_name_id(),
                Fixed::from_f64(f64::from(pinned.value)),
            ))
        })
        .collect();

    Stat::new(design_axes, values, NameId::new(2))
}
