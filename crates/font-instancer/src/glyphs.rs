//! Applying gvar deltas to individual glyphs.

use std::iter::repeat_n;

use kurbo::{Affine, Point, Rect, Vec2};
use read_fonts::{
    tables::{
        glyf::{
            Anchor as ReadAnchor, Component as ReadComponent, CompositeGlyph as ReadComposite,
            CompositeGlyphFlags, CurvePoint, Glyf, Glyph, SimpleGlyph as ReadSimple,
        },
        gvar::{GlyphDelta as ReadDelta, Gvar},
        loca::Loca,
        variations::TupleVariation,
    },
    types::{F2Dot14, GlyphId},
};
use write_fonts::tables::{
    glyf::{
        Anchor, Bbox, Component, ComponentFlags, CompositeGlyph, Contour, Glyph as WriteGlyph,
        SimpleGlyph, Transform,
    },
    gvar::{GlyphDelta, GlyphDeltas, GlyphVariations, Tent},
};

use crate::error::Result;

/// Left and right side bearing, top and bottom origin.
const PHANTOM_POINTS: usize = 4;

pub(crate) fn clamp_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

fn round_i16(value: f64) -> i16 {
    clamp_i16(value.round() as i32)
}

/// A glyph at a new default location.
pub(crate) struct InstancedGlyph {
    pub(crate) glyph: WriteGlyph,
    /// Horizontal advance change, from the phantom points.
    pub(crate) advance_delta: i32,
}

enum Shape<'a> {
    Empty,
    Simple {
        glyph: ReadSimple<'a>,
        ends: Vec<usize>,
        on_curve: Vec<bool>,
    },
    Composite {
        glyph: ReadComposite<'a>,
        components: Vec<ReadComponent>,
    },
}

/// A glyph as stored. `points` holds outline points or component offsets,
/// then the phantom points.
struct Source<'a> {
    shape: Shape<'a>,
    points: Vec<Point>,
}

impl Source<'_> {
    /// Every point's delta for one tuple, unscaled. Simple glyphs infer the
    /// points a sparse tuple leaves out from the stored outline.
    fn deltas(&self, tuple: &TupleVariation<'_, ReadDelta>) -> Vec<Vec2> {
        let mut deltas = vec![Vec2::ZERO; self.points.len()];
        let mut touched = vec![false; self.points.len()];
        for delta in tuple.deltas() {
            let index = delta.position as usize;
            if let Some(slot) = deltas.get_mut(index) {
                *slot = Vec2::new(f64::from(delta.x_delta), f64::from(delta.y_delta));
                touched[index] = true;
            }
        }

        if let Shape::Simple { ends, .. } = &self.shape
            && !tuple.has_deltas_for_all_points()
        {
            let mut start = 0;
            for &end in ends {
                interpolate_contour(&mut deltas, &touched, &self.points, start, end);
                start = end + 1;
            }
        }
        deltas
    }

    /// The glyph with `moved` added to its points. Coordinates are rounded
    /// here and nowhere else.
    fn build(&self, moved: &[Vec2]) -> InstancedGlyph {
        let at = |i: usize| self.points[i] + moved[i];
        let phantom = self.points.len() - PHANTOM_POINTS;
        let advance_delta = (moved[phantom + 1].x - moved[phantom].x).round() as i32;

        let glyph = match &self.shape {
            Shape::Empty => WriteGlyph::Empty,
            Shape::Simple {
                glyph,
                ends,
                on_curve,
            } => {
                let mut contours = Vec::with_capacity(ends.len());
                let mut start = 0;
                for &end in ends {
                    if end < start {
                        continue;
                    }
                    let contour: Vec<CurvePoint> = (start..=end)
                        .map(|i| {
                            let p = at(i);
                            CurvePoint::new(round_i16(p.x), round_i16(p.y), on_curve[i])
                        })
                        .collect();
                    contours.push(Contour::from(contour));
                    start = end + 1;
                }
                let mut simple = SimpleGlyph {
                    bbox: Bbox::default(),
                    contours,
                    instructions: glyph.instructions().to_vec(),
                };
                simple.recompute_bounding_box();
                WriteGlyph::Simple(simple)
            }
            Shape::Composite { glyph, components } => {
                composite(glyph, components, (0..components.len()).map(at))
            }
        };
        InstancedGlyph {
            glyph,
            advance_delta,
        }
    }
}

/// Composite deltas move component offsets. The bounding box is a
/// placeholder until [`resolve_composite_bounds`] runs.
fn composite(
    glyph: &ReadComposite,
    components: &[ReadComponent],
    offsets: impl Iterator<Item = Point>,
) -> WriteGlyph {
    let mut rebuilt = components
        .iter()
        .zip(offsets)
        .map(|(component, offset)| rebuild_component(component, offset));
    let Some(first) = rebuilt.next() else {
        return WriteGlyph::Empty;
    };
    let placeholder = Rect::new(
        f64::from(glyph.x_min()),
        f64::from(glyph.y_min()),
        f64::from(glyph.x_max()),
        f64::from(glyph.y_max()),
    );
    let mut composite = CompositeGlyph::new(first, placeholder);
    for component in rebuilt {
        composite.add_component(component, Rect::ZERO);
    }
    WriteGlyph::Composite(composite)
}

fn accumulate(moved: &mut [Vec2], deltas: &[Vec2], scalar: f32) {
    let scalar = f64::from(scalar);
    for (total, delta) in moved.iter_mut().zip(deltas) {
        *total += *delta * scalar;
    }
}

/// Builds glyphs for a new default location out of glyf and gvar.
pub(crate) struct GlyphInstancer<'a> {
    glyf: Glyf<'a>,
    loca: Loca<'a>,
    gvar: Gvar<'a>,
}

impl<'a> GlyphInstancer<'a> {
    pub(crate) fn new(glyf: Glyf<'a>, loca: Loca<'a>, gvar: Gvar<'a>) -> Self {
        Self { glyf, loca, gvar }
    }

    fn source(&self, gid: GlyphId) -> Result<Source<'a>> {
        let (shape, mut points) = match self.loca.get_glyf(gid, &self.glyf)? {
            Some(Glyph::Simple(glyph)) if glyph.num_points() > 0 => {
                let (points, on_curve): (Vec<Point>, Vec<bool>) = glyph
                    .points()
                    .map(|p| (Point::new(f64::from(p.x), f64::from(p.y)), p.on_curve))
                    .unzip();
                let ends = glyph
                    .end_pts_of_contours()
                    .iter()
                    .map(|end| end.get() as usize)
                    .take_while(|&end| end < points.len())
                    .collect();
                let shape = Shape::Simple {
                    glyph,
                    ends,
                    on_curve,
                };
                (shape, points)
            }
            Some(Glyph::Composite(glyph)) => {
                let components: Vec<ReadComponent> = glyph.components().collect();
                let offsets = components
                    .iter()
                    .map(|c| match c.anchor {
                        ReadAnchor::Offset { x, y } => Point::new(f64::from(x), f64::from(y)),
                        ReadAnchor::Point { .. } => Point::ZERO,
                    })
                    .collect();
                (Shape::Composite { glyph, components }, offsets)
            }
            _ => (Shape::Empty, Vec::new()),
        };
        points.extend(repeat_n(Point::ZERO, PHANTOM_POINTS));
        Ok(Source { shape, points })
    }

    fn tuples(&self, gid: GlyphId) -> Vec<TupleVariation<'a, ReadDelta>> {
        self.gvar
            .glyph_variation_data(gid)
            .ok()
            .flatten()
            .map(|data| data.tuples().collect())
            .unwrap_or_default()
    }

    /// The glyph at normalized `coords`.
    pub(crate) fn instance(&self, gid: GlyphId, coords: &[F2Dot14]) -> Result<InstancedGlyph> {
        let source = self.source(gid)?;
        let mut moved = vec![Vec2::ZERO; source.points.len()];
        for tuple in self.tuples(gid) {
            if let Some(scalar) = tuple.compute_scalar_f32(coords) {
                accumulate(&mut moved, &source.deltas(&tuple), scalar);
            }
        }
        Ok(source.build(&moved))
    }

    /// Pins every axis outside `variable` at its value in `coords`.
    ///
    /// Tuples that only involve pinned axes fold into the outline. The others
    /// lose their pinned axes, are scaled by what those axes contributed, and
    /// carry a delta for every point.
    pub(crate) fn partial(
        &self,
        gid: GlyphId,
        coords: &[F2Dot14],
        variable: &[usize],
    ) -> Result<(InstancedGlyph, GlyphVariations)> {
        let source = self.source(gid)?;
        let mut moved = vec![Vec2::ZERO; source.points.len()];
        let mut kept = Vec::new();

        for tuple in self.tuples(gid) {
            let peak = tuple.peak();
            let peak_at = |i: usize| peak.get(i).unwrap_or_default();
            // Variable axes sit at the peak, where they scale by one.
            let probe: Vec<F2Dot14> = coords
                .iter()
                .enumerate()
                .map(|(i, &coord)| if variable.contains(&i) { peak_at(i) } else { coord })
                .collect();
            let Some(scalar) = tuple.compute_scalar_f32(&probe).filter(|s| *s != 0.0) else {
                continue;
            };

            let deltas = source.deltas(&tuple);
            if variable.iter().all(|&i| peak_at(i) == F2Dot14::ZERO) {
                accumulate(&mut moved, &deltas, scalar);
                continue;
            }

            let region = tuple.intermediate_start().zip(tuple.intermediate_end());
            let tents = variable
                .iter()
                .map(|&i| {
                    let intermediate = region.as_ref().map(|(start, end)| {
                        (start.get(i).unwrap_or_default(), end.get(i).unwrap_or_default())
                    });
                    Tent::new(peak_at(i), intermediate)
                })
                .collect();
            let scaled = deltas
                .iter()
                .map(|d| {
                    let d = *d * f64::from(scalar);
                    GlyphDelta::required(round_i16(d.x), round_i16(d.y))
                })
                .collect();
            kept.push(GlyphDeltas::new(tents, scaled));
        }

        Ok((source.build(&moved), GlyphVariations::new(gid, kept)))
    }
}

fn rebuild_component(component: &ReadComponent, offset: Point) -> Component {
    let anchor = match component.anchor {
        ReadAnchor::Offset { .. } => Anchor::Offset {
            x: round_i16(offset.x),
            y: round_i16(offset.y),
        },
        ReadAnchor::Point { base, component } => Anchor::Point { base, component },
    };
    let t = component.transform;
    let transform = Transform {
        xx: t.xx,
        yx: t.yx,
        xy: t.xy,
        yy: t.yy,
    };
    let flags = component.flags;
    let flags = ComponentFlags {
        round_xy_to_grid: flags.contains(CompositeGlyphFlags::ROUND_XY_TO_GRID),
        use_my_metrics: flags.contains(CompositeGlyphFlags::USE_MY_METRICS),
        scaled_component_offset: flags.contains(CompositeGlyphFlags::SCALED_COMPONENT_OFFSET),
        unscaled_component_offset: flags.contains(CompositeGlyphFlags::UNSCALED_COMPONENT_OFFSET),
        overlap_compound: flags.contains(CompositeGlyphFlags::OVERLAP_COMPOUND),
    };
    Component::new(component.glyph, anchor, transform, flags)
}

/// Shifts untouched points of one contour between their touched neighbours.
///
/// A contour with a single touched point moves rigidly with it; a contour
/// with none is left alone.
fn interpolate_contour(
    deltas: &mut [Vec2],
    touched: &[bool],
    points: &[Point],
    start: usize,
    end: usize,
) {
    if start > end {
        return;
    }
    let next = |i: usize| if i == end { start } else { i + 1 };
    let anchors: Vec<usize> = (start..=end).filter(|&i| touched[i]).collect();

    match anchors.as_slice() {
        [] => {}
        [only] => {
            let delta = deltas[*only];
            deltas[start..=end].fill(delta);
        }
        _ => {
            for (k, &from) in anchors.iter().enumerate() {
                let to = anchors[(k + 1) % anchors.len()];
                let (p1, p2) = (points[from], points[to]);
                let (d1, d2) = (deltas[from], deltas[to]);
                let mut i = next(from);
                while i != to {
                    let p = points[i];
                    deltas[i] = Vec2::new(
                        interpolate(p1.x, p2.x, p.x, d1.x, d2.x),
                        interpolate(p1.y, p2.y, p.y, d1.y, d2.y),
                    );
                    i = next(i);
                }
            }
        }
    }
}

fn interpolate(c1: f64, c2: f64, c: f64, d1: f64, d2: f64) -> f64 {
    if c1 == c2 {
        return if d1 == d2 { d1 } else { 0.0 };
    }
    let (c1, c2, d1, d2) = if c1 > c2 { (c2, c1, d2, d1) } else { (c1, c2, d1, d2) };
    if c <= c1 {
        d1
    } else if c >= c2 {
        d2
    } else {
        d1 + (c - c1) / (c2 - c1) * (d2 - d1)
    }
}

pub(crate) fn glyph_bbox(glyph: &WriteGlyph) -> Option<Bbox> {
    match glyph {
        WriteGlyph::Simple(simple) => Some(simple.bbox),
        WriteGlyph::Composite(composite) => Some(composite.bbox),
        WriteGlyph::Empty => None,
    }
}

fn is_zero(bbox: &Bbox) -> bool {
    bbox.x_min == 0 && bbox.y_min == 0 && bbox.x_max == 0 && bbox.y_max == 0
}

#[derive(Debug, Clone, Copy)]
enum Extent {
    Pending,
    Empty,
    Known(Bbox),
}

/// Recomputes composite bounding boxes from their instanced components.
///
/// Nested composites resolve over several passes; a composite that refers
/// to itself keeps its placeholder box.
pub(crate) fn resolve_composite_bounds(glyphs: &mut [WriteGlyph]) {
    let mut extents: Vec<Extent> = glyphs
        .iter()
        .map(|glyph| match glyph {
            WriteGlyph::Simple(simple) => Extent::Known(simple.bbox),
            WriteGlyph::Composite(_) => Extent::Pending,
            WriteGlyph::Empty => Extent::Empty,
        })
        .collect();

    loop {
        let mut progressed = false;
        for (gid, glyph) in glyphs.iter_mut().enumerate() {
            if !matches!(extents[gid], Extent::Pending) {
                continue;
            }
            let WriteGlyph::Composite(composite) = glyph else {
                continue;
            };
            if let Some(extent) = composite_extent(composite, &extents) {
                composite.bbox = match extent {
                    Extent::Known(bbox) => bbox,
                    _ => Bbox::default(),
                };
                extents[gid] = extent;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
}

/// `None` while some component is still pending.
fn composite_extent(composite: &CompositeGlyph, extents: &[Extent]) -> Option<Extent> {
    let mut union: Option<Rect> = None;
    for component in composite.components() {
        let bbox = match extents.get(component.glyph.to_u32() as usize) {
            Some(Extent::Pending) => return None,
            Some(Extent::Known(bbox)) if !is_zero(bbox) => *bbox,
            _ => continue,
        };
        let (dx, dy) = match component.anchor {
            Anchor::Offset { x, y } => (f64::from(x), f64::from(y)),
            Anchor::Point { .. } => (0.0, 0.0),
        };
        let t = &component.transform;
        let affine = Affine::new([
            f64::from(t.xx.to_f32()),
            f64::from(t.yx.to_f32()),
            f64::from(t.xy.to_f32()),
            f64::from(t.yy.to_f32()),
            dx,
            dy,
        ]);
        let rect = affine.transform_rect_bbox(Rect::new(
            f64::from(bbox.x_min),
            f64::from(bbox.y_min),
            f64::from(bbox.x_max),
            f64::from(bbox.y_max),
        ));
        union = Some(union.map_or(rect, |u| u.union(rect)));
    }

    Some(match union {
        None => Extent::Empty,
        Some(rect) => Extent::Known(Bbox {
            x_min: clamp_i16(rect.x0.round() as i32),
            y_min: clamp_i16(rect.y0.round() as i32),
            x_max: clamp_i16(rect.x1.round() as i32),
            y_max: clamp_i16(rect.y1.round() as i32),
        }),
    })
}
