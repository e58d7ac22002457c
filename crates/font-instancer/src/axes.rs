//! fvar and avar for a font that keeps some of its axes.

use read_fonts::{
    tables::{
        avar::{Avar, SegmentMaps},
        fvar::Fvar,
    },
    types::{F2Dot14, Fixed},
};
use write_fonts::tables::{
    avar::{Avar as WriteAvar, AxisValueMap, SegmentMaps as WriteSegmentMaps},
    fvar::{AxisInstanceArrays, Fvar as WriteFvar, InstanceRecord, VariationAxisRecord},
};

use crate::{
    error::Result,
    location::{AxisPlacement, Subspace},
};

/// The variable axes with their new ranges, and the named instances that
/// still lie inside the subspace.
pub(crate) fn build_fvar(fvar: &Fvar, subspace: &Subspace) -> Result<WriteFvar> {
    let placements = subspace.axes();
    let axes = fvar
        .axes()?
        .iter()
        .zip(placements)
        .filter_map(|(record, (_, placement))| match *placement {
            AxisPlacement::Variable { min, max, .. } => Some(VariationAxisRecord {
                axis_tag: record.axis_tag(),
                min_value: Fixed::from_f64(f64::from(min)),
                default_value: record.default_value(),
                max_value: Fixed::from_f64(f64::from(max)),
                flags: record.flags(),
                axis_name_id: record.axis_name_id(),
            }),
            AxisPlacement::Pinned(_) => None,
        })
        .collect();

    let instances = fvar
        .instances()?
        .iter()
        .filter_map(|instance| instance.ok())
        .filter_map(|instance| {
            let mut coordinates = Vec::with_capacity(instance.coordinates.len());
            for (coord, (_, placement)) in instance.coordinates.iter().zip(placements) {
                let coord = coord.get();
                let value = coord.to_f64() as f32;
                match *placement {
                    AxisPlacement::Pinned(pin) if value != pin => return None,
                    AxisPlacement::Pinned(_) => {}
                    AxisPlacement::Variable { min, max, .. } if !(min..=max).contains(&value) => {
                        return None;
                    }
                    AxisPlacement::Variable { .. } => coordinates.push(coord),
                }
            }
            Some(InstanceRecord {
                subfamily_name_id: instance.subfamily_name_id,
                flags: instance.flags,
                coordinates,
                post_script_name_id: instance.post_script_name_id,
            })
        })
        .collect();

    Ok(WriteFvar {
        axis_instance_arrays: AxisInstanceArrays { axes, instances }.into(),
    })
}

/// avar for the variable axes, `None` when every map would be the identity.
///
/// A narrowed axis normalizes over its new range, so its map sends the new
/// normalized coordinates back to where they were before. gvar and the item
/// variation stores stay valid without touching them.
pub(crate) fn build_avar(
    fvar: &Fvar,
    avar: Option<&Avar>,
    subspace: &Subspace,
) -> Result<Option<WriteAvar>> {
    let maps = avar.map(|avar| avar.axis_segment_maps());
    let mut segment_maps = Vec::new();
    for (i, (record, (_, placement))) in fvar.axes()?.iter().zip(subspace.axes()).enumerate() {
        let AxisPlacement::Variable { min, max, .. } = *placement else {
            continue;
        };
        let original = maps
            .as_ref()
            .and_then(|maps| maps.get(i))
            .transpose()?;
        let axis = (
            record.min_value().to_f64(),
            record.default_value().to_f64(),
            record.max_value().to_f64(),
        );
        segment_maps.push(narrowed_map(
            original.as_ref(),
            axis,
            (f64::from(min), f64::from(max)),
        ));
    }

    if segment_maps.iter().all(WriteSegmentMaps::is_identity) {
        return Ok(None);
    }
    Ok(Some(WriteAvar::new(segment_maps)))
}

/// `axis` is the original `(min, default, max)`, `range` the new
/// `(min, max)` around the same default.
fn narrowed_map(
    original: Option<&SegmentMaps>,
    axis: (f64, f64, f64),
    range: (f64, f64),
) -> WriteSegmentMaps {
    let (lower, default, upper) = axis;
    let below = if default > lower {
        (default - range.0) / (default - lower)
    } else {
        1.0
    };
    let above = if upper > default {
        (range.1 - default) / (upper - default)
    } else {
        1.0
    };
    let widen = |n: f64| if n < 0.0 { n * below } else { n * above };
    let map = |n: f64| {
        let widened = Fixed::from_f64(widen(n));
        original.map_or(widened, |maps| maps.apply(widened)).to_f64()
    };

    let mut stops = vec![-1.0, 0.0, 1.0];
    if let Some(maps) = original {
        for value_map in maps.axis_value_maps() {
            let from = f64::from(value_map.from_coordinate().to_f32());
            let stop = match from {
                f if f < 0.0 && below > 0.0 => f / below,
                f if f > 0.0 && above > 0.0 => f / above,
                _ => continue,
            };
            if (-1.0..=1.0).contains(&stop) {
                stops.push(stop);
            }
        }
    }
    stops.sort_by(f64::total_cmp);

    let mut value_maps: Vec<AxisValueMap> = stops
        .into_iter()
        .map(|n| AxisValueMap::new(F2Dot14::from_f32(n as f32), F2Dot14::from_f32(map(n) as f32)))
        .collect();
    value_maps.dedup_by_key(|m| m.from_coordinate);
    WriteSegmentMaps::new(value_maps)
}
