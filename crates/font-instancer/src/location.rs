//! Turning axis limits into a per-axis placement.

use log::debug;
use read_fonts::{FontRef, types::Tag};
use skrifa::MetadataProvider;

use crate::{
    AxisLocation,
    error::{Error, Result},
    limits::{AxisLimit, AxisLimits},
};

/// Where an fvar axis ends up in the instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisPlacement {
    /// Fixed at a user-space value; the axis leaves the font.
    Pinned(f32),
    /// Still variable over `min..=max`. The default never moves.
    Variable { min: f32, default: f32, max: f32 },
}

/// Placement of every fvar axis, in fvar order.
#[derive(Debug, Clone, PartialEq)]
pub struct Subspace(Vec<(Tag, AxisPlacement)>);

impl Subspace {
    pub fn axes(&self) -> &[(Tag, AxisPlacement)] {
        &self.0
    }

    /// True when no axis stays variable.
    pub fn is_static(&self) -> bool {
        self.0
            .iter()
            .all(|(_, placement)| matches!(placement, AxisPlacement::Pinned(_)))
    }

    pub fn pinned(&self) -> Vec<AxisLocation> {
        self.0
            .iter()
            .filter_map(|&(tag, placement)| match placement {
                AxisPlacement::Pinned(value) => Some(AxisLocation { tag, value }),
                AxisPlacement::Variable { .. } => None,
            })
            .collect()
    }

    /// Indices of the axes that stay variable.
    pub(crate) fn variable_indices(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, (_, placement))| matches!(placement, AxisPlacement::Variable { .. }))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Places every fvar axis according to `limits`.
///
/// `drop` pins at the axis default, a value pins there, and a range that
/// collapses to one value once missing ends come from the axis is a pin
/// too. Any other range narrows the axis; an axis without a limit keeps its
/// full range. A range must contain the axis default and may not name a
/// different one.
pub fn resolve_subspace(font: &FontRef, limits: &AxisLimits) -> Result<Subspace> {
    let axes = font.axes();
    if axes.is_empty() {
        return Err(Error::NotVariableFont);
    }

    if let Some(unknown) = limits
        .tags()
        .find(|tag| axes.iter().all(|axis| axis.tag() != *tag))
    {
        return Err(Error::AxisNotFound(unknown.to_string()));
    }

    axes.iter()
        .map(|axis| {
            let tag = axis.tag();
            let (min, default, max) = (axis.min_value(), axis.default_value(), axis.max_value());
            let out_of_range = |value: f32| Error::InvalidAxisValue {
                tag: tag.to_string(),
                value,
                min,
                max,
            };

            let placement = match limits.get(tag) {
                None => AxisPlacement::Variable { min, default, max },
                Some(AxisLimit::Drop) => AxisPlacement::Pinned(default),
                Some(&AxisLimit::Pin(value)) => {
                    if !(min..=max).contains(&value) {
                        return Err(out_of_range(value));
                    }
                    AxisPlacement::Pinned(value)
                }
                Some(&AxisLimit::Range {
                    min: lower,
                    default: requested,
                    max: upper,
                }) => {
                    let (lower, upper) = (lower.unwrap_or(min), upper.unwrap_or(max));
                    if let Some(value) = [lower, upper].into_iter().find(|v| !(min..=max).contains(v))
                    {
                        return Err(out_of_range(value));
                    }
                    if lower == upper {
                        AxisPlacement::Pinned(lower)
                    } else if requested.is_some_and(|r| r != default)
                        || !(lower..=upper).contains(&default)
                    {
                        return Err(Error::DefaultMoved {
                            tag: tag.to_string(),
                            default,
                        });
                    } else {
                        AxisPlacement::Variable {
                            min: lower,
                            default,
                            max: upper,
                        }
                    }
                }
            };
            debug!("{tag}: {placement:?}");
            Ok((tag, placement))
        })
        .collect::<Result<Vec<_>>>()
        .map(Subspace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vazirmatn() -> FontRef<'static> {
        FontRef::new(font_test_data::VAZIRMATN_VAR).unwrap()
    }

    fn resolve(limits: &str) -> Result<Subspace> {
        resolve_subspace(&vazirmatn(), &limits.parse().unwrap())
    }

    fn placement(limits: &str) -> AxisPlacement {
        resolve(limits).unwrap().axes()[0].1
    }

    fn wght_default() -> f32 {
        vazirmatn()
            .axes()
            .iter()
            .next()
            .map(|axis| axis.default_value())
            .unwrap()
    }

    #[test]
    fn pin_and_drop() {
        let subspace = resolve("wght=700").unwrap();
        assert!(subspace.is_static());
        assert_eq!(
            subspace.pinned(),
            vec![AxisLocation {
                tag: Tag::new(b"wght"),
                value: 700.0
            }]
        );

        assert_eq!(placement("wght=drop"), AxisPlacement::Pinned(wght_default()));
        assert_eq!(placement("wght="), AxisPlacement::Pinned(wght_default()));
    }

    #[test]
    fn collapsed_range_is_a_pin() {
        assert_eq!(placement("wght=500:500"), AxisPlacement::Pinned(500.0));
        assert_eq!(placement("wght=500:500:500"), AxisPlacement::Pinned(500.0));
    }

    #[test]
    fn ranges_narrow_the_axis() {
        let default = wght_default();
        assert_eq!(
            placement("wght=300:700"),
            AxisPlacement::Variable {
                min: 300.0,
                default,
                max: 700.0
            }
        );
        assert!(!resolve("wght=300:700").unwrap().is_static());
        assert!(matches!(
            placement("wght=:700"),
            AxisPlacement::Variable { max: 700.0, .. }
        ));
    }

    #[test]
    fn unlimited_axes_stay_variable() {
        let subspace = resolve_subspace(&vazirmatn(), &AxisLimits::new()).unwrap();
        assert!(!subspace.is_static());
        assert!(subspace.pinned().is_empty());
        assert_eq!(subspace.variable_indices(), vec![0]);
    }

    #[test]
    fn ranges_keep_the_default() {
        assert!(matches!(
            resolve("wght=600:900"),
            Err(Error::DefaultMoved { tag, .. }) if tag == "wght"
        ));
        let moved = format!("wght=300:{}:700", wght_default() + 50.0);
        assert!(matches!(resolve(&moved), Err(Error::DefaultMoved { .. })));
    }

    #[test]
    fn unknown_axes_and_out_of_range_values() {
        assert!(matches!(
            resolve("wght=400,wdth=100"),
            Err(Error::AxisNotFound(tag)) if tag == "wdth"
        ));
        assert!(matches!(
            resolve("wght=5000"),
            Err(Error::InvalidAxisValue { .. })
        ));
        assert!(matches!(
            resolve("wght=300:5000"),
            Err(Error::InvalidAxisValue { value, .. }) if value == 5000.0
        ));
    }

    #[test]
    fn static_fonts_have_no_subspace() {
        let font = FontRef::new(font_test_data::SIMPLE_GLYF).unwrap();
        assert!(matches!(
            resolve_subspace(&font, &"wght=400".parse().unwrap()),
            Err(Error::NotVariableFont)
        ));
    }
}
