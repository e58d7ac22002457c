//! # Font Instancer
//!
//! Pin or narrow the axes of variable TrueType fonts.
//!
//! Axes are limited with the `TAG=drop|value|min:max|min:default:max`
//! grammar of [`AxisLimits`]. `drop` pins an axis at its default and a value
//! pins it there; a range narrows it, and an axis without a limit keeps its
//! full range. When every axis ends up pinned the result is a static font.
//! Only TrueType (`glyf` + `gvar`) outlines are supported.
//!
//! ## Example
//!
//! ```no_run
//! use font_instancer::{AxisLimits, instantiate};
//!
//! let vf_data = std::fs::read("variable.ttf").unwrap();
//! let limits: AxisLimits = "wght=700,wdth=drop".parse().unwrap();
//! let static_font = instantiate(&vf_data, &limits).unwrap();
//! std::fs::write("static.ttf", static_font).unwrap();
//!
//! let limits: AxisLimits = "wght=300:700".parse().unwrap();
//! let narrowed = instantiate(&vf_data, &limits).unwrap();
//! std::fs::write("narrow.ttf", narrowed).unwrap();
//! ```

mod axes;
mod error;
mod glyphs;
mod instancer;
mod limits;
mod location;
mod metrics;

pub use error::{Error, Result};
pub use instancer::instantiate;
pub use limits::{AxisLimit, AxisLimits, LimitsError, parse_limit};
pub use location::{AxisPlacement, Subspace, resolve_subspace};
use read_fonts::types::Tag;

/// A pinned axis: tag plus user-space value, e.g. `wght=700`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLocation {
    pub tag: Tag,
    pub value: f32,
}
