//! Axis limit grammar.
//!
//! A limit is `TAG=drop`, `TAG=value`, `TAG=min:max` or `TAG=min:default:max`.
//! Any value may be left empty to mean "whatever the font says"; a limit
//! whose values are all empty drops the axis like `drop` does.

use std::str::FromStr;

use indexmap::IndexMap;
use read_fonts::types::Tag;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisLimit {
    /// Pin the axis at its default.
    Drop,
    Pin(f32),
    /// Restrict the axis. Missing values fall back to the axis' own.
    Range {
        min: Option<f32>,
        default: Option<f32>,
        max: Option<f32>,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LimitsError {
    #[error("expected TAG=VALUE, got {0:?}")]
    MissingEquals(String),

    #[error("invalid axis tag in {0:?}")]
    InvalidTag(String),

    #[error("invalid axis value {value:?} in {limit:?}")]
    InvalidValue { limit: String, value: String },

    #[error("at most three values are allowed in {0:?}")]
    TooManyValues(String),

    #[error("values out of order in {0:?}")]
    Unordered(String),

    #[error("axis {0} is limited more than once")]
    Duplicate(Tag),
}

/// Limits keyed by axis tag, in the order given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisLimits(IndexMap<Tag, AxisLimit>);

impl AxisLimits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse limits; each item may itself hold several comma-separated
    /// limits, so repeated `-s` flags and `-s a=1,b=2` mean the same.
    pub fn parse<I, S>(items: I) -> Result<Self, LimitsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut limits = Self::new();
        for item in items {
            for limit in item
                .as_ref()
                .split([',', ' '])
                .map(str::trim)
                .filter(|s| !s.is_empty())
            {
                let (tag, value) = parse_limit(limit)?;
                if limits.0.insert(tag, value).is_some() {
                    return Err(LimitsError::Duplicate(tag));
                }
            }
        }
        Ok(limits)
    }

    pub fn insert(&mut self, tag: Tag, limit: AxisLimit) -> Option<AxisLimit> {
        self.0.insert(tag, limit)
    }

    pub fn get(&self, tag: Tag) -> Option<&AxisLimit> {
        self.0.get(&tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &AxisLimit)> {
        self.0.iter()
    }

    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for AxisLimits {
    type Err = LimitsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse([s])
    }
}

impl FromIterator<(Tag, AxisLimit)> for AxisLimits {
    fn from_iter<T: IntoIterator<Item = (Tag, AxisLimit)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Parse a single `TAG=...` limit.
pub fn parse_limit(limit: &str) -> Result<(Tag, AxisLimit), LimitsError> {
    let (tag, values) = limit
        .split_once('=')
        .ok_or_else(|| LimitsError::MissingEquals(limit.to_owned()))?;
    let tag = tag.trim();
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(LimitsError::InvalidTag(limit.to_owned()));
    }
    let tag =
        Tag::new_checked(tag.as_bytes()).map_err(|_| LimitsError::InvalidTag(limit.to_owned()))?;

    let values = values.trim();
    if values == "drop" {
        return Ok((tag, AxisLimit::Drop));
    }

    let parts = values
        .split(':')
        .map(|v| parse_value(limit, v))
        .collect::<Result<Vec<_>, _>>()?;

    let axis_limit = match parts.as_slice() {
        [None] | [None, None] | [None, None, None] => AxisLimit::Drop,
        [Some(v)] => AxisLimit::Pin(*v),
        [min, max] => AxisLimit::Range {
            min: *min,
            default: None,
            max: *max,
        },
        [min, default, max] => AxisLimit::Range {
            min: *min,
            default: *default,
            max: *max,
        },
        _ => return Err(LimitsError::TooManyValues(limit.to_owned())),
    };

    if let AxisLimit::Range { min, default, max } = axis_limit {
        let present: Vec<f32> = [min, default, max].into_iter().flatten().collect();
        if present.windows(2).any(|w| w[0] > w[1]) {
            return Err(LimitsError::Unordered(limit.to_owned()));
        }
    }

    Ok((tag, axis_limit))
}

fn parse_value(limit: &str, value: &str) -> Result<Option<f32>, LimitsError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| LimitsError::InvalidValue {
            limit: limit.to_owned(),
            value: value.to_owned(),
        })
}
