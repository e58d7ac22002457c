//! What a pipeline run should do.

use font_feature_freezer::RemapLayoutOptions;
use font_instancer::AxisLimits;
use indexmap::IndexSet;
use read_fonts::types::Tag;
use upsetter_font_subsetter::parse_unicodes;

use crate::error::ValidationError;

/// Feature tags in caller order, without duplicates.
pub type FeatureTags = IndexSet<Tag>;

/// Parse a comma-separated tag list such as `"ss01, ss02"`.
///
/// ```
/// use upsetter_core::parse_feature_tags;
///
/// let tags = parse_feature_tags("ss02,ss01,ss02").unwrap();
/// assert_eq!(tags.len(), 2);
/// assert!(parse_feature_tags("toolong").is_err());
/// ```
pub fn parse_feature_tags(list: &str) -> Result<FeatureTags, ValidationError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Tag::new_checked(s.as_bytes()).map_err(|_| ValidationError::InvalidFeatureTag(s.into()))
        })
        .collect()
}

/// Options for one batch. A stage whose option is `None` or empty is skipped.
#[derive(Debug, Clone, Default)]
pub struct UpsetOptions {
    /// Axis limits; axes without one stay variable.
    pub subspace: Option<AxisLimits>,
    pub freeze: Option<FeatureTags>,
    /// Features left out of the subset.
    pub remove: Option<FeatureTags>,
    /// Codepoints to keep, e.g. `"20-7E,A0"`. All encoded ones when `None`.
    pub unicodes: Option<String>,
    /// Inserted into the PostScript name before the style.
    pub name_suffix: Option<String>,
    pub retain_glyph_names: bool,
    pub remap: RemapLayoutOptions,
    /// Also save the font after subspacing and freezing.
    pub keep_intermediates: bool,
}

impl UpsetOptions {
    /// Checks everything that can be checked without a font.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(freeze), Some(remove)) = (&self.freeze, &self.remove) {
            let overlap: Vec<String> = freeze
                .intersection(remove)
                .map(|tag| tag.to_string())
                .collect();
            if !overlap.is_empty() {
                return Err(ValidationError::FeatureOverlap(overlap));
            }
        }
        if let Some(unicodes) = &self.unicodes {
            parse_unicodes(unicodes)?;
        }
        Ok(())
    }

    pub(crate) fn subspace_limits(&self) -> Option<&AxisLimits> {
        self.subspace.as_ref().filter(|limits| !limits.is_empty())
    }

    pub(crate) fn freeze_tags(&self) -> Option<Vec<Tag>> {
        self.freeze
            .as_ref()
            .filter(|tags| !tags.is_empty())
            .map(|tags| tags.iter().copied().collect())
    }

    pub(crate) fn name_suffix(&self) -> Option<&str> {
        self.name_suffix
            .as_deref()
            .filter(|suffix| !suffix.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &str) -> Option<FeatureTags> {
        Some(parse_feature_tags(list).unwrap())
    }

    #[test]
    fn tags_keep_caller_order() {
        let parsed = parse_feature_tags(" ss03, ss01 ,,ss03").unwrap();
        let order: Vec<String> = parsed.iter().map(Tag::to_string).collect();
        assert_eq!(order, vec!["ss03", "ss01"]);
    }

    #[test]
    fn short_tags_are_padded() {
        let parsed = parse_feature_tags("cv1").unwrap();
        assert!(parsed.contains(&Tag::new(b"cv1 ")));
    }

    #[test]
    fn overlap_is_rejected() {
        let options = UpsetOptions {
            freeze: tags("ss01,ss02,liga"),
            remove: tags("liga,ss02,kern"),
            ..Default::default()
        };
        match options.validate() {
            Err(ValidationError::FeatureOverlap(overlap)) => {
                assert_eq!(overlap, vec!["ss02", "liga"]);
            }
            other => panic!("expected overlap, got {other:?}"),
        }
    }

    #[test]
    fn disjoint_sets_are_fine() {
        let options = UpsetOptions {
            freeze: tags("ss01"),
            remove: tags("ss02"),
            unicodes: Some("41-5A".into()),
            ..Default::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn malformed_unicodes_fail_validation() {
        let options = UpsetOptions {
            unicodes: Some("41,zz".into()),
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ValidationError::Unicodes(_))
        ));
    }

    #[test]
    fn empty_options_skip_stages() {
        let options = UpsetOptions {
            subspace: Some(AxisLimits::new()),
            freeze: tags(""),
            name_suffix: Some(" ".into()),
            ..Default::default()
        };
        assert!(options.subspace_limits().is_none());
        assert!(options.freeze_tags().is_none());
        assert!(options.name_suffix().is_none());
    }
}
