//! Results and reports of freeze operations.

use std::fmt::{self, Formatter, Result};
use std::ops::AddAssign;

/// Result of a freeze executor.
#[derive(Debug, Clone)]
pub struct FreezeResult {
    pub data: Vec<u8>,
    pub stats: FreezeStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FreezeStats {
    pub features_requested: usize,
    pub lookups_processed: usize,
    /// Glyph substitutions composed into the cmap.
    pub substitutions_applied: usize,
    /// Language systems pointed at the always-on feature.
    pub lang_systems_changed: usize,
}

impl AddAssign for FreezeStats {
    fn add_assign(&mut self, rhs: Self) {
        self.features_requested = self.features_requested.max(rhs.features_requested);
        self.lookups_processed += rhs.lookups_processed;
        self.substitutions_applied += rhs.substitutions_applied;
        self.lang_systems_changed += rhs.lang_systems_changed;
    }
}

impl fmt::Display for FreezeStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "frozen {} features, {} substitutions, {} language systems",
            self.features_requested, self.substitutions_applied, self.lang_systems_changed
        )
    }
}

/// Scripts, languages and GSUB features available in a font.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontReport {
    pub scripts_langs: Vec<String>,
    pub features: Vec<String>,
}

impl fmt::Display for FontReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "# Scripts and languages:")?;
        for sl in &self.scripts_langs {
            writeln!(f, "{sl}")?;
        }
        writeln!(f, "# Features:")?;
        write!(f, "-f {}", self.features.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_accumulate() {
        let mut stats = FreezeStats {
            features_requested: 2,
            lookups_processed: 1,
            substitutions_applied: 3,
            lang_systems_changed: 0,
        };
        stats += FreezeStats {
            features_requested: 2,
            lang_systems_changed: 4,
            ..Default::default()
        };
        assert_eq!(
            stats.to_string(),
            "frozen 2 features, 3 substitutions, 4 language systems"
        );
    }

    #[test]
    fn report_lists_features_as_flag() {
        let report = FontReport {
            scripts_langs: vec!["-s 'latn'".into()],
            features: vec!["liga".into(), "ss01".into()],
        };
        assert!(report.to_string().ends_with("-f liga,ss01"));
    }
}
