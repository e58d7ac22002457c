//! Remap instructions derived from freeze decisions.

use std::fmt;

use read_fonts::types::Tag;

use crate::classify::{FreezeDecisions, FreezeStrategy};

/// Feature HarfBuzz applies to every run without being asked.
pub const DEFAULT_TARGET_FEATURE: Tag = Tag::new(b"rclt");

/// Configuration of the rule-injection executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapLayoutOptions {
    /// Always-on feature that receives the frozen lookups.
    pub target_feature: Tag,
    /// Leave the source feature in place, so requesting it stays harmless.
    pub retain_source_feature: bool,
}

impl Default for RemapLayoutOptions {
    fn default() -> Self {
        Self {
            target_feature: DEFAULT_TARGET_FEATURE,
            retain_source_feature: true,
        }
    }
}

impl RemapLayoutOptions {
    pub fn with_target_feature(mut self, tag: Tag) -> Self {
        self.target_feature = tag;
        self
    }

    pub fn with_retain_source_feature(mut self, retain: bool) -> Self {
        self.retain_source_feature = retain;
        self
    }
}

/// Move the lookups of `source` onto `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemapCommand {
    pub source: Tag,
    pub target: Tag,
}

impl fmt::Display for RemapCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.source, self.target)
    }
}

/// Everything the two executors need, in requested order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapPlan {
    pub decisions: FreezeDecisions,
    /// One command per decision, whatever its strategy.
    pub commands: Vec<RemapCommand>,
    /// Tags whose cmap can be rewritten directly.
    pub direct_remap: Vec<Tag>,
}

impl RemapPlan {
    pub fn build(decisions: &FreezeDecisions, options: &RemapLayoutOptions) -> Self {
        let commands = decisions
            .keys()
            .map(|&source| RemapCommand {
                source,
                target: options.target_feature,
            })
            .collect();
        let direct_remap = decisions
            .iter()
            .filter(|(_, strategy)| **strategy == FreezeStrategy::DirectGlyphRemap)
            .map(|(tag, _)| *tag)
            .collect();

        Self {
            decisions: decisions.clone(),
            commands,
            direct_remap,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_command_per_decision_in_order() {
        let mut decisions = FreezeDecisions::new();
        decisions.insert(Tag::new(b"ss02"), FreezeStrategy::RuleInjection);
        decisions.insert(Tag::new(b"ss01"), FreezeStrategy::DirectGlyphRemap);
        decisions.insert(Tag::new(b"smcp"), FreezeStrategy::DirectGlyphRemap);

        let plan = RemapPlan::build(&decisions, &RemapLayoutOptions::default());

        let sources: Vec<Tag> = plan.commands.iter().map(|c| c.source).collect();
        assert_eq!(
            sources,
            vec![Tag::new(b"ss02"), Tag::new(b"ss01"), Tag::new(b"smcp")]
        );
        assert!(plan.commands.iter().all(|c| c.target == Tag::new(b"rclt")));
        assert_eq!(plan.direct_remap, vec![Tag::new(b"ss01"), Tag::new(b"smcp")]);
    }

    #[test]
    fn custom_target_feature() {
        let mut decisions = FreezeDecisions::new();
        decisions.insert(Tag::new(b"ss01"), FreezeStrategy::RuleInjection);
        let options = RemapLayoutOptions::default().with_target_feature(Tag::new(b"ccmp"));

        let plan = RemapPlan::build(&decisions, &options);
        assert_eq!(plan.commands[0].to_string(), "ss01 => ccmp");
        assert!(plan.direct_remap.is_empty());
    }

    #[test]
    fn empty_decisions_make_an_empty_plan() {
        let plan = RemapPlan::build(&FreezeDecisions::new(), &RemapLayoutOptions::default());
        assert!(plan.is_empty());
    }
}
