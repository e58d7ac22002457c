//! Subspace, freeze, subset and rename a batch of fonts.

use std::path::{Path, PathBuf};

use font_feature_freezer::{FreezeStrategy, Tag, plan};
use font_instancer::AxisLimits;
use log::{debug, error, info};
use read_fonts::TableProvider;
use upsetter_font_ops::apply_name_suffix;
use upsetter_font_subsetter::SubsetSpecBuilder;

use crate::{
    collaborators::Collaborators,
    error::{Error, Result, Stage},
    io::{FontResource, chained_output_path},
    options::UpsetOptions,
};

/// A font that could not be processed.
#[derive(Debug)]
pub struct FontFailure {
    pub input: PathBuf,
    pub error: Error,
}

/// Outcome of a batch: output paths of finished fonts and the failures.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<FontFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs each font through subspace, freeze, subset and naming, in order.
///
/// Fonts are processed one after another. A failing font is recorded in the
/// [`BatchReport`] and the batch moves on; nothing is written for it.
pub struct Pipeline {
    options: UpsetOptions,
    collaborators: Collaborators,
}

impl Pipeline {
    pub fn new(options: UpsetOptions) -> Self {
        Self::with_collaborators(options, Collaborators::default())
    }

    pub fn with_collaborators(options: UpsetOptions, collaborators: Collaborators) -> Self {
        Self {
            options,
            collaborators,
        }
    }

    pub fn options(&self) -> &UpsetOptions {
        &self.options
    }

    /// Validates the options once, then processes every font.
    ///
    /// Only invalid options make this return `Err`; per-font problems end
    /// up in the report.
    pub fn run<P: AsRef<Path>>(&self, fonts: &[P]) -> Result<BatchReport> {
        self.options.validate()?;

        let mut report = BatchReport::default();
        for input in fonts {
            let input = input.as_ref();
            match self.process(input) {
                Ok(output) => {
                    info!("{} -> {}", input.display(), output.display());
                    report.succeeded.push(output);
                }
                Err(error) => {
                    error!("{error}");
                    report.failed.push(FontFailure {
                        input: input.to_path_buf(),
                        error,
                    });
                }
            }
        }

        info!(
            "{} of {} fonts processed, {} failed",
            report.succeeded.len(),
            report.total(),
            report.failed.len()
        );
        Ok(report)
    }

    /// One font from load to save. Returns the output path.
    pub fn process(&self, input: &Path) -> Result<PathBuf> {
        let mut font = FontResource::load(input)?;
        let mut stages = Vec::new();

        if let Some(limits) = self.options.subspace_limits() {
            font = self.subspace(font, limits)?;
            self.advance(&font, &mut stages, Stage::Subspace)?;
        }

        if let Some(tags) = self.options.freeze_tags() {
            font = self.freeze(font, &tags)?;
            self.advance(&font, &mut stages, Stage::Freeze)?;
        }

        font = self.subset(font)?;
        stages.push(Stage::Subset);

        if let Some(suffix) = self.options.name_suffix() {
            font = self.rename(font, suffix)?;
            stages.push(Stage::Name);
        }

        let output = chained_output_path(input, &stages);
        font.save(&output)?;
        Ok(output)
    }

    fn advance(&self, font: &FontResource, stages: &mut Vec<Stage>, stage: Stage) -> Result<()> {
        stages.push(stage);
        if self.options.keep_intermediates {
            let path = chained_output_path(font.path(), stages);
            debug!("keeping {}", path.display());
            font.write_to(&path)?;
        }
        Ok(())
    }

    fn subspace(&self, font: FontResource, limits: &AxisLimits) -> Result<FontResource> {
        if font.font()?.fvar().is_err() {
            return Err(Error::Precondition {
                path: font.path().to_path_buf(),
                reason: "cannot subspace: not a variable font (no fvar table)".into(),
            });
        }
        info!("subspacing {}", font.path().display());

        let data = self
            .collaborators
            .subspacer
            .subspace(font.data(), limits)
            .map_err(|source| stage_error(&font, Stage::Subspace, source))?;
        Ok(font.with_data(data))
    }

    fn freeze(&self, font: FontResource, tags: &[Tag]) -> Result<FontResource> {
        let remap = self.options.remap;
        let plan = plan(font.data(), tags, &remap)
            .map_err(|e| stage_error(&font, Stage::Freeze, e.into()))?;
        if plan.is_empty() {
            info!(
                "freezing {}: none of the requested features are present",
                font.path().display()
            );
            return Ok(font);
        }
        info!(
            "freezing {}: {} direct remap, {} rule injection",
            font.path().display(),
            plan.direct_remap.len(),
            plan.decisions
                .values()
                .filter(|s| **s == FreezeStrategy::RuleInjection)
                .count()
        );

        let remapper = &self.collaborators.remapper;
        let mut data = font.data().to_vec();
        if !plan.direct_remap.is_empty() {
            data = remapper
                .remap_cmap(&data, &plan.direct_remap)
                .map_err(|source| stage_error(&font, Stage::Freeze, source))?;
        }
        if !plan.commands.is_empty() {
            data = remapper
                .inject_rules(&data, &plan.commands, remap)
                .map_err(|source| stage_error(&font, Stage::Freeze, source))?;
        }
        Ok(font.with_data(data))
    }

    fn subset(&self, font: FontResource) -> Result<FontResource> {
        let spec = {
            let font_ref = font.font()?;
            SubsetSpecBuilder::from_font(&font_ref)
                .remove(self.options.remove.iter().flatten().copied())
                .unicodes(self.options.unicodes.as_deref())
                .retain_glyph_names(self.options.retain_glyph_names)
                .build(&font_ref)
                .map_err(|source| Error::Parse {
                    path: font.path().to_path_buf(),
                    source,
                })?
        };
        info!(
            "subsetting {} to {} features",
            font.path().display(),
            spec.layout_features.len()
        );

        let data = self
            .collaborators
            .subsetter
            .subset(font.data(), &spec)
            .map_err(|source| stage_error(&font, Stage::Subset, source))?;
        Ok(font.with_data(data))
    }

    fn rename(&self, font: FontResource, suffix: &str) -> Result<FontResource> {
        let renamed = apply_name_suffix(font.data(), suffix)
            .map_err(|source| stage_error(&font, Stage::Name, source))?;
        Ok(match renamed {
            Some(data) => font.with_data(data),
            None => font,
        })
    }
}

fn stage_error(font: &FontResource, stage: Stage, source: anyhow::Error) -> Error {
    Error::Stage {
        path: font.path().to_path_buf(),
        stage,
        source,
    }
}
