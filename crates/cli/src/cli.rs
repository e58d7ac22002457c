//! Command line definition and the translation into pipeline options.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{ArgAction, Parser};
use log::LevelFilter;
use upsetter_core::{
    AxisLimits, Pipeline, RemapLayoutOptions, Tag, UpsetOptions, ValidationError,
    parse_feature_tags,
};

#[derive(Debug, Parser)]
#[command(name = "upsetter")]
#[command(about = "Subspace, freeze and subset OpenType fonts")]
#[command(version)]
pub struct Cli {
    /// Pin or narrow variation axes, e.g. `wght=700` or `wght=300:700,wdth=drop`.
    ///
    /// Repeatable. Each limit is `tag=drop`, `tag=value`, `tag=min:max` or
    /// `tag=min:default:max`. Axes without a limit stay variable; a range
    /// must contain the axis default.
    #[arg(short, long = "subspace", value_name = "LIMITS")]
    pub subspace: Vec<String>,

    /// Codepoints to keep, as hex values and ranges: `20-7E,A0,2010-2027`.
    #[arg(short, long, value_name = "RANGES")]
    pub unicodes: Option<String>,

    /// Features to freeze into the default glyphs, comma separated.
    #[arg(short, long, value_name = "TAGS")]
    pub freeze: Option<String>,

    /// Features to drop from the subset, comma separated.
    #[arg(short, long, value_name = "TAGS")]
    pub remove: Option<String>,

    /// Suffix inserted into the font names, e.g. `SC` turns
    /// `Family-Regular` into `FamilySC-Regular`.
    #[arg(short, long = "name", value_name = "SUFFIX")]
    pub name: Option<String>,

    /// Keep glyph names in the subset.
    #[arg(long)]
    pub glyph_names: bool,

    /// Always-on feature that receives frozen lookups.
    #[arg(long, value_name = "TAG", default_value = "rclt")]
    pub remap_target: String,

    /// Also write the font after subspacing and freezing.
    #[arg(long)]
    pub keep_intermediates: bool,

    /// More output: `-v` for progress, `-vv` for freeze decisions.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(required = true, value_name = "FONT")]
    pub fonts: Vec<PathBuf>,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }

    pub fn options(&self) -> Result<UpsetOptions, ValidationError> {
        let subspace = if self.subspace.is_empty() {
            None
        } else {
            Some(AxisLimits::parse(&self.subspace)?)
        };
        let target = self.remap_target.trim();
        let target = Tag::new_checked(target.as_bytes())
            .map_err(|_| ValidationError::InvalidFeatureTag(target.into()))?;

        Ok(UpsetOptions {
            subspace,
            freeze: self.freeze.as_deref().map(parse_feature_tags).transpose()?,
            remove: self.remove.as_deref().map(parse_feature_tags).transpose()?,
            unicodes: self.unicodes.clone(),
            name_suffix: self.name.clone(),
            retain_glyph_names: self.glyph_names,
            remap: RemapLayoutOptions::default().with_target_feature(target),
            keep_intermediates: self.keep_intermediates,
        })
    }

    /// Runs the batch. Fails if the options are invalid or any font failed.
    pub fn run(self) -> Result<()> {
        let options = self.options()?;
        let report = Pipeline::new(options).run(&self.fonts)?;

        for output in &report.succeeded {
            println!("{}", output.display());
        }
        if !report.all_succeeded() {
            bail!(
                "{} of {} fonts failed: {}",
                report.failed.len(),
                report.total(),
                report
                    .failed
                    .iter()
                    .map(|failure| failure.input.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        Ok(())
    }
}
