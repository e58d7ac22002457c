//! The engines the pipeline drives, behind traits so they can be swapped.

use anyhow::{Context, Result};
use font_feature_freezer::{RemapCommand, RemapLayoutOptions, Tag};
use font_instancer::AxisLimits;
use upsetter_font_subsetter::{SubsetSpec, Subsetter};

/// Collapses variation axes.
pub trait Subspacer {
    fn subspace(&self, data: &[u8], limits: &AxisLimits) -> Result<Vec<u8>>;
}

/// Executes freeze plans.
pub trait LayoutRemapper {
    /// Re-points the cmap through the single substitutions of `features`.
    fn remap_cmap(&self, data: &[u8], features: &[Tag]) -> Result<Vec<u8>>;

    /// Moves each command's source feature onto its always-on target.
    fn inject_rules(
        &self,
        data: &[u8],
        commands: &[RemapCommand],
        options: RemapLayoutOptions,
    ) -> Result<Vec<u8>>;
}

pub trait SubsetEngine {
    fn subset(&self, data: &[u8], spec: &SubsetSpec) -> Result<Vec<u8>>;
}

/// Axis pinning and narrowing through `font_instancer`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Instancer;

impl Subspacer for Instancer {
    fn subspace(&self, data: &[u8], limits: &AxisLimits) -> Result<Vec<u8>> {
        font_instancer::instantiate(data, limits).context("instancing failed")
    }
}

/// GSUB and cmap rewriting through `font_feature_freezer`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeatureFreezer;

impl LayoutRemapper for FeatureFreezer {
    fn remap_cmap(&self, data: &[u8], features: &[Tag]) -> Result<Vec<u8>> {
        let result = font_feature_freezer::remap_cmap(data, features)
            .context("cmap remapping failed")?;
        log::debug!("cmap remap: {}", result.stats);
        Ok(result.data)
    }

    fn inject_rules(
        &self,
        data: &[u8],
        commands: &[RemapCommand],
        options: RemapLayoutOptions,
    ) -> Result<Vec<u8>> {
        font_feature_freezer::inject_rules(data, commands, options)
            .context("rule injection failed")
    }
}

/// HarfBuzz subsetting.
#[derive(Debug, Default, Clone, Copy)]
pub struct HarfBuzz;

impl SubsetEngine for HarfBuzz {
    fn subset(&self, data: &[u8], spec: &SubsetSpec) -> Result<Vec<u8>> {
        Subsetter::from_spec(spec).subset(data)
    }
}

/// One engine per stage.
pub struct Collaborators {
    pub subspacer: Box<dyn Subspacer>,
    pub remapper: Box<dyn LayoutRemapper>,
    pub subsetter: Box<dyn SubsetEngine>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            subspacer: Box::new(Instancer),
            remapper: Box::new(FeatureFreezer),
            subsetter: Box::new(HarfBuzz),
        }
    }
}
