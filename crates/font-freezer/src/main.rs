use std::{
    fs::{read, write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail, ensure};
use clap::Parser;
use env_logger::{Builder, Env};
use font_feature_freezer::{Font, RemapLayoutOptions, Tag, parse_tags, report};
use log::{LevelFilter, info};

#[derive(Parser)]
#[command(name = "font-feature-freezer", version)]
#[command(about = "Make OpenType GSUB features permanent")]
#[command(long_about = "Freezes OpenType features into a font so they apply without being \
    requested.\n\n\
    Single substitutions of encoded glyphs are frozen by rewriting the cmap; every \
    requested feature is also attached to an always-on feature (rclt by default).")]
#[command(after_help = "Examples:\n  \
    font-feature-freezer -f ss01,ss02 Inter.ttf\n  \
    font-feature-freezer -f smcp -t calt --drop-source Inter.ttf InterSC.ttf\n  \
    font-feature-freezer --report Inter.ttf")]
struct Cli {
    /// Comma-separated feature tags, e.g. 'smcp,c2sc,onum'
    #[arg(short, long, value_name = "TAGS")]
    features: Option<String>,

    /// Always-on feature that receives the frozen lookups
    #[arg(short, long, value_name = "TAG", default_value = "rclt")]
    target: String,

    /// Detach the frozen features from every language system
    #[arg(long)]
    drop_source: bool,

    /// Print scripts, languages and features instead of freezing
    #[arg(short, long, conflicts_with_all = ["features", "output"])]
    report: bool,

    /// Log each feature's freeze strategy
    #[arg(short, long)]
    verbose: bool,

    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    input: PathBuf,

    /// Defaults to <INPUT stem>.freeze.<ext>
    output: Option<PathBuf>,
}

impl Cli {
    fn level(&self) -> LevelFilter {
        match (self.quiet, self.verbose) {
            (true, _) => LevelFilter::Error,
            (_, true) => LevelFilter::Debug,
            _ => LevelFilter::Info,
        }
    }

    fn features(&self) -> Result<Vec<Tag>> {
        let Some(list) = self.features.as_deref() else {
            bail!("--features is required unless --report is given");
        };
        let tags = parse_tags(list.split(',').map(str::trim).filter(|s| !s.is_empty()))?;
        ensure!(!tags.is_empty(), "--features lists no tags");
        Ok(tags)
    }

    fn options(&self) -> Result<RemapLayoutOptions> {
        let target = parse_tags([self.target.trim()])?
            .pop()
            .context("--target is empty")?;
        Ok(RemapLayoutOptions::default()
            .with_target_feature(target)
            .with_retain_source_feature(!self.drop_source))
    }

    fn run(&self) -> Result<()> {
        let data = read(&self.input).with_context(|| format!("reading {}", self.input.display()))?;
        if self.report {
            print!("{}", report(&data)?);
            return Ok(());
        }

        let features = self.features()?;
        let options = self.options()?;
        let result = Font::new(&data)?.freeze(&features, &options)?;

        let output = self
            .output
            .clone()
            .unwrap_or_else(|| frozen_path(&self.input));
        write(&output, &result.data).with_context(|| format!("writing {}", output.display()))?;
        info!("{} -> {}: {}", self.input.display(), output.display(), result.stats);
        Ok(())
    }
}

fn frozen_path(input: &Path) -> PathBuf {
    let mut name = input.file_stem().unwrap_or_default().to_owned();
    name.push(".freeze");
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }
    input.with_file_name(name)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    Builder::new()
        .filter_level(cli.level())
        .parse_env(Env::default())
        .init();
    cli.run()
}
