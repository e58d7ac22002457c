//! Error types for feature freezing.

use std::result;

use read_fonts::ReadError;
use write_fonts::{BuilderError, tables::cmap::CmapConflict};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse font: {0}")]
    Parse(#[from] ReadError),

    #[error("no GSUB table in font")]
    NoGsub,

    #[error("no cmap table in font")]
    NoCmap,

    #[error("failed to build font: {0}")]
    Build(#[from] BuilderError),

    #[error("cannot rebuild cmap: {0}")]
    Cmap(#[from] CmapConflict),

    #[error("invalid feature tag {0:?}")]
    InvalidTag(String),
}

pub type Result<T> = result::Result<T, Error>;
