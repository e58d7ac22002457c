use std::{fmt, io, path::PathBuf};

use font_instancer::LimitsError;
use read_fonts::ReadError;
use upsetter_font_subsetter::UnicodeParseError;

/// Problems with the options themselves, found before any font is opened.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("features to freeze and remove must not overlap: {}", .0.join(", "))]
    FeatureOverlap(Vec<String>),

    #[error("invalid feature tag {0:?}")]
    InvalidFeatureTag(String),

    #[error(transparent)]
    Unicodes(#[from] UnicodeParseError),

    #[error(transparent)]
    AxisLimits(#[from] LimitsError),
}

/// Pipeline stages, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Subspace,
    Freeze,
    Subset,
    Name,
}

impl Stage {
    /// Suffix the stage adds to the output file stem.
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            Self::Subspace => Some(".subspace"),
            Self::Freeze => Some(".freeze"),
            Self::Subset => Some(".subset"),
            Self::Name => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Subspace => "subspace",
            Self::Freeze => "freeze",
            Self::Subset => "subset",
            Self::Name => "name",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid options: {0}")]
    Validation(#[from] ValidationError),

    #[error("{}: {reason}", path.display())]
    Precondition { path: PathBuf, reason: String },

    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: UnicodeParseError,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: not a readable font: {source}", path.display())]
    Font {
        path: PathBuf,
        #[source]
        source: ReadError,
    },

    #[error("{}: {stage} failed: {source:#}", path.display())]
    Stage {
        path: PathBuf,
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
