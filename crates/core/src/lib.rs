//! Upsetter core - the subspace, freeze and subset pipeline.
//!
//! A [`Pipeline`] takes a batch of font files and, for each of them:
//!
//! 1. pins variation axes ([`UpsetOptions::subspace`]),
//! 2. freezes OpenType features into the default glyph mapping
//!    ([`UpsetOptions::freeze`]),
//! 3. subsets codepoints and layout features,
//! 4. optionally inserts a suffix into the font names,
//!
//! then writes `<stem>.subspace.freeze.subset<ext>` next to the input, with
//! only the suffixes of the stages that ran.
//!
//! ```no_run
//! use upsetter_core::{Pipeline, UpsetOptions, parse_feature_tags};
//!
//! let options = UpsetOptions {
//!     freeze: Some(parse_feature_tags("ss01,ss02")?),
//!     unicodes: Some("20-7E".into()),
//!     ..Default::default()
//! };
//! let report = Pipeline::new(options).run(&["Font-Regular.ttf"])?;
//! assert!(report.all_succeeded());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod collaborators;
pub mod error;
pub mod io;
pub mod options;
pub mod pipeline;

pub use collaborators::{Collaborators, LayoutRemapper, SubsetEngine, Subspacer};
pub use error::{Error, Result, Stage, ValidationError};
pub use font_feature_freezer::{RemapLayoutOptions, Tag};
pub use font_instancer::{AxisLimit, AxisLimits};
pub use io::{FontResource, chained_output_path};
pub use options::{FeatureTags, UpsetOptions, parse_feature_tags};
pub use pipeline::{BatchReport, FontFailure, Pipeline};
