//! Font files in and out of the pipeline.

use std::{
    ffi::OsString,
    fs::{read, write},
    path::{Path, PathBuf},
};

use read_fonts::FontRef;

use crate::error::{Error, Result, Stage};

/// A loaded font: its bytes plus the file it came from.
///
/// Stages consume a resource and hand back a new one, so a failed stage
/// never leaves a half-edited font behind.
#[derive(Debug, Clone)]
pub struct FontResource {
    path: PathBuf,
    data: Vec<u8>,
}

impl FontResource {
    /// Reads `path` and checks that it parses as a font.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = read(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        let resource = Self { path, data };
        resource.font()?;
        Ok(resource)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn font(&self) -> Result<FontRef<'_>> {
        FontRef::new(&self.data).map_err(|source| Error::Font {
            path: self.path.clone(),
            source,
        })
    }

    /// The same font with new bytes.
    pub fn with_data(self, data: Vec<u8>) -> Self {
        Self { data, ..self }
    }

    /// Writes a copy of the bytes to `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        write(path, &self.data).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes to `path` and releases the resource.
    pub fn save(self, path: &Path) -> Result<()> {
        self.write_to(path)
    }
}

impl AsRef<[u8]> for FontResource {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// `dir/Font.ttf` with stages `[Subspace, Subset]` becomes
/// `dir/Font.subspace.subset.ttf`.
pub fn chained_output_path(input: &Path, stages: &[Stage]) -> PathBuf {
    let mut name: OsString = input.file_stem().unwrap_or_default().to_owned();
    for suffix in stages.iter().filter_map(|stage| stage.suffix()) {
        name.push(suffix);
    }
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }
    input.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_chain_in_stage_order() {
        let input = Path::new("fonts/Family-Regular.ttf");
        assert_eq!(
            chained_output_path(input, &[Stage::Subset]),
            Path::new("fonts/Family-Regular.subset.ttf")
        );
        assert_eq!(
            chained_output_path(input, &[Stage::Subspace, Stage::Freeze, Stage::Subset]),
            Path::new("fonts/Family-Regular.subspace.freeze.subset.ttf")
        );
    }

    #[test]
    fn naming_adds_no_suffix() {
        assert_eq!(
            chained_output_path(Path::new("a.otf"), &[Stage::Freeze, Stage::Name]),
            Path::new("a.freeze.otf")
        );
    }

    #[test]
    fn extensionless_inputs() {
        assert_eq!(
            chained_output_path(Path::new("font"), &[Stage::Subset]),
            Path::new("font.subset")
        );
    }

    #[test]
    fn missing_files_are_io_errors() {
        let err = FontResource::load("/definitely/not/here.ttf").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn garbage_is_not_a_font() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.ttf");
        write(&path, b"not a font").unwrap();

        let err = FontResource::load(&path).unwrap_err();
        assert!(matches!(err, Error::Font { .. }));
    }
}
