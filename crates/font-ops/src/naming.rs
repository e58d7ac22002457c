//! PostScript name suffixing.

use anyhow::Result;
use log::{debug, warn};
use read_fonts::{FontRef, TableProvider};

use crate::{map_name_records, rewrite_font};

const POSTSCRIPT_NAME_ID: u16 = 6;
const WINDOWS_PLATFORM: u16 = 3;
const UNICODE_BMP_ENCODING: u16 = 1;
const ENGLISH_US: u16 = 0x409;

/// The Windows, Unicode BMP, US English PostScript name (name ID 6).
pub fn postscript_name(font: &FontRef) -> Option<String> {
    let name = font.name().ok()?;
    name.name_record()
        .iter()
        .find(|record| {
            record.name_id().to_u16() == POSTSCRIPT_NAME_ID
                && record.platform_id() == WINDOWS_PLATFORM
                && record.encoding_id() == UNICODE_BMP_ENCODING
                && record.language_id() == ENGLISH_US
        })
        .and_then(|record| record.string(name.string_data()).ok())
        .map(|s| s.chars().collect())
}

/// Inserts `suffix`, stripped of whitespace, before the last `-`.
///
/// A name without a hyphen gets the suffix appended.
///
/// ```
/// use upsetter_font_ops::suffixed_postscript_name;
///
/// assert_eq!(suffixed_postscript_name("Family-Bold", "SC"), "FamilySC-Bold");
/// assert_eq!(suffixed_postscript_name("Family", " S C "), "FamilySC");
/// ```
pub fn suffixed_postscript_name(name: &str, suffix: &str) -> String {
    let suffix: String = suffix.split_whitespace().collect();
    match name.rsplit_once('-') {
        Some((family, style)) => format!("{family}{suffix}-{style}"),
        None => format!("{name}{suffix}"),
    }
}

/// Replaces the first occurrence of the old PostScript name in every name
/// record with the suffixed one.
///
/// Returns `None`, leaving the font untouched, when the suffix is blank or
/// the font has no Windows English PostScript name.
pub fn apply_name_suffix(data: &[u8], suffix: &str) -> Result<Option<Vec<u8>>> {
    let font = FontRef::new(data)?;
    let Some(old) = postscript_name(&font) else {
        warn!("no PostScript name to suffix");
        return Ok(None);
    };
    let new = suffixed_postscript_name(&old, suffix);
    if new == old {
        debug!("blank name suffix, {old} unchanged");
        return Ok(None);
    }
    debug!("renaming {old} to {new}");

    rewrite_font(data, |font, builder| {
        let name = map_name_records(font, |_, current| {
            current
                .contains(old.as_str())
                .then(|| current.replacen(old.as_str(), &new, 1))
        })?;
        builder.add_table(&name)?;
        Ok(())
    })
    .map(Some)
}
