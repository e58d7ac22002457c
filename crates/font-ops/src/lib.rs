//! Generic font table manipulation utilities.

mod naming;

use anyhow::{Result, bail};
use read_fonts::{FontRef, TableProvider, tables::name::Encoding};
use write_fonts::{
    FontBuilder,
    tables::name::{Name, NameRecord},
};

pub use naming::{apply_name_suffix, postscript_name, suffixed_postscript_name};

/// Rewrite font data by applying a transformation function.
///
/// Copies all tables from the source font, then calls `f` to modify or add tables.
/// The function receives a reference to the source font and a mutable builder
/// that already contains all original tables.
pub fn rewrite_font(
    data: &[u8],
    f: impl FnOnce(&FontRef, &mut FontBuilder) -> Result<()>,
) -> Result<Vec<u8>> {
    let font = FontRef::new(data)?;
    let mut builder = FontBuilder::new();

    for record in font.table_directory.table_records() {
        let tag = record.tag();
        if let Some(table_data) = font.table_data(tag) {
            builder.add_raw(tag, table_data);
        }
    }

    f(&font, &mut builder)?;
    Ok(builder.build())
}

/// Map name table records using a transformation function.
///
/// The mapper receives `(name_id, current_string)` and returns:
/// - `Some(new_string)` to replace the record's string
/// - `None` to keep the current string unchanged
///
/// Fails on a record whose string cannot be decoded: it could not be
/// written back, and the table is not rewritten with records missing.
pub fn map_name_records(
    font: &FontRef,
    mut mapper: impl FnMut(u16, &str) -> Option<String>,
) -> Result<Name> {
    let name = font.name()?;
    let mut new_records = Vec::new();

    for record in name.name_record() {
        let name_id = record.name_id();
        let encoding = Encoding::new(record.platform_id(), record.encoding_id());
        let decoded = record.string(name.string_data()).ok();
        let Some(current) = decoded.filter(|_| encoding != Encoding::Unknown) else {
            bail!(
                "name record {} (platform {}, encoding {}, language {:#x}) has an undecodable string",
                name_id.to_u16(),
                record.platform_id(),
                record.encoding_id(),
                record.language_id()
            );
        };
        let current: String = current.chars().collect();
        let new_string = mapper(name_id.to_u16(), &current).unwrap_or(current);

        new_records.push(NameRecord::new(
            record.platform_id(),
            record.encoding_id(),
            record.language_id(),
            name_id,
            new_string.into(),
        ));
    }

    Ok(Name::new(new_records))
}
