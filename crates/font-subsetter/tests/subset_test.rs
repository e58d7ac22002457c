use std::collections::BTreeSet;

use read_fonts::{FontRef, TableProvider, types::Tag};
use upsetter_font_subsetter::{
    SubsetSpecBuilder, Subsetter, encoded_unicodes, font_feature_tags,
};
use upsetter_test_fonts::{ligature_test, mapped_glyph, substitution_test};

fn gsub_tags(data: &[u8]) -> BTreeSet<Tag> {
    let font = FontRef::new(data).unwrap();
    font.gsub()
        .unwrap()
        .feature_list()
        .unwrap()
        .feature_records()
        .iter()
        .map(|r| r.feature_tag())
        .collect()
}

#[test]
fn explicit_list_of_encoded_codepoints_matches_default() {
    let data = font_test_data::CMAP12_FONT1;
    let font = FontRef::new(data).unwrap();

    let default = SubsetSpecBuilder::from_font(&font).build(&font).unwrap();
    assert!(!default.unicodes.codepoints.is_empty());

    let explicit = default
        .unicodes
        .codepoints
        .iter()
        .map(|cp| format!("{cp:X}"))
        .collect::<Vec<_>>()
        .join(",");
    let requested = SubsetSpecBuilder::from_font(&font)
        .unicodes(Some(&explicit))
        .build(&font)
        .unwrap();

    assert_eq!(requested.unicodes.codepoints, default.unicodes.codepoints);
}

#[test]
fn encoded_unicodes_skip_notdef() {
    let data = substitution_test().build();
    let font = FontRef::new(&data).unwrap();
    assert_eq!(
        encoded_unicodes(&font).codepoints,
        BTreeSet::from(['a' as u32])
    );
}

#[test]
fn removed_features_are_gone_after_subsetting() {
    let data = substitution_test().build();
    let font = FontRef::new(&data).unwrap();
    let spec = SubsetSpecBuilder::new(font_feature_tags(&font))
        .remove([Tag::new(b"ss03")])
        .build(&font)
        .unwrap();

    let subset = Subsetter::from_spec(&spec).subset(&data).unwrap();

    let tags = gsub_tags(&subset);
    assert!(tags.contains(&Tag::new(b"ss01")));
    assert!(!tags.contains(&Tag::new(b"ss03")));
    assert!(mapped_glyph(&subset, 'a').is_some());
}

#[test]
fn unrequested_codepoints_are_dropped() {
    let data = ligature_test().build();
    let font = FontRef::new(&data).unwrap();
    let spec = SubsetSpecBuilder::from_font(&font)
        .unicodes(Some("66"))
        .build(&font)
        .unwrap();

    let subset = Subsetter::from_spec(&spec).subset(&data).unwrap();

    assert!(mapped_glyph(&subset, 'f').is_some());
    assert_eq!(mapped_glyph(&subset, 'l'), None);
}
