//! Rule injection: moving a feature's lookups onto an always-on feature.

use std::collections::HashMap;

use log::debug;
use read_fonts::types::Tag;
use write_fonts::tables::{
    gsub::Gsub,
    layout::{Feature, FeatureRecord, LangSys},
};

use crate::remap::{RemapCommand, RemapLayoutOptions};

const NO_REQUIRED_FEATURE: u16 = 0xFFFF;

/// Apply `commands` in order. Returns the number of language systems changed.
///
/// New target features are appended to the feature list, so every existing
/// feature index (including those referenced from FeatureVariations) keeps
/// its meaning.
pub fn inject(gsub: &mut Gsub, commands: &[RemapCommand], options: &RemapLayoutOptions) -> usize {
    commands
        .iter()
        .map(|command| inject_one(gsub, command, options))
        .sum()
}

fn inject_one(gsub: &mut Gsub, command: &RemapCommand, options: &RemapLayoutOptions) -> usize {
    let features = &mut gsub.feature_list.feature_records;

    let mut created: HashMap<Vec<u16>, u16> = features
        .iter()
        .enumerate()
        .filter(|(_, r)| r.feature_tag == command.target)
        .map(|(i, r)| (r.feature.lookup_list_indices.clone(), i as u16))
        .collect();

    let mut changed = 0;
    for script_record in gsub.script_list.script_records.iter_mut() {
        let script = &mut *script_record.script;
        let lang_systems = script.default_lang_sys.as_mut().into_iter().chain(
            script
                .lang_sys_records
                .iter_mut()
                .map(|record| &mut *record.lang_sys),
        );
        for lang_sys in lang_systems {
            if redirect(lang_sys, features, &mut created, command, options) {
                changed += 1;
            }
        }
    }

    debug!("{command}: {changed} language systems");
    changed
}

fn redirect(
    lang_sys: &mut LangSys,
    features: &mut Vec<FeatureRecord>,
    created: &mut HashMap<Vec<u16>, u16>,
    command: &RemapCommand,
    options: &RemapLayoutOptions,
) -> bool {
    let mut referenced = lang_sys.feature_indices.clone();
    if lang_sys.required_feature_index != NO_REQUIRED_FEATURE {
        referenced.push(lang_sys.required_feature_index);
    }

    let source_lookups: Vec<u16> = referenced
        .iter()
        .filter(|&&i| tag_of(features, i) == Some(command.source))
        .flat_map(|&i| lookups_of(features, i))
        .collect();
    if source_lookups.is_empty() {
        return false;
    }

    let targets: Vec<u16> = lang_sys
        .feature_indices
        .iter()
        .copied()
        .filter(|&i| tag_of(features, i) == Some(command.target))
        .collect();

    let mut lookups: Vec<u16> = targets
        .iter()
        .flat_map(|&i| lookups_of(features, i))
        .chain(source_lookups)
        .collect();
    lookups.sort_unstable();
    lookups.dedup();

    let index = match created.get(&lookups) {
        Some(&index) => index,
        None => {
            let index = features.len() as u16;
            features.push(FeatureRecord::new(
                command.target,
                Feature::new(None, lookups.clone()),
            ));
            created.insert(lookups, index);
            index
        }
    };

    lang_sys.feature_indices.retain(|i| !targets.contains(i));
    if !options.retain_source_feature {
        lang_sys
            .feature_indices
            .retain(|&i| tag_of(features, i) != Some(command.source));
        if tag_of(features, lang_sys.required_feature_index) == Some(command.source) {
            lang_sys.required_feature_index = NO_REQUIRED_FEATURE;
        }
    }
    lang_sys.feature_indices.push(index);
    lang_sys.feature_indices.sort_unstable();
    lang_sys.feature_indices.dedup();
    true
}

fn tag_of(features: &[FeatureRecord], index: u16) -> Option<Tag> {
    features.get(index as usize).map(|r| r.feature_tag)
}

fn lookups_of(features: &[FeatureRecord], index: u16) -> Vec<u16> {
    features
        .get(index as usize)
        .map(|r| r.feature.lookup_list_indices.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    use write_fonts::tables::{
        gsub::SubstitutionLookupList,
        layout::{FeatureList, LangSysRecord, Script, ScriptList, ScriptRecord},
    };

    fn lang_sys_tags(gsub: &Gsub, lang_sys: &LangSys) -> Vec<Tag> {
        lang_sys
            .feature_indices
            .iter()
            .filter_map(|&i| gsub.feature_list.feature_records.get(i as usize))
            .map(|r| r.feature_tag)
            .collect()
    }

    fn gsub(
        features: &[(&[u8; 4], Vec<u16>)],
        default: Vec<u16>,
        dutch: Option<Vec<u16>>,
    ) -> Gsub {
        let records = features
            .iter()
            .map(|(tag, lookups)| {
                FeatureRecord::new(Tag::new(tag), Feature::new(None, lookups.clone()))
            })
            .collect();
        let lang_sys_records = dutch
            .into_iter()
            .map(|indices| LangSysRecord::new(Tag::new(b"NLD "), LangSys::new(indices)))
            .collect();
        let script = Script::new(Some(LangSys::new(default)), lang_sys_records);
        Gsub::new(
            ScriptList::new(vec![ScriptRecord::new(Tag::new(b"latn"), script)]),
            FeatureList::new(records),
            SubstitutionLookupList::new(vec![]),
        )
    }

    fn default_lang_sys(gsub: &Gsub) -> &LangSys {
        gsub.script_list.script_records[0]
            .script
            .default_lang_sys
            .as_ref()
            .unwrap()
    }

    fn command(source: &[u8; 4]) -> RemapCommand {
        RemapCommand {
            source: Tag::new(source),
            target: Tag::new(b"rclt"),
        }
    }

    #[test]
    fn creates_target_feature_with_source_lookups() {
        let mut table = gsub(&[(b"liga", vec![0]), (b"ss01", vec![1])], vec![0, 1], None);

        let changed = inject(&mut table, &[command(b"ss01")], &RemapLayoutOptions::default());

        assert_eq!(changed, 1);
        let records = &table.feature_list.feature_records;
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].feature_tag, Tag::new(b"rclt"));
        assert_eq!(records[2].feature.lookup_list_indices, vec![1]);
        assert_eq!(default_lang_sys(&table).feature_indices, vec![0, 1, 2]);
    }

    #[test]
    fn merges_with_existing_target() {
        let mut table = gsub(&[(b"rclt", vec![4]), (b"ss01", vec![2, 1])], vec![0, 1], None);

        inject(&mut table, &[command(b"ss01")], &RemapLayoutOptions::default());

        let records = &table.feature_list.feature_records;
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].feature.lookup_list_indices, vec![1, 2, 4]);
        assert_eq!(default_lang_sys(&table).feature_indices, vec![1, 2]);
        // The original record stays for anything else that points at it.
        assert_eq!(records[0].feature.lookup_list_indices, vec![4]);
    }

    #[test]
    fn later_commands_extend_earlier_targets() {
        let mut table = gsub(&[(b"ss01", vec![0]), (b"ss02", vec![1])], vec![0, 1], None);

        inject(
            &mut table,
            &[command(b"ss01"), command(b"ss02")],
            &RemapLayoutOptions::default(),
        );

        let lang_sys = default_lang_sys(&table);
        assert_eq!(
            lang_sys_tags(&table, lang_sys),
            vec![Tag::new(b"ss01"), Tag::new(b"ss02"), Tag::new(b"rclt")]
        );
        let target = *lang_sys.feature_indices.last().unwrap() as usize;
        assert_eq!(
            table.feature_list.feature_records[target]
                .feature
                .lookup_list_indices,
            vec![0, 1]
        );
    }

    #[test]
    fn identical_lookup_sets_share_a_record() {
        let mut table = gsub(&[(b"ss01", vec![0])], vec![0], Some(vec![0]));

        let changed = inject(&mut table, &[command(b"ss01")], &RemapLayoutOptions::default());

        assert_eq!(changed, 2);
        assert_eq!(table.feature_list.feature_records.len(), 2);
        let dutch = &table.script_list.script_records[0].script.lang_sys_records[0].lang_sys;
        assert_eq!(dutch.feature_indices, vec![0, 1]);
    }

    #[test]
    fn source_is_dropped_when_not_retained() {
        let mut table = gsub(&[(b"ss01", vec![0]), (b"kern", vec![1])], vec![0, 1], None);
        let options = RemapLayoutOptions::default().with_retain_source_feature(false);

        inject(&mut table, &[command(b"ss01")], &options);

        assert_eq!(default_lang_sys(&table).feature_indices, vec![1, 2]);
    }

    #[test]
    fn lang_sys_without_source_is_untouched() {
        let mut table = gsub(&[(b"ss01", vec![0]), (b"kern", vec![1])], vec![1], None);

        let changed = inject(&mut table, &[command(b"ss01")], &RemapLayoutOptions::default());

        assert_eq!(changed, 0);
        assert_eq!(table.feature_list.feature_records.len(), 2);
        assert_eq!(default_lang_sys(&table).feature_indices, vec![1]);
    }
}
