//! GSUB (Glyph Substitution) table processing.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use read_fonts::tables::{
    gsub::{Gsub, SingleSubst, SubstitutionLookup, SubstitutionSubtables},
    layout::CoverageTable,
};

use crate::{
    Result,
    inspect::{FeatureInfo, LayoutFeatures, LookupInfo, SingleSubstitution},
};

impl LayoutFeatures {
    /// Read every GSUB feature together with the lookups it references.
    ///
    /// Records sharing a tag are merged; lookup indices that point past the
    /// lookup list are skipped.
    pub fn from_gsub(gsub: &Gsub) -> Result<Self> {
        let feature_list = gsub.feature_list()?;
        let lookup_list = gsub.lookup_list()?;
        let lookups = lookup_list.lookups();

        let mut cache: HashMap<u16, Option<LookupInfo>> = HashMap::new();
        let mut features = Vec::new();

        for record in feature_list.feature_records() {
            let feature = record.feature(feature_list.offset_data())?;
            let mut infos = Vec::new();
            for index in feature.lookup_list_indices().iter().map(|i| i.get()) {
                if !cache.contains_key(&index) {
                    let info = match lookups.get(index as usize) {
                        Ok(lookup) => Some(read_lookup(index, &lookup)?),
                        Err(_) => None,
                    };
                    cache.insert(index, info);
                }
                if let Some(Some(info)) = cache.get(&index) {
                    infos.push(info.clone());
                }
            }
            features.push(FeatureInfo {
                tag: record.feature_tag(),
                lookups: infos,
            });
        }

        Ok(Self::new(features))
    }
}

fn read_lookup(index: u16, lookup: &SubstitutionLookup<'_>) -> Result<LookupInfo> {
    let (lookup_type, subtables) = match lookup.subtables()? {
        SubstitutionSubtables::Single(tables) => {
            let subtables = tables
                .iter()
                .flatten()
                .map(|table| read_single(&table))
                .collect::<Result<Vec<_>>>()?;
            (1, subtables)
        }
        SubstitutionSubtables::Multiple(_) => (2, vec![]),
        SubstitutionSubtables::Alternate(_) => (3, vec![]),
        SubstitutionSubtables::Ligature(_) => (4, vec![]),
        SubstitutionSubtables::Contextual(_) => (5, vec![]),
        SubstitutionSubtables::ChainContextual(_) => (6, vec![]),
        SubstitutionSubtables::Reverse(_) => (8, vec![]),
    };
    Ok(LookupInfo {
        index,
        lookup_type,
        subtables,
    })
}

fn read_single(subtable: &SingleSubst<'_>) -> Result<SingleSubstitution> {
    let mut mapping = BTreeMap::new();
    match subtable {
        SingleSubst::Format1(fmt) => {
            let delta = fmt.delta_glyph_id() as i32;
            for gid in Coverage(fmt.coverage()?).iter() {
                mapping.insert(gid, ((gid as i32 + delta) & 0xFFFF) as u16);
            }
        }
        SingleSubst::Format2(fmt) => {
            let subs = fmt.substitute_glyph_ids();
            for (i, gid) in Coverage(fmt.coverage()?).iter().enumerate() {
                if let Some(new) = subs.get(i) {
                    mapping.insert(gid, new.get().to_u32() as u16);
                }
            }
        }
    }
    Ok(SingleSubstitution(mapping))
}

/// A map of glyph substitutions composed from single-substitution lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphSubstitutions(HashMap<u16, u16>);

impl GlyphSubstitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compose the single substitutions of the given features in lookup
    /// order. Each lookup is applied once even when several features share it.
    pub fn from_features<'a>(features: impl IntoIterator<Item = &'a FeatureInfo>) -> Self {
        let lookups: BTreeMap<u16, &LookupInfo> = features
            .into_iter()
            .flat_map(|f| f.lookups.iter())
            .map(|l| (l.index, l))
            .collect();

        let mut subs = Self::new();
        for lookup in lookups.values() {
            // The first subtable covering a glyph wins.
            let mut pass = HashMap::new();
            for subtable in &lookup.subtables {
                for (&from, &to) in &subtable.0 {
                    pass.entry(from).or_insert(to);
                }
            }
            subs.apply_lookup(&pass);
        }
        subs
    }

    /// Run one lookup over the current images. Every glyph is substituted at
    /// most once per lookup.
    pub fn apply_lookup(&mut self, lookup: &HashMap<u16, u16>) {
        for image in self.0.values_mut() {
            if let Some(&to) = lookup.get(image) {
                *image = to;
            }
        }
        for (&from, &to) in lookup {
            self.0.entry(from).or_insert(to);
        }
    }

    pub fn remap(&self, gid: u16) -> u16 {
        self.0.get(&gid).copied().unwrap_or(gid)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Lookup indices touched, for statistics.
    pub fn lookup_count<'a>(features: impl IntoIterator<Item = &'a FeatureInfo>) -> usize {
        features
            .into_iter()
            .flat_map(|f| f.lookups.iter().map(|l| l.index))
            .collect::<BTreeSet<_>>()
            .len()
    }
}

struct Coverage<'a>(CoverageTable<'a>);

impl Coverage<'_> {
    fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        match &self.0 {
            CoverageTable::Format1(f) => {
                Box::new(f.glyph_array().iter().map(|g| g.get().to_u32() as u16))
                    as Box<dyn Iterator<Item = u16>>
            }
            CoverageTable::Format2(f) => Box::new(f.range_records().iter().flat_map(|r| {
                let start = r.start_glyph_id().to_u32() as u16;
                let end = r.end_glyph_id().to_u32() as u16;
                start..=end
            })),
        }
    }
}
