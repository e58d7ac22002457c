//! Codepoint sets and the comma-separated range grammar.

use std::collections::BTreeSet;

const MAX_CODEPOINT: u32 = 0x10FFFF;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnicodeParseError {
    #[error("invalid unicode token {0:?}")]
    InvalidToken(String),
}

/// Codepoints to keep, plus (base, selector) variation sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnicodeSet {
    pub codepoints: BTreeSet<u32>,
    pub variation_sequences: BTreeSet<(u32, u32)>,
}

impl UnicodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, codepoint: u32) {
        self.codepoints.insert(codepoint);
    }

    pub fn insert_range(&mut self, start: u32, end: u32) {
        self.codepoints.extend(start..=end);
    }

    pub fn insert_variation_sequence(&mut self, base: u32, selector: u32) {
        self.variation_sequences.insert((base, selector));
    }

    pub fn is_empty(&self) -> bool {
        self.codepoints.is_empty() && self.variation_sequences.is_empty()
    }

    /// Every scalar value the subsetter must keep: plain codepoints, bases
    /// and selectors. Surrogates are skipped.
    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        let sequences = self
            .variation_sequences
            .iter()
            .flat_map(|&(base, selector)| [base, selector]);
        self.codepoints
            .iter()
            .copied()
            .chain(sequences)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(char::from_u32)
    }
}

impl FromIterator<u32> for UnicodeSet {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        Self {
            codepoints: iter.into_iter().collect(),
            variation_sequences: BTreeSet::new(),
        }
    }
}

/// Parse `"41-5A,U+0061,0x2026"` style lists.
///
/// Tokens are comma separated and trimmed; empty tokens are skipped. A token
/// is a hex value or an inclusive `start-end` range, each value optionally
/// prefixed with `U+`, `u+` or `0x`.
///
/// ```
/// use upsetter_font_subsetter::parse_unicodes;
///
/// let set = parse_unicodes("U+41-43, 0x2026").unwrap();
/// assert_eq!(set.codepoints.len(), 4);
/// assert!(parse_unicodes("41-zz").is_err());
/// ```
pub fn parse_unicodes(input: &str) -> Result<UnicodeSet, UnicodeParseError> {
    let mut set = UnicodeSet::new();
    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let invalid = || UnicodeParseError::InvalidToken(token.to_owned());
        match token.split_once('-') {
            Some((start, end)) => {
                let start = parse_codepoint(start).ok_or_else(invalid)?;
                let end = parse_codepoint(end).ok_or_else(invalid)?;
                if start > end {
                    return Err(invalid());
                }
                set.insert_range(start, end);
            }
            None => set.insert(parse_codepoint(token).ok_or_else(invalid)?),
        }
    }
    Ok(set)
}

fn parse_codepoint(value: &str) -> Option<u32> {
    let value = value.trim();
    let hex = ["U+", "u+", "0x", "0X"]
        .iter()
        .find_map(|prefix| value.strip_prefix(prefix))
        .unwrap_or(value);
    if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16)
        .ok()
        .filter(|&cp| cp <= MAX_CODEPOINT)
}
