//! Mapping from counter/object title indices to display names.
use std::collections::HashMap;

use itertools::Itertools;
use log::debug;
use widestring::U16Str;

use crate::format::{split_nul_delimited, utf16le_units};

/// Display names of all registered objects and counters, keyed by title index.
///
/// Built from the `"Counter"` registry text value: UTF-16LE, NUL-separated tokens alternating
/// between a decimal index and a name. Immutable once constructed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameTable {
    // Key is the name index
    table: HashMap<u32, String>,
}

impl NameTable {
    /// Parse a raw name-table blob. Pairs with a non-numeric index are dropped;
    /// an odd leftover token at the end is ignored.
    pub fn parse(raw: &[u8]) -> Self {
        let units = utf16le_units(raw);
        let table = parse_null_separated_key_value_pairs(&split_nul_delimited(&units))
            .into_iter()
            .collect();
        NameTable { table }
    }

    /// Display name for the given title index, or an empty string when there is none.
    pub fn lookup(&self, index: u32) -> &str {
        self.table.get(&index).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl FromIterator<(u32, String)> for NameTable {
    fn from_iter<T: IntoIterator<Item = (u32, String)>>(iter: T) -> Self {
        NameTable {
            table: iter.into_iter().collect(),
        }
    }
}

fn parse_null_separated_key_value_pairs(tokens: &[&U16Str]) -> Vec<(u32, String)> {
    let mut vec = Vec::with_capacity(tokens.len() / 2);

    for (index, value) in tokens.iter().tuples::<(_, _)>() {
        let index_parsed = match index.to_string_lossy().trim().parse::<u32>() {
            Ok(index) => index,
            Err(_) => {
                debug!(
                    "Error parsing index {:?} for value {:?}",
                    index.to_string_lossy(),
                    value.to_string_lossy()
                );
                continue;
            }
        };
        vec.push((index_parsed, value.to_string_lossy()));
    }

    vec
}

#[cfg(test)]
mod test {
    use super::*;

    fn blob(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    #[test]
    fn test_parse_pairs() {
        let names = NameTable::parse(&blob("1\x001847\x002\0System\x004\0Memory\0\0"));
        assert_eq!(names.len(), 3);
        assert_eq!(names.lookup(2), "System");
        assert_eq!(names.lookup(4), "Memory");
        assert_eq!(names.lookup(1), "1847");
    }

    #[test]
    fn test_lookup_miss_is_empty() {
        let names = NameTable::parse(&blob("2\0System\0\0"));
        assert_eq!(names.lookup(3), "");
    }

    #[test]
    fn test_odd_leftover_and_bad_index() {
        let names = NameTable::parse(&blob("x\0Broken\x006\0Processor\x008\0\0"));
        assert_eq!(names.len(), 1);
        assert_eq!(names.lookup(6), "Processor");
        assert_eq!(names.lookup(8), "");
    }

    #[test]
    fn test_empty_blob() {
        assert!(NameTable::parse(&[]).is_empty());
    }
}
