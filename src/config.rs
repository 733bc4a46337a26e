use std::collections::HashSet;

use crate::provider::BufferGrowth;

/// Set of object display names to decode; everything else is skipped without being parsed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectFilter {
    names: HashSet<String>,
}

impl ObjectFilter {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ObjectFilter {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ObjectFilter {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        ObjectFilter::new(iter)
    }
}

/// Settings of a [`PerfDataReader`](crate::perf::reader::PerfDataReader).
#[derive(Clone, Debug, Default)]
pub struct ReaderConfig {
    /// When set, only objects with these display names are decoded.
    pub object_whitelist: Option<ObjectFilter>,
}

impl ReaderConfig {
    pub fn with_whitelist<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.object_whitelist = Some(ObjectFilter::new(names));
        self
    }
}

/// Settings of the live registry provider.
#[derive(Clone, Debug, Default)]
pub struct ProviderConfig {
    pub growth: BufferGrowth,
    /// Read names from the English table instead of the user's UI language.
    pub english_names: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_filter() {
        let filter: ObjectFilter = ["Memory", "Processor Information"].into_iter().collect();
        assert_eq!(filter.len(), 2);
        assert!(filter.allows("Memory"));
        assert!(!filter.allows("memory"));
        assert!(!filter.allows("LogicalDisk"));
    }

    #[test]
    fn test_default_config_decodes_everything() {
        let config = ReaderConfig::default();
        assert!(config.object_whitelist.is_none());
        let config = config.with_whitelist(["Memory"]);
        assert!(config.object_whitelist.is_some_and(|f| f.allows("Memory")));
    }
}
