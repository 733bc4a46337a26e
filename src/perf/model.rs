//! Decoded, name-resolved view of a performance data snapshot.
use std::collections::{BTreeMap, HashMap};

use crate::perf::types::CounterTypeDefinition;
use crate::perf::values::CounterValue;

/// Metadata of one counter of an object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterDef {
    name: String,
    offset: u32,
    size: u32,
    counter_type: u32,
    is_base: bool,
}

impl CounterDef {
    pub fn new(name: impl Into<String>, offset: u32, size: u32, counter_type: u32) -> Self {
        CounterDef {
            name: name.into(),
            offset,
            size,
            counter_type,
            is_base: CounterTypeDefinition::from_raw(counter_type).is_base(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte offset relative to the start of a counter block.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Size of the value in bytes, normally 4 or 8.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Raw `CounterType` word.
    pub fn counter_type(&self) -> u32 {
        self.counter_type
    }

    pub fn type_definition(&self) -> CounterTypeDefinition {
        CounterTypeDefinition::from_raw(self.counter_type)
    }

    pub fn is_base(&self) -> bool {
        self.is_base
    }
}

/// A single counter reading. Exactly one of the two fields is set by the decoder,
/// depending on whether the owning definition is a base counter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PerfCounter {
    pub value: Option<CounterValue>,
    pub base_value: Option<CounterValue>,
}

impl PerfCounter {
    /// Store `raw` into `value` or `base_value`, as dictated by `def`.
    pub fn from_raw(def: &CounterDef, raw: u64) -> Self {
        let raw = Some(CounterValue::Integer(raw));
        if def.is_base() {
            PerfCounter {
                value: None,
                base_value: raw,
            }
        } else {
            PerfCounter {
                value: raw,
                base_value: None,
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PerfInstance {
    name: String,
    counters: BTreeMap<String, PerfCounter>,
}

impl PerfInstance {
    pub fn new(name: impl Into<String>, counters: BTreeMap<String, PerfCounter>) -> Self {
        PerfInstance {
            name: name.into(),
            counters,
        }
    }

    /// Instance name; empty for the implicit instance of an object without instances.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn counters(&self) -> &BTreeMap<String, PerfCounter> {
        &self.counters
    }

    pub fn counter(&self, name: &str) -> Option<&PerfCounter> {
        self.counters.get(name)
    }

    pub(crate) fn counters_mut(&mut self) -> &mut BTreeMap<String, PerfCounter> {
        &mut self.counters
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PerfObject {
    name: String,
    counter_defs: Vec<CounterDef>,
    instances: Vec<PerfInstance>,
    perf_time: i64,
    perf_freq: i64,
}

impl PerfObject {
    pub fn new(
        name: impl Into<String>,
        counter_defs: Vec<CounterDef>,
        instances: Vec<PerfInstance>,
        perf_time: i64,
        perf_freq: i64,
    ) -> Self {
        PerfObject {
            name: name.into(),
            counter_defs,
            instances,
            perf_time,
            perf_freq,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn counter_defs(&self) -> &[CounterDef] {
        &self.counter_defs
    }

    pub fn counter_def(&self, name: &str) -> Option<&CounterDef> {
        self.counter_defs.iter().rev().find(|def| def.name() == name)
    }

    pub fn instances(&self) -> &[PerfInstance] {
        &self.instances
    }

    pub fn instance(&self, name: &str) -> Option<&PerfInstance> {
        self.instances.iter().find(|instance| instance.name() == name)
    }

    /// Object's `PerfTime`, in ticks of `perf_freq`.
    pub fn perf_time(&self) -> i64 {
        self.perf_time
    }

    /// Object's `PerfFreq`, ticks per second.
    pub fn perf_freq(&self) -> i64 {
        self.perf_freq
    }

    pub(crate) fn split_mut(&mut self) -> (&[CounterDef], &mut [PerfInstance]) {
        (&self.counter_defs, &mut self.instances)
    }
}

/// Objects of a snapshot keyed by display name, in the order they were first encountered.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PerfObjects {
    objects: Vec<PerfObject>,
    index: HashMap<String, usize>,
}

impl PerfObjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object under its own name. An object with the same name is replaced in place
    /// and returned.
    pub fn insert(&mut self, object: PerfObject) -> Option<PerfObject> {
        if let Some(&position) = self.index.get(object.name()) {
            return Some(std::mem::replace(&mut self.objects[position], object));
        }
        self.index.insert(object.name().to_owned(), self.objects.len());
        self.objects.push(object);
        None
    }

    pub fn get(&self, name: &str) -> Option<&PerfObject> {
        self.index.get(name).map(|&position| &self.objects[position])
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.objects.iter().map(PerfObject::name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PerfObject> {
        self.objects.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, PerfObject> {
        self.objects.iter_mut()
    }
}

impl IntoIterator for PerfObjects {
    type Item = PerfObject;
    type IntoIter = std::vec::IntoIter<PerfObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.into_iter()
    }
}

impl<'a> IntoIterator for &'a PerfObjects {
    type Item = &'a PerfObject;
    type IntoIter = std::slice::Iter<'a, PerfObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn object(name: &str, freq: i64) -> PerfObject {
        PerfObject::new(name, vec![], vec![PerfInstance::new("", BTreeMap::new())], 0, freq)
    }

    #[test]
    fn test_insert_keeps_first_position() {
        let mut objects = PerfObjects::new();
        assert!(objects.insert(object("Memory", 1)).is_none());
        assert!(objects.insert(object("Processor", 2)).is_none());
        let replaced = objects.insert(object("Memory", 3)).expect("replaced");
        assert_eq!(replaced.perf_freq(), 1);
        assert_eq!(objects.len(), 2);
        assert_eq!(objects.names().collect::<Vec<_>>(), ["Memory", "Processor"]);
        assert_eq!(objects.get("Memory").map(PerfObject::perf_freq), Some(3));
    }

    #[test]
    fn test_counter_from_raw() {
        let base = CounterDef::new("% Free Space Base", 4, 4, 0x4003_0403);
        assert!(base.is_base());
        let counter = PerfCounter::from_raw(&base, 42);
        assert_eq!(counter.value, None);
        assert_eq!(counter.base_value, Some(CounterValue::Integer(42)));
        let def = CounterDef::new("Cache Faults", 0, 8, 0x0000_0100);
        let counter = PerfCounter::from_raw(&def, 7);
        assert_eq!(counter.value, Some(CounterValue::Integer(7)));
        assert_eq!(counter.base_value, None);
    }
}
