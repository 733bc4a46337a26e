//! Counter values and their conversion into meaningful units.
use std::collections::HashMap;
use std::fmt;

use log::warn;

use crate::perf::model::{CounterDef, PerfObject, PerfObjects};
use crate::perf::types::*;

/// 100ns ticks between 1601-01-01 (Windows FILETIME epoch) and 1970-01-01.
pub const WINDOWS_EPOCH_TICKS: u64 = 116_444_736_000_000_000;

/// 100ns ticks per second.
const TICKS_PER_SECOND: f64 = 1e7;

/// Owned counter value: raw integer as read from a counter block, or a converted number.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum CounterValue {
    Integer(u64),
    Float(f64),
}

impl CounterValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            CounterValue::Integer(value) => value as f64,
            CounterValue::Float(value) => value,
        }
    }

    /// Raw integer, `None` once the value has been converted.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            CounterValue::Integer(value) => Some(value),
            CounterValue::Float(_) => None,
        }
    }
}

impl fmt::Display for CounterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterValue::Integer(value) => write!(f, "{}", value),
            CounterValue::Float(value) => write!(f, "{}", value),
        }
    }
}

/// Unit conversion applied to a raw value of a given counter type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Conversion {
    /// `PERF_ELAPSED_TIME`: FILETIME-based start time, scaled by the object's frequency.
    ElapsedSeconds,
    /// `PERF_100NSEC_TIMER` and `PERF_PRECISION_100NS_TIMER`: 100ns ticks to seconds.
    HundredNanoseconds,
    Unchanged,
}

impl Conversion {
    pub fn for_counter_type(counter_type: u32) -> Self {
        match counter_type {
            PERF_ELAPSED_TIME => Conversion::ElapsedSeconds,
            PERF_100NSEC_TIMER | PERF_PRECISION_100NS_TIMER => Conversion::HundredNanoseconds,
            _ => Conversion::Unchanged,
        }
    }

    /// Convert a single value. `None` means the value must stay as it is.
    pub fn apply(self, value: CounterValue, perf_freq: i64) -> Option<CounterValue> {
        let raw = match value {
            CounterValue::Integer(raw) => raw,
            // already converted
            CounterValue::Float(_) => return None,
        };
        match self {
            Conversion::ElapsedSeconds => {
                if perf_freq == 0 {
                    return None;
                }
                let ticks = raw as i128 - WINDOWS_EPOCH_TICKS as i128;
                Some(CounterValue::Float(ticks as f64 / perf_freq as f64))
            }
            Conversion::HundredNanoseconds => {
                Some(CounterValue::Float(raw as f64 / TICKS_PER_SECOND))
            }
            Conversion::Unchanged => None,
        }
    }
}

/// Freshly built objects whose counters still hold raw values.
///
/// This is the only input accepted by [`CounterValueInterpreter`], which consumes it; a map can
/// therefore not be converted twice.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawObjects {
    inner: PerfObjects,
}

impl RawObjects {
    pub(crate) fn new(inner: PerfObjects) -> Self {
        RawObjects { inner }
    }

    /// Read-only access to raw values.
    pub fn objects(&self) -> &PerfObjects {
        &self.inner
    }

    /// Give up on conversion and keep raw values as they are.
    pub fn into_unconverted(self) -> PerfObjects {
        self.inner
    }

    pub fn into_converted(self) -> PerfObjects {
        CounterValueInterpreter::convert(self)
    }
}

/// Second pass over a decoded snapshot, rewriting raw counter values into unit-correct numbers.
pub struct CounterValueInterpreter;

impl CounterValueInterpreter {
    pub fn convert(raw: RawObjects) -> PerfObjects {
        let mut objects = raw.inner;
        for object in objects.iter_mut() {
            convert_object(object);
        }
        objects
    }
}

fn convert_object(object: &mut PerfObject) {
    let perf_freq = object.perf_freq();
    let name = object.name().to_owned();
    let (defs, instances) = object.split_mut();

    // the last definition of a name is the one whose value ended up in the instance
    let conversions: HashMap<&str, Conversion> = defs
        .iter()
        .map(|def: &CounterDef| (def.name(), Conversion::for_counter_type(def.counter_type())))
        .collect();
    let mut zero_freq_warned = false;

    for instance in instances {
        for (counter_name, counter) in instance.counters_mut().iter_mut() {
            let conversion = match conversions.get(counter_name.as_str()) {
                Some(&conversion) if conversion != Conversion::Unchanged => conversion,
                _ => continue,
            };
            if conversion == Conversion::ElapsedSeconds && perf_freq == 0 && !zero_freq_warned {
                warn!("Object {name:?} has zero PerfFreq, elapsed time counters left unconverted");
                zero_freq_warned = true;
            }
            if let Some(value) = counter.value {
                if let Some(converted) = conversion.apply(value, perf_freq) {
                    counter.value = Some(converted);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use super::*;
    use crate::perf::model::{PerfCounter, PerfInstance};

    fn single(def: CounterDef, raw: u64, perf_freq: i64) -> RawObjects {
        let mut counters = BTreeMap::new();
        counters.insert(def.name().to_owned(), PerfCounter::from_raw(&def, raw));
        let object = PerfObject::new(
            "System",
            vec![def],
            vec![PerfInstance::new("", counters)],
            0,
            perf_freq,
        );
        let mut objects = PerfObjects::new();
        objects.insert(object);
        RawObjects::new(objects)
    }

    fn value_of(objects: &PerfObjects, counter: &str) -> Option<CounterValue> {
        objects.get("System")?.instances()[0].counter(counter)?.value
    }

    #[test]
    fn test_elapsed_time() {
        let freq = 10_000_000;
        let def = CounterDef::new("System Up Time", 0, 8, PERF_ELAPSED_TIME);
        let raw = single(def, WINDOWS_EPOCH_TICKS + freq as u64 * 10, freq);
        let objects = CounterValueInterpreter::convert(raw);
        assert_eq!(value_of(&objects, "System Up Time"), Some(CounterValue::Float(10.0)));
    }

    #[test]
    fn test_elapsed_time_zero_frequency() {
        let def = CounterDef::new("System Up Time", 0, 8, PERF_ELAPSED_TIME);
        let raw = single(def, WINDOWS_EPOCH_TICKS, 0);
        let objects = raw.into_converted();
        assert_eq!(
            value_of(&objects, "System Up Time"),
            Some(CounterValue::Integer(WINDOWS_EPOCH_TICKS))
        );
    }

    #[test]
    fn test_100ns_timers() {
        for typ in [PERF_100NSEC_TIMER, PERF_PRECISION_100NS_TIMER] {
            let def = CounterDef::new("% Processor Time", 0, 8, typ);
            let objects = single(def, 10_000_000, 1).into_converted();
            assert_eq!(
                value_of(&objects, "% Processor Time"),
                Some(CounterValue::Float(1.0))
            );
        }
    }

    #[test]
    fn test_other_types_unchanged() {
        let def = CounterDef::new("Processes", 0, 4, 0x0000_0000);
        let objects = single(def, 201, 1).into_converted();
        assert_eq!(value_of(&objects, "Processes"), Some(CounterValue::Integer(201)));
    }

    #[test]
    fn test_conversion_classification() {
        assert_eq!(
            Conversion::for_counter_type(PERF_ELAPSED_TIME),
            Conversion::ElapsedSeconds
        );
        assert_eq!(
            Conversion::for_counter_type(PERF_PRECISION_100NS_TIMER),
            Conversion::HundredNanoseconds
        );
        // flags must match exactly
        assert_eq!(
            Conversion::for_counter_type(PERF_100NSEC_TIMER | PERF_INVERSE_COUNTER),
            Conversion::Unchanged
        );
        assert_eq!(
            Conversion::HundredNanoseconds.apply(CounterValue::Float(1.0), 1),
            None
        );
    }

    #[test]
    fn test_elapsed_before_epoch_is_negative() {
        let converted = Conversion::ElapsedSeconds.apply(CounterValue::Integer(0), 1);
        assert_eq!(
            converted,
            Some(CounterValue::Float(-(WINDOWS_EPOCH_TICKS as f64)))
        );
    }
}
