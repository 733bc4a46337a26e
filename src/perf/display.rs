//! Human readable dump of decoded objects.
use std::fmt;

use crate::perf::model::{PerfCounter, PerfObject, PerfObjects};
use crate::perf::types::DisplayFlags;

const NO_INSTANCE_NAME: &str = "PERF_NO_INSTANCES";

impl fmt::Display for PerfObject {
    /// ```txt
    /// Memory (2 counters, freq 10000000)
    ///   [PERF_NO_INSTANCES]
    ///     Available Bytes = 4294967296
    ///     % Committed Bytes In Use = 40 %
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({} counters, freq {})",
            self.name(),
            self.counter_defs().len(),
            self.perf_freq()
        )?;
        for instance in self.instances() {
            let name = match instance.name() {
                "" => NO_INSTANCE_NAME,
                name => name,
            };
            writeln!(f, "  [{}]", name)?;
            for def in self.counter_defs() {
                // a later definition with the same name overwrote this one
                let last = self.counter_def(def.name());
                if !last.is_some_and(|last| std::ptr::eq(last, def)) {
                    continue;
                }
                let Some(counter) = instance.counter(def.name()) else {
                    continue;
                };
                let suffix = def
                    .type_definition()
                    .display_flags()
                    .map(DisplayFlags::suffix)
                    .unwrap_or("");
                write!(f, "    {} = ", def.name())?;
                write_counter(f, counter, suffix)?;
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

fn write_counter(f: &mut fmt::Formatter<'_>, counter: &PerfCounter, suffix: &str) -> fmt::Result {
    match (&counter.value, &counter.base_value) {
        (Some(value), _) if suffix.is_empty() => write!(f, "{}", value),
        (Some(value), _) => write!(f, "{} {}", value, suffix),
        (None, Some(base)) => write!(f, "{} (base)", base),
        (None, None) => f.write_str("-"),
    }
}

impl fmt::Display for PerfObjects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for object in self {
            writeln!(f, "{}", object)?;
        }
        Ok(())
    }
}
