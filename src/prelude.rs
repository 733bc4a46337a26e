//! Everything you need to get started with reading performance data.
pub use crate::config::{ObjectFilter, ProviderConfig, ReaderConfig};
pub use crate::error::{DecodeError, ProviderError, ReadError};
pub use crate::perf::builder::{ObjectGraphBuilder, SkipReason};
pub use crate::perf::model::{CounterDef, PerfCounter, PerfInstance, PerfObject, PerfObjects};
pub use crate::perf::names::NameTable;
pub use crate::perf::reader::PerfDataReader;
pub use crate::perf::values::{CounterValue, CounterValueInterpreter, RawObjects};
pub use crate::provider::{BlobProvider, BufferGrowth, StaticBlobs};
#[cfg(windows)]
pub use crate::reg::RegistryBlobs;
