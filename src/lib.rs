//! # Decoder for raw `HKEY_PERFORMANCE_DATA` snapshots
//!
//! A snapshot is a flat, self-describing blob holding every registered performance object,
//! its counter definitions and counter values. [`perf::reader::PerfDataReader`] fetches one
//! from a [`provider::BlobProvider`], resolves title indices through the counter name table,
//! and converts raw counter values into their units.
pub mod config;
pub mod error;
pub mod format;
pub mod perf;
pub mod prelude;
pub mod provider;
#[cfg(windows)]
pub mod reg;
