//! Reader facade: fetch blobs, decode objects, convert values.
use std::sync::Arc;

use log::{debug, warn};

use crate::config::ReaderConfig;
use crate::error::ReadError;
use crate::perf::builder::ObjectGraphBuilder;
use crate::perf::model::PerfObjects;
use crate::perf::names::NameTable;
use crate::perf::values::RawObjects;
use crate::provider::BlobProvider;

/// Reads performance data snapshots from a [`BlobProvider`].
///
/// The name table is fetched and parsed once, on first use, and reused by every later pass.
/// It is handed out as an `Arc` so that several readers may share it.
pub struct PerfDataReader<P> {
    provider: P,
    config: ReaderConfig,
    names: Option<Arc<NameTable>>,
}

impl<P: BlobProvider> PerfDataReader<P> {
    pub fn new(provider: P, config: ReaderConfig) -> Self {
        PerfDataReader {
            provider,
            config,
            names: None,
        }
    }

    /// Reader with an already parsed name table; the provider's name table is never fetched.
    pub fn with_name_table(provider: P, config: ReaderConfig, names: Arc<NameTable>) -> Self {
        PerfDataReader {
            provider,
            config,
            names: Some(names),
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Name table, fetched and parsed on the first call only.
    pub fn name_table(&mut self) -> Result<Arc<NameTable>, ReadError> {
        if let Some(names) = &self.names {
            return Ok(Arc::clone(names));
        }
        let raw = self.provider.fetch_name_table().inspect_err(|error| {
            warn!("Failed to fetch counter names: {}", error);
        })?;
        let names = Arc::new(NameTable::parse(&raw));
        debug!("Loaded {} counter names", names.len());
        self.names = Some(Arc::clone(&names));
        Ok(names)
    }

    /// Fetch a snapshot and decode it, leaving counter values raw.
    pub fn read_raw(&mut self) -> Result<RawObjects, ReadError> {
        let names = self.name_table()?;
        let snapshot = self.provider.fetch_snapshot().inspect_err(|error| {
            warn!("Failed to fetch performance data: {}", error);
        })?;
        ObjectGraphBuilder::new(&names)
            .with_filter(self.config.object_whitelist.as_ref())
            .build(&snapshot)
            .inspect_err(|error| warn!("Failed to read performance data: {}", error))
    }

    /// Fetch a snapshot, decode it and convert every counter value into its unit.
    pub fn read(&mut self) -> Result<PerfObjects, ReadError> {
        Ok(self.read_raw()?.into_converted())
    }

    pub fn into_provider(self) -> P {
        self.provider
    }
}
