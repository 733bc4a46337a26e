//! Sources of the two raw blobs a read pass needs: the counter data snapshot and the name table.
use log::debug;

use crate::error::ProviderError;

/// Supplies raw blobs on demand. Any failure is fatal to the read pass requesting the blob.
pub trait BlobProvider {
    /// Raw `PERF_DATA_BLOCK` snapshot, complete or not at all.
    fn fetch_snapshot(&mut self) -> Result<Vec<u8>, ProviderError>;

    /// Raw UTF-16LE name table (`"Counter"` text value).
    fn fetch_name_table(&mut self) -> Result<Vec<u8>, ProviderError>;
}

impl<P: BlobProvider + ?Sized> BlobProvider for Box<P> {
    fn fetch_snapshot(&mut self) -> Result<Vec<u8>, ProviderError> {
        (**self).fetch_snapshot()
    }

    fn fetch_name_table(&mut self) -> Result<Vec<u8>, ProviderError> {
        (**self).fetch_name_table()
    }
}

/// Blobs already in memory, e.g. loaded from files saved on another machine.
#[derive(Clone, Debug, Default)]
pub struct StaticBlobs {
    pub snapshot: Vec<u8>,
    pub name_table: Vec<u8>,
}

impl StaticBlobs {
    pub fn new(snapshot: Vec<u8>, name_table: Vec<u8>) -> Self {
        StaticBlobs {
            snapshot,
            name_table,
        }
    }
}

impl BlobProvider for StaticBlobs {
    fn fetch_snapshot(&mut self) -> Result<Vec<u8>, ProviderError> {
        Ok(self.snapshot.clone())
    }

    fn fetch_name_table(&mut self) -> Result<Vec<u8>, ProviderError> {
        Ok(self.name_table.clone())
    }
}

/// Buffer sizes used while querying a value of unknown size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferGrowth {
    pub initial_size: usize,
    /// Added to the buffer size every time it turns out too small.
    pub increment: usize,
    /// Give up once the buffer would grow past this size.
    pub max_size: usize,
}

impl Default for BufferGrowth {
    fn default() -> Self {
        BufferGrowth {
            initial_size: 1024 * 1024,
            increment: 1024 * 1024,
            max_size: 128 * 1024 * 1024,
        }
    }
}

/// Outcome of a single attempt to fill a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
    /// Data fits, and this many bytes of the buffer are valid.
    Complete(usize),
    /// Buffer is too small.
    MoreData,
}

/// Call `attempt` with a zeroed buffer, growing it by a fixed increment for as long as it
/// reports [`Attempt::MoreData`].
pub fn fetch_growing<F>(growth: &BufferGrowth, mut attempt: F) -> Result<Vec<u8>, ProviderError>
where
    F: FnMut(&mut [u8]) -> Result<Attempt, ProviderError>,
{
    // start with some non-zero size, even if explicit zero were provided
    let mut size = growth.initial_size.max(1).min(growth.max_size);
    let increment = growth.increment.max(1);
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        buffer.resize(size, 0);
        match attempt(&mut buffer)? {
            Attempt::Complete(len) => {
                buffer.truncate(len);
                return Ok(buffer);
            }
            Attempt::MoreData => {
                let next = size.saturating_add(increment);
                if size >= growth.max_size || next > growth.max_size {
                    return Err(ProviderError::SizeExceeded {
                        limit: growth.max_size,
                    });
                }
                debug!("Buffer of {} bytes is too small, retrying with {}", size, next);
                size = next;
            }
        }
    }
}
