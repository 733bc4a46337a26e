//! Walks a raw snapshot and produces name-resolved objects.
//!
//! Layout of a snapshot, all offsets counted from the start of the enclosing structure:
//!
//! ```txt
//! PERF_DATA_BLOCK
//!   [HeaderLength] -> NumObjectTypes x PERF_OBJECT_TYPE, each TotalByteLength long:
//!     [HeaderLength]     -> NumCounters x PERF_COUNTER_DEFINITION, each ByteLength long
//!     [DefinitionLength] -> either a single PERF_COUNTER_BLOCK (no instances), or
//!                           NumInstances x (PERF_INSTANCE_DEFINITION, PERF_COUNTER_BLOCK)
//! ```
use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info, warn};
use nom::number::Endianness;

use crate::config::ObjectFilter;
use crate::error::{DecodeError, DecodeResult, ReadError};
use crate::format::utf16le_trimmed;
use crate::perf::model::{CounterDef, PerfCounter, PerfInstance, PerfObject, PerfObjects};
use crate::perf::names::NameTable;
use crate::perf::nom::{
    self as records, CounterBlock, CounterDefinition, Header, InstanceDefinition, ObjectTypeHeader,
    Record,
};
use crate::perf::types::{CounterTypeDefinition, PERF_NO_INSTANCES};
use crate::perf::values::RawObjects;

const SIGNATURE: &str = "PERF";

/// Why an object was left out of the result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Title index has no display name.
    UnresolvedName { title_index: u32 },
    /// Name is not in the configured whitelist.
    Filtered,
    /// Counter definitions or counter data could not be decoded.
    Malformed {
        name: String,
        error: DecodeError,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnresolvedName { title_index } => {
                write!(f, "no name for title index {}", title_index)
            }
            SkipReason::Filtered => f.write_str("not whitelisted"),
            SkipReason::Malformed { name, error } => write!(f, "object {:?}: {}", name, error),
        }
    }
}

/// Result of one attempt to decode an object, consumed by the object loop.
#[derive(Debug)]
pub enum ObjectOutcome {
    /// Object decoded; the cursor moves by the given number of bytes.
    Decoded(PerfObject, usize),
    /// Object left out; the cursor still moves by the given number of bytes.
    Skipped(SkipReason, usize),
    /// Object header unreadable: its length is unknown, so nothing after it can be located.
    Fatal(DecodeError),
}

/// One decode pass over a snapshot.
pub struct ObjectGraphBuilder<'a> {
    names: &'a NameTable,
    filter: Option<&'a ObjectFilter>,
}

/// Snapshot-wide decoding state shared by every object of a pass.
struct Snapshot<'b> {
    bytes: &'b [u8],
    endian: Endianness,
}

impl<'a> ObjectGraphBuilder<'a> {
    pub fn new(names: &'a NameTable) -> Self {
        ObjectGraphBuilder {
            names,
            filter: None,
        }
    }

    /// Only decode objects whose display name passes the filter. Produces the same result as
    /// decoding everything and filtering afterwards, only faster.
    pub fn with_filter(mut self, filter: Option<&'a ObjectFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Decode the whole snapshot.
    ///
    /// Fails only if the snapshot header is unreadable or its signature is wrong. Objects which
    /// can not be decoded are skipped with a diagnostic; a truncated object header stops the
    /// walk, keeping everything decoded so far.
    pub fn build(&self, bytes: &[u8]) -> Result<RawObjects, ReadError> {
        let endian = records::snapshot_endianness(bytes);
        let header: Header = records::decode(bytes, 0, endian).map_err(ReadError::Header)?;
        let signature = header.signature();
        if signature != SIGNATURE {
            return Err(ReadError::SignatureMismatch { found: signature });
        }
        debug!(
            "Performance data v{}.{}: {:?} endian, {} bytes, {} object types",
            header.version,
            header.revision,
            endian,
            header.total_byte_length,
            header.num_object_types
        );

        let snapshot = Snapshot { bytes, endian };
        let mut objects = PerfObjects::new();
        let mut cursor = header.header_length as usize;

        for _ in 0..header.num_object_types {
            let advance = match self.decode_object(&snapshot, cursor) {
                ObjectOutcome::Decoded(object, advance) => {
                    if let Some(previous) = objects.insert(object) {
                        info!("Duplicate object {:?}, keeping the last one", previous.name());
                    }
                    advance
                }
                ObjectOutcome::Skipped(SkipReason::Malformed { name, error }, advance) => {
                    warn!("Skipping object {:?} at offset {}: {}", name, cursor, error);
                    advance
                }
                ObjectOutcome::Skipped(reason, advance) => {
                    debug!("Skipping object at offset {}: {}", cursor, reason);
                    advance
                }
                ObjectOutcome::Fatal(error) => {
                    warn!("Stopped reading objects at offset {}: {}", cursor, error);
                    break;
                }
            };
            cursor = match cursor.checked_add(advance) {
                Some(next) => next,
                None => {
                    warn!("Object at offset {} claims {} bytes, stopping", cursor, advance);
                    break;
                }
            };
        }

        Ok(RawObjects::new(objects))
    }

    /// Decode one `PERF_OBJECT_TYPE` starting at `start`.
    fn decode_object(&self, snapshot: &Snapshot, start: usize) -> ObjectOutcome {
        let object_type: ObjectTypeHeader =
            match records::decode(snapshot.bytes, start, snapshot.endian) {
                Ok(object_type) => object_type,
                Err(error) => return ObjectOutcome::Fatal(error),
            };
        let advance = object_type.total_byte_length as usize;

        let name = self.names.lookup(object_type.object_name_title_index);
        if name.is_empty() {
            let title_index = object_type.object_name_title_index;
            return ObjectOutcome::Skipped(SkipReason::UnresolvedName { title_index }, advance);
        }
        if let Some(filter) = self.filter {
            if !filter.allows(name) {
                return ObjectOutcome::Skipped(SkipReason::Filtered, advance);
            }
        }

        match self.decode_object_body(snapshot, start, &object_type, name) {
            Ok(object) => ObjectOutcome::Decoded(object, advance),
            Err(error) => {
                let name = name.to_owned();
                ObjectOutcome::Skipped(SkipReason::Malformed { name, error }, advance)
            }
        }
    }

    fn decode_object_body(
        &self,
        snapshot: &Snapshot,
        start: usize,
        object_type: &ObjectTypeHeader,
        name: &str,
    ) -> DecodeResult<PerfObject> {
        let counter_defs = self.decode_counter_defs(snapshot, start, object_type, name)?;
        let block_base = offset(start, object_type.definition_length, "counter data")?;

        let instances = match object_type.num_instances {
            PERF_NO_INSTANCES | 0 => {
                let counters = read_counters(snapshot, block_base, &counter_defs)?;
                vec![PerfInstance::new("", counters)]
            }
            n => {
                // negative counts other than PERF_NO_INSTANCES read as huge unsigned ones,
                // and will run into the end of the buffer
                let mut instances = Vec::new();
                let mut cursor = block_base;
                for _ in 0..(n as u32) {
                    let (instance, next) = decode_instance(snapshot, cursor, &counter_defs)?;
                    if next <= cursor {
                        return Err(DecodeError::NoProgress {
                            record: "instance",
                            offset: cursor,
                        });
                    }
                    instances.push(instance);
                    cursor = next;
                }
                instances
            }
        };

        Ok(PerfObject::new(
            name,
            counter_defs,
            instances,
            object_type.perf_time,
            object_type.perf_freq,
        ))
    }

    fn decode_counter_defs(
        &self,
        snapshot: &Snapshot,
        start: usize,
        object_type: &ObjectTypeHeader,
        object_name: &str,
    ) -> DecodeResult<Vec<CounterDef>> {
        let mut defs = Vec::with_capacity(object_type.num_counters.min(256) as usize);
        let mut cursor = offset(start, object_type.header_length, "counter definitions")?;

        for _ in 0..object_type.num_counters {
            let raw: CounterDefinition = records::decode(snapshot.bytes, cursor, snapshot.endian)?;
            // a shorter record would overlap the next one, or never move on at all
            if (raw.byte_length as usize) < CounterDefinition::SIZE {
                return Err(DecodeError::NoProgress {
                    record: "counter definition",
                    offset: cursor,
                });
            }
            let counter_type = CounterTypeDefinition::from_raw(raw.counter_type);
            let name = self.names.lookup(raw.counter_name_title_index);
            if name.is_empty() {
                debug!(
                    "Object {:?}: dropping counter without a name, title index {}, {:?}",
                    object_name, raw.counter_name_title_index, counter_type
                );
            } else {
                let expected = counter_type.size().byte_len();
                if expected.is_some_and(|len| len != raw.counter_size) {
                    debug!(
                        "Object {:?}: counter {:?} is {} bytes, its type says {:?}",
                        object_name,
                        name,
                        raw.counter_size,
                        counter_type
                    );
                }
                defs.push(CounterDef::new(
                    name,
                    raw.counter_offset,
                    raw.counter_size,
                    raw.counter_type,
                ));
            }
            cursor = offset(cursor, raw.byte_length, "counter definition")?;
        }

        Ok(defs)
    }
}

/// Decode a `PERF_INSTANCE_DEFINITION` and its counter block. Returns the instance and the
/// offset right after its counter block.
fn decode_instance(
    snapshot: &Snapshot,
    start: usize,
    defs: &[CounterDef],
) -> DecodeResult<(PerfInstance, usize)> {
    let raw: InstanceDefinition = records::decode(snapshot.bytes, start, snapshot.endian)?;

    let name_start = offset(start, raw.name_offset, "instance name")?;
    let name_end = offset(name_start, raw.name_length, "instance name")?;
    let name_bytes = snapshot
        .bytes
        .get(name_start..name_end)
        .ok_or(DecodeError::Truncated {
            record: "instance name",
            offset: name_start,
            needed: raw.name_length as usize,
            available: snapshot.bytes.len().saturating_sub(name_start),
        })?;
    let name = utf16le_trimmed(name_bytes);

    let block_start = offset(start, raw.byte_length, "counter block")?;
    let block: CounterBlock = records::decode(snapshot.bytes, block_start, snapshot.endian)?;
    let counters = read_counters(snapshot, block_start, defs)?;
    let next = offset(block_start, block.byte_length, "next instance")?;

    Ok((PerfInstance::new(name, counters), next))
}

/// Read every counter of `defs` from the counter block starting at `block_start`.
fn read_counters(
    snapshot: &Snapshot,
    block_start: usize,
    defs: &[CounterDef],
) -> DecodeResult<BTreeMap<String, PerfCounter>> {
    let mut counters = BTreeMap::new();
    for def in defs {
        let at = offset(block_start, def.offset(), "counter value")?;
        let raw = records::counter_value(snapshot.bytes, at, def.size(), snapshot.endian)?;
        counters.insert(def.name().to_owned(), PerfCounter::from_raw(def, raw));
    }
    Ok(counters)
}

fn offset(base: usize, delta: u32, record: &'static str) -> DecodeResult<usize> {
    let delta = delta as usize;
    base.checked_add(delta)
        .ok_or(DecodeError::OffsetOverflow {
            record,
            base,
            delta,
        })
}
