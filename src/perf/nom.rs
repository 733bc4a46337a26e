//! Nom parsers for performance data structures.
//!
//! Each record of `<WinPerf.h>` is decoded field by field rather than transmuted, so that a
//! snapshot of either byte order can be read on any host. All parsers are pure and only look at
//! the fixed-size part of a record; variable-length tails (names, counter blocks) are resolved by
//! the caller through the lengths and offsets stored in the record itself.
use nom::number::Endianness;
use nom::number::complete as num;
use nom::{IResult, Parser};

use crate::error::{DecodeError, DecodeResult};

type Res<'a, T> = IResult<&'a [u8], T>;

/// `PERF_DATA_BLOCK`, up to and including `DefaultObject`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub signature: [u16; 4],
    pub little_endian: u32,
    pub version: u32,
    pub revision: u32,
    pub total_byte_length: u32,
    pub header_length: u32,
    pub num_object_types: u32,
    pub default_object: i32,
}

/// `PERF_OBJECT_TYPE`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectTypeHeader {
    pub total_byte_length: u32,
    pub definition_length: u32,
    pub header_length: u32,
    pub object_name_title_index: u32,
    pub object_name_title: u32,
    pub object_help_title_index: u32,
    pub object_help_title: u32,
    pub detail_level: u32,
    pub num_counters: u32,
    pub default_counter: i32,
    pub num_instances: i32,
    pub code_page: u32,
    pub perf_time: i64,
    pub perf_freq: i64,
}

/// `PERF_COUNTER_DEFINITION`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterDefinition {
    pub byte_length: u32,
    pub counter_name_title_index: u32,
    pub counter_name_title: u32,
    pub counter_help_title_index: u32,
    pub counter_help_title: u32,
    pub default_scale: i32,
    pub detail_level: u32,
    pub counter_type: u32,
    pub counter_size: u32,
    pub counter_offset: u32,
}

/// `PERF_COUNTER_BLOCK`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterBlock {
    pub byte_length: u32,
}

/// `PERF_INSTANCE_DEFINITION`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceDefinition {
    pub byte_length: u32,
    pub parent_object_title_index: u32,
    pub parent_object_instance: u32,
    pub unique_id: u32,
    pub name_offset: u32,
    pub name_length: u32,
}

/// A fixed-layout record which can be decoded from a snapshot.
pub trait Record: Sized {
    /// Name used in diagnostics.
    const NAME: &'static str;
    /// Number of bytes the record occupies.
    const SIZE: usize;

    fn parse(input: &[u8], endian: Endianness) -> Res<'_, Self>;
}

/// Decode a record of type `R` located `offset` bytes into `bytes`.
pub fn decode<R: Record>(bytes: &[u8], offset: usize, endian: Endianness) -> DecodeResult<R> {
    let available = bytes.len().saturating_sub(offset);
    let truncated = || DecodeError::Truncated {
        record: R::NAME,
        offset,
        needed: R::SIZE,
        available,
    };
    let input = bytes.get(offset..).ok_or_else(truncated)?;
    let (_, record) = R::parse(input, endian).map_err(|_| truncated())?;
    Ok(record)
}

/// Read a counter value of `size` bytes at `offset`. Anything other than 8 is read as 4 bytes.
pub fn counter_value(
    bytes: &[u8],
    offset: usize,
    size: u32,
    endian: Endianness,
) -> DecodeResult<u64> {
    let needed = if size == 8 { 8 } else { 4 };
    let input = bytes
        .get(offset..)
        .filter(|rest| rest.len() >= needed)
        .ok_or(DecodeError::Truncated {
            record: "counter value",
            offset,
            needed,
            available: bytes.len().saturating_sub(offset),
        })?;
    let parsed: Res<'_, u64> = if needed == 8 {
        qword(endian, input)
    } else {
        dword(endian, input).map(|(rest, value)| (rest, value as u64))
    };
    let (_, value) = parsed.map_err(|_| DecodeError::Truncated {
        record: "counter value",
        offset,
        needed,
        available: input.len(),
    })?;
    Ok(value)
}

/// Byte order of a snapshot, taken from the `LittleEndian` flag of `PERF_DATA_BLOCK`.
///
/// The flag itself is always read as a little-endian word at bytes `8..12`.
/// A missing or non-`1` flag means big-endian.
pub fn snapshot_endianness(bytes: &[u8]) -> Endianness {
    match bytes.get(8..12) {
        Some(&[a, b, c, d]) if u32::from_le_bytes([a, b, c, d]) == 1 => Endianness::Little,
        _ => Endianness::Big,
    }
}

impl Header {
    /// Signature as text; `"PERF"` for a valid snapshot.
    pub fn signature(&self) -> String {
        String::from_utf16_lossy(&self.signature)
    }
}

impl Record for Header {
    const NAME: &'static str = "PERF_DATA_BLOCK";
    const SIZE: usize = 4 * 2 + 7 * 4;

    fn parse(i: &[u8], e: Endianness) -> Res<'_, Self> {
        let (i, signature) = (word(e), word(e), word(e), word(e)).parse(i)?;
        let (i, little_endian) = dword(e, i)?;
        let (i, version) = dword(e, i)?;
        let (i, revision) = dword(e, i)?;
        let (i, total_byte_length) = dword(e, i)?;
        let (i, header_length) = dword(e, i)?;
        let (i, num_object_types) = dword(e, i)?;
        let (i, default_object) = long(e, i)?;
        let (a, b, c, d) = signature;
        Ok((
            i,
            Header {
                signature: [a, b, c, d],
                little_endian,
                version,
                revision,
                total_byte_length,
                header_length,
                num_object_types,
                default_object,
            },
        ))
    }
}

impl Record for ObjectTypeHeader {
    const NAME: &'static str = "PERF_OBJECT_TYPE";
    const SIZE: usize = 12 * 4 + 2 * 8;

    fn parse(i: &[u8], e: Endianness) -> Res<'_, Self> {
        let (i, total_byte_length) = dword(e, i)?;
        let (i, definition_length) = dword(e, i)?;
        let (i, header_length) = dword(e, i)?;
        let (i, object_name_title_index) = dword(e, i)?;
        let (i, object_name_title) = dword(e, i)?;
        let (i, object_help_title_index) = dword(e, i)?;
        let (i, object_help_title) = dword(e, i)?;
        let (i, detail_level) = dword(e, i)?;
        let (i, num_counters) = dword(e, i)?;
        let (i, default_counter) = long(e, i)?;
        let (i, num_instances) = long(e, i)?;
        let (i, code_page) = dword(e, i)?;
        let (i, perf_time) = large(e, i)?;
        let (i, perf_freq) = large(e, i)?;
        Ok((
            i,
            ObjectTypeHeader {
                total_byte_length,
                definition_length,
                header_length,
                object_name_title_index,
                object_name_title,
                object_help_title_index,
                object_help_title,
                detail_level,
                num_counters,
                default_counter,
                num_instances,
                code_page,
                perf_time,
                perf_freq,
            },
        ))
    }
}

impl Record for CounterDefinition {
    const NAME: &'static str = "PERF_COUNTER_DEFINITION";
    const SIZE: usize = 10 * 4;

    fn parse(i: &[u8], e: Endianness) -> Res<'_, Self> {
        let (i, byte_length) = dword(e, i)?;
        let (i, counter_name_title_index) = dword(e, i)?;
        let (i, counter_name_title) = dword(e, i)?;
        let (i, counter_help_title_index) = dword(e, i)?;
        let (i, counter_help_title) = dword(e, i)?;
        let (i, default_scale) = long(e, i)?;
        let (i, detail_level) = dword(e, i)?;
        let (i, counter_type) = dword(e, i)?;
        let (i, counter_size) = dword(e, i)?;
        let (i, counter_offset) = dword(e, i)?;
        Ok((
            i,
            CounterDefinition {
                byte_length,
                counter_name_title_index,
                counter_name_title,
                counter_help_title_index,
                counter_help_title,
                default_scale,
                detail_level,
                counter_type,
                counter_size,
                counter_offset,
            },
        ))
    }
}

impl Record for CounterBlock {
    const NAME: &'static str = "PERF_COUNTER_BLOCK";
    const SIZE: usize = 4;

    fn parse(i: &[u8], e: Endianness) -> Res<'_, Self> {
        nom::combinator::map(num::u32(e), |byte_length| CounterBlock { byte_length }).parse(i)
    }
}

impl Record for InstanceDefinition {
    const NAME: &'static str = "PERF_INSTANCE_DEFINITION";
    const SIZE: usize = 6 * 4;

    fn parse(i: &[u8], e: Endianness) -> Res<'_, Self> {
        let (i, byte_length) = dword(e, i)?;
        let (i, parent_object_title_index) = dword(e, i)?;
        let (i, parent_object_instance) = dword(e, i)?;
        let (i, unique_id) = dword(e, i)?;
        let (i, name_offset) = dword(e, i)?;
        let (i, name_length) = dword(e, i)?;
        Ok((
            i,
            InstanceDefinition {
                byte_length,
                parent_object_title_index,
                parent_object_instance,
                unique_id,
                name_offset,
                name_length,
            },
        ))
    }
}

fn word<'a>(e: Endianness) -> impl Parser<&'a [u8], Output = u16, Error = nom::error::Error<&'a [u8]>> {
    num::u16(e)
}

fn dword(e: Endianness, i: &[u8]) -> Res<'_, u32> {
    num::u32(e).parse(i)
}

fn long(e: Endianness, i: &[u8]) -> Res<'_, i32> {
    num::i32(e).parse(i)
}

fn large(e: Endianness, i: &[u8]) -> Res<'_, i64> {
    num::i64(e).parse(i)
}

fn qword(e: Endianness, i: &[u8]) -> Res<'_, u64> {
    num::u64(e).parse(i)
}
