//! Synthetic snapshot encoder writing `<WinPerf.h>` layouts in either byte order.
#![allow(dead_code)]

pub const HEADER_LENGTH: u32 = 48;
const OBJECT_HEADER_LENGTH: u32 = 64;
const COUNTER_DEFINITION_LENGTH: u32 = 40;
const INSTANCE_DEFINITION_LENGTH: u32 = 24;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    Little,
    Big,
}

struct Writer {
    buf: Vec<u8>,
    order: Order,
}

impl Writer {
    fn new(order: Order) -> Self {
        Writer {
            buf: Vec::new(),
            order,
        }
    }

    fn u16(&mut self, v: u16) {
        let bytes = match self.order {
            Order::Little => v.to_le_bytes(),
            Order::Big => v.to_be_bytes(),
        };
        self.buf.extend(bytes);
    }

    fn u32(&mut self, v: u32) {
        let bytes = match self.order {
            Order::Little => v.to_le_bytes(),
            Order::Big => v.to_be_bytes(),
        };
        self.buf.extend(bytes);
    }

    fn i32(&mut self, v: i32) {
        self.u32(v as u32);
    }

    fn u64(&mut self, v: u64) {
        let bytes = match self.order {
            Order::Little => v.to_le_bytes(),
            Order::Big => v.to_be_bytes(),
        };
        self.buf.extend(bytes);
    }

    fn i64(&mut self, v: i64) {
        self.u64(v as u64);
    }

    fn value(&mut self, size: u32, v: u64) {
        if size == 8 {
            self.u64(v);
        } else {
            self.u32(v as u32);
        }
    }

    fn pad_to(&mut self, len: usize) {
        self.buf.resize(len, 0);
    }
}

#[derive(Clone, Debug)]
pub struct Counter {
    pub title_index: u32,
    pub counter_type: u32,
    pub size: u32,
}

impl Counter {
    pub fn new(title_index: u32, counter_type: u32, size: u32) -> Self {
        Counter {
            title_index,
            counter_type,
            size,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Instance {
    /// Raw name as stored, including any padding.
    pub raw_name: String,
    pub values: Vec<u64>,
}

impl Instance {
    pub fn new(raw_name: &str, values: Vec<u64>) -> Self {
        Instance {
            raw_name: raw_name.to_owned(),
            values,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Data {
    /// `NumInstances` is `PERF_NO_INSTANCES` (or zero), one counter block follows.
    Single { num_instances: i32, values: Vec<u64> },
    Instances(Vec<Instance>),
}

#[derive(Clone, Debug)]
pub struct Object {
    pub title_index: u32,
    pub counters: Vec<Counter>,
    pub data: Data,
    pub perf_time: i64,
    pub perf_freq: i64,
}

impl Object {
    pub fn single(title_index: u32, counters: Vec<Counter>, values: Vec<u64>) -> Self {
        Object {
            title_index,
            counters,
            data: Data::Single {
                num_instances: -1,
                values,
            },
            perf_time: 0,
            perf_freq: 10_000_000,
        }
    }

    pub fn multi(title_index: u32, counters: Vec<Counter>, instances: Vec<Instance>) -> Self {
        Object {
            title_index,
            counters,
            data: Data::Instances(instances),
            perf_time: 0,
            perf_freq: 10_000_000,
        }
    }

    pub fn with_freq(mut self, perf_freq: i64) -> Self {
        self.perf_freq = perf_freq;
        self
    }

    /// Offsets of each counter inside a counter block: after the 4-byte length, 8-aligned.
    fn offsets(&self) -> (Vec<u32>, u32) {
        let mut offsets = Vec::new();
        let mut at = 8;
        for counter in &self.counters {
            offsets.push(at);
            at += if counter.size == 8 { 8 } else { 4 };
        }
        (offsets, align8(at))
    }

    pub fn encode(&self, order: Order) -> Vec<u8> {
        let (offsets, block_length) = self.offsets();
        let definition_length =
            OBJECT_HEADER_LENGTH + COUNTER_DEFINITION_LENGTH * self.counters.len() as u32;

        let mut body = Writer::new(order);
        match &self.data {
            Data::Single { values, .. } => self.counter_block(&mut body, &offsets, block_length, values),
            Data::Instances(instances) => {
                for instance in instances {
                    let name: Vec<u8> = instance
                        .raw_name
                        .encode_utf16()
                        .flat_map(u16::to_le_bytes)
                        .collect();
                    let byte_length = INSTANCE_DEFINITION_LENGTH + align8(name.len() as u32);
                    body.u32(byte_length);
                    body.u32(0);
                    body.u32(0);
                    body.u32(u32::MAX);
                    body.u32(INSTANCE_DEFINITION_LENGTH);
                    body.u32(name.len() as u32);
                    let start = body.buf.len();
                    body.buf.extend(&name);
                    body.pad_to(start + align8(name.len() as u32) as usize);
                    self.counter_block(&mut body, &offsets, block_length, &instance.values);
                }
            }
        }

        let num_instances = match &self.data {
            Data::Single { num_instances, .. } => *num_instances,
            Data::Instances(instances) => instances.len() as i32,
        };
        let total = definition_length + body.buf.len() as u32;

        let mut w = Writer::new(order);
        w.u32(total);
        w.u32(definition_length);
        w.u32(OBJECT_HEADER_LENGTH);
        w.u32(self.title_index);
        w.u32(0);
        w.u32(self.title_index + 1);
        w.u32(0);
        w.u32(100);
        w.u32(self.counters.len() as u32);
        w.i32(-1);
        w.i32(num_instances);
        w.u32(0);
        w.i64(self.perf_time);
        w.i64(self.perf_freq);
        for (counter, offset) in self.counters.iter().zip(&offsets) {
            w.u32(COUNTER_DEFINITION_LENGTH);
            w.u32(counter.title_index);
            w.u32(0);
            w.u32(counter.title_index + 1);
            w.u32(0);
            w.i32(0);
            w.u32(100);
            w.u32(counter.counter_type);
            w.u32(counter.size);
            w.u32(*offset);
        }
        w.buf.extend(body.buf);
        w.buf
    }

    fn counter_block(&self, w: &mut Writer, offsets: &[u32], block_length: u32, values: &[u64]) {
        let start = w.buf.len();
        w.u32(block_length);
        for ((counter, offset), value) in self.counters.iter().zip(offsets).zip(values) {
            w.pad_to(start + *offset as usize);
            w.value(counter.size, *value);
        }
        w.pad_to(start + block_length as usize);
    }
}

fn align8(n: u32) -> u32 {
    (n + 7) & !7
}

/// Complete snapshot: `PERF_DATA_BLOCK` followed by already encoded objects.
pub fn snapshot(order: Order, num_object_types: u32, objects: &[Vec<u8>]) -> Vec<u8> {
    let body_len: usize = objects.iter().map(Vec::len).sum();
    let mut w = Writer::new(order);
    for unit in "PERF".encode_utf16() {
        w.u16(unit);
    }
    w.u32(if order == Order::Little { 1 } else { 0 });
    w.u32(1);
    w.u32(1);
    w.u32(HEADER_LENGTH + body_len as u32);
    w.u32(HEADER_LENGTH);
    w.u32(num_object_types);
    w.i32(-1);
    w.pad_to(HEADER_LENGTH as usize);
    for object in objects {
        w.buf.extend(object);
    }
    w.buf
}

/// Snapshot whose object count matches the given objects.
pub fn encode(order: Order, objects: &[Object]) -> Vec<u8> {
    let encoded: Vec<Vec<u8>> = objects.iter().map(|o| o.encode(order)).collect();
    snapshot(order, objects.len() as u32, &encoded)
}

/// Name-table blob in the registry text format.
pub fn name_table(pairs: &[(u32, &str)]) -> Vec<u8> {
    let mut text = String::new();
    for (index, name) in pairs {
        text.push_str(&format!("{}\0{}\0", index, name));
    }
    text.push('\0');
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

pub fn standard_names() -> Vec<u8> {
    name_table(&[
        (1, "1847"),
        (2, "System"),
        (4, "Memory"),
        (6, "% Processor Time"),
        (238, "Processor"),
        (248, "Processes"),
        (674, "System Up Time"),
        (1380, "Available Bytes"),
        (1382, "Free Space Base"),
    ])
}

/// Overwrite one DWORD of an encoded buffer.
pub fn patch_u32(bytes: &mut [u8], at: usize, value: u32, order: Order) {
    let raw = match order {
        Order::Little => value.to_le_bytes(),
        Order::Big => value.to_be_bytes(),
    };
    bytes[at..at + 4].copy_from_slice(&raw);
}

/// Position of `CounterOffset` of the `n`th counter definition inside an encoded object.
pub fn counter_offset_field(n: usize) -> usize {
    OBJECT_HEADER_LENGTH as usize + n * COUNTER_DEFINITION_LENGTH as usize + 36
}

/// Position of `NumCounters` inside an encoded object.
pub const NUM_COUNTERS_FIELD: usize = 32;

/// Position of `ByteLength` of the `n`th counter definition inside an encoded object.
pub fn counter_length_field(n: usize) -> usize {
    OBJECT_HEADER_LENGTH as usize + n * COUNTER_DEFINITION_LENGTH as usize
}

/// Position of `ByteLength` of the first instance definition inside an encoded object.
pub fn first_instance_field(num_counters: usize) -> usize {
    counter_length_field(num_counters)
}
