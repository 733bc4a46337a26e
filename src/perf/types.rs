//! From the sources of `<WinPerf.h>`:
//!
//! ```txt
//!  PERF_COUNTER_DEFINITION.CounterType field values
//!
//!
//!        Counter ID Field Definition:
//!
//!   3      2        2    2    2        1        1    1
//!   1      8        4    2    0        6        2    0    8                0
//!  +--------+--------+----+----+--------+--------+----+----+----------------+
//!  |Display |Calculation  |Time|Counter |        |Ctr |Size|                |
//!  |Flags   |Modifiers    |Base|SubType |Reserved|Type|Fld |   Reserved     |
//!  +--------+--------+----+----+--------+--------+----+----+----------------+
//! ```
use std::fmt::{self, Debug};

use bitflags::bitflags;

// Size field
pub const PERF_SIZE_DWORD: u32 = 0x0000_0000;
pub const PERF_SIZE_LARGE: u32 = 0x0000_0100;
pub const PERF_SIZE_ZERO: u32 = 0x0000_0200;
pub const PERF_SIZE_VARIABLE_LEN: u32 = 0x0000_0300;

// Counter type field
pub const PERF_TYPE_NUMBER: u32 = 0x0000_0000;
pub const PERF_TYPE_COUNTER: u32 = 0x0000_0400;
pub const PERF_TYPE_TEXT: u32 = 0x0000_0800;
pub const PERF_TYPE_ZERO: u32 = 0x0000_0C00;

// Counter sub-types
pub const PERF_COUNTER_VALUE: u32 = 0x0000_0000;
pub const PERF_COUNTER_RATE: u32 = 0x0001_0000;
pub const PERF_COUNTER_FRACTION: u32 = 0x0002_0000;
pub const PERF_COUNTER_BASE: u32 = 0x0003_0000;
pub const PERF_COUNTER_ELAPSED: u32 = 0x0004_0000;
pub const PERF_COUNTER_QUEUELEN: u32 = 0x0005_0000;
pub const PERF_COUNTER_HISTOGRAM: u32 = 0x0006_0000;
pub const PERF_COUNTER_PRECISION: u32 = 0x0007_0000;

// Time base
pub const PERF_TIMER_TICK: u32 = 0x0000_0000;
pub const PERF_TIMER_100NS: u32 = 0x0010_0000;
pub const PERF_OBJECT_TIMER: u32 = 0x0020_0000;

// Calculation modifiers
pub const PERF_DELTA_COUNTER: u32 = 0x0040_0000;
pub const PERF_DELTA_BASE: u32 = 0x0080_0000;
pub const PERF_INVERSE_COUNTER: u32 = 0x0100_0000;
pub const PERF_MULTI_COUNTER: u32 = 0x0200_0000;

// Display suffix
pub const PERF_DISPLAY_NO_SUFFIX: u32 = 0x0000_0000;
pub const PERF_DISPLAY_PER_SEC: u32 = 0x1000_0000;
pub const PERF_DISPLAY_PERCENT: u32 = 0x2000_0000;
pub const PERF_DISPLAY_SECONDS: u32 = 0x3000_0000;
pub const PERF_DISPLAY_NOSHOW: u32 = 0x4000_0000;

// Complete counter types which need a unit conversion.
pub const PERF_ELAPSED_TIME: u32 = 0x3024_0500;
pub const PERF_100NSEC_TIMER: u32 = 0x2051_0500;
pub const PERF_PRECISION_100NS_TIMER: u32 = 0x2057_0500;

/// `PERF_OBJECT_TYPE.NumInstances` of an object without instances.
pub const PERF_NO_INSTANCES: i32 = -1;

/// Bit-masks selecting each component of a `CounterType` word.
pub struct CounterTypeMask;

impl CounterTypeMask {
    pub const SIZE: u32 = 0x0000_0300;
    pub const COUNTER_TYPE: u32 = 0x0000_0C00;
    pub const SUB_TYPE: u32 = 0x000F_0000;
    pub const TIME_BASE: u32 = 0x0030_0000;
    pub const CALC_MODIFIER: u32 = 0x0FC0_0000;
    pub const DISPLAY_FLAGS: u32 = 0xF000_0000;
}

/// A safe, high-level wrapper for `PERF_COUNTER_DEFINITION.CounterType` value.
///
/// Any 32-bit word is accepted; components which do not match a known value
/// are reported as `None` by the corresponding getter.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct CounterTypeDefinition(u32);

/// select one of the following to indicate the counter's data size
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Size {
    /// 32 bit field
    Dword,
    /// 64 bit field
    Large,
    /// for Zero Length fields
    Zero,
    /// length is in CounterLength field
    /// of Counter Definition struct
    Var,
}

/// select one of the following values to indicate the counter field usage
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RawType {
    /// a number (not a counter)
    Number,
    /// an increasing numeric value
    Counter,
    /// a text field
    Text,
    /// displays a zero
    Zero,
}

/// Timer SubTypes
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Timer {
    /// use system perf. freq for base
    TimerTick,
    /// use 100 NS timer time base units
    Timer100NS,
    /// use the object timer freq
    ObjectTimer,
}

// Any types that have calculations performed can use one or more of
// the following calculation modification flags listed here
bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct CalculationModifiers: u32 {
        /// compute difference first
        const DELTA = PERF_DELTA_COUNTER;
        /// compute base diff as well
        const DELTA_BASE = PERF_DELTA_BASE;
        /// show as 1.00-value (assumes:
        const INVERSE = PERF_INVERSE_COUNTER;
        /// sum of multiple instances
        const MULTI = PERF_MULTI_COUNTER;
    }
}

/// Select one of the following values to indicate the display suffix (if any)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DisplayFlags {
    /// no suffix
    NoSuffix,
    /// "/sec"
    PerSec,
    /// "%"
    Percent,
    /// "secs"
    Seconds,
    /// value is not displayed
    NoShow,
}

impl CounterTypeDefinition {
    #[inline(always)]
    pub const fn from_raw(value: u32) -> Self {
        CounterTypeDefinition(value)
    }

    #[inline(always)]
    pub const fn into_raw(self) -> u32 {
        self.0
    }

    pub fn size(&self) -> Size {
        match self.0 & CounterTypeMask::SIZE {
            PERF_SIZE_DWORD => Size::Dword,
            PERF_SIZE_LARGE => Size::Large,
            PERF_SIZE_ZERO => Size::Zero,
            _ => Size::Var,
        }
    }

    pub fn raw_type(&self) -> RawType {
        match self.0 & CounterTypeMask::COUNTER_TYPE {
            PERF_TYPE_NUMBER => RawType::Number,
            PERF_TYPE_COUNTER => RawType::Counter,
            PERF_TYPE_TEXT => RawType::Text,
            _ => RawType::Zero,
        }
    }

    #[inline(always)]
    pub const fn sub_type(&self) -> u32 {
        self.0 & CounterTypeMask::SUB_TYPE
    }

    pub fn time_base(&self) -> Option<Timer> {
        Some(match self.0 & CounterTypeMask::TIME_BASE {
            PERF_TIMER_TICK => Timer::TimerTick,
            PERF_TIMER_100NS => Timer::Timer100NS,
            PERF_OBJECT_TIMER => Timer::ObjectTimer,
            _ => return None,
        })
    }

    pub fn calculation_modifiers(&self) -> CalculationModifiers {
        CalculationModifiers::from_bits_truncate(self.0 & CounterTypeMask::CALC_MODIFIER)
    }

    pub fn display_flags(&self) -> Option<DisplayFlags> {
        Some(match self.0 & CounterTypeMask::DISPLAY_FLAGS {
            PERF_DISPLAY_NO_SUFFIX => DisplayFlags::NoSuffix,
            PERF_DISPLAY_PER_SEC => DisplayFlags::PerSec,
            PERF_DISPLAY_PERCENT => DisplayFlags::Percent,
            PERF_DISPLAY_SECONDS => DisplayFlags::Seconds,
            PERF_DISPLAY_NOSHOW => DisplayFlags::NoShow,
            _ => return None,
        })
    }

    /// Whether a counter of this type carries the denominator of some other counter.
    ///
    /// Note that this is a plain bit test rather than a sub-type comparison: 100ns-based
    /// types are excluded even when their sub-type bits overlap with `PERF_COUNTER_BASE`.
    #[inline]
    pub const fn is_base(&self) -> bool {
        (self.0 & PERF_COUNTER_BASE) != 0 && (self.0 & PERF_TIMER_100NS) == 0
    }
}

impl From<u32> for CounterTypeDefinition {
    fn from(value: u32) -> Self {
        Self::from_raw(value)
    }
}

impl DisplayFlags {
    /// Human readable suffix, empty when there is none.
    pub fn suffix(self) -> &'static str {
        match self {
            DisplayFlags::NoSuffix | DisplayFlags::NoShow => "",
            DisplayFlags::PerSec => "/sec",
            DisplayFlags::Percent => "%",
            DisplayFlags::Seconds => "s",
        }
    }
}

impl Size {
    /// Bytes a value of this size takes in a counter block, `None` for variable length.
    pub fn byte_len(self) -> Option<u32> {
        match self {
            Size::Dword => Some(4),
            Size::Large => Some(8),
            Size::Zero => Some(0),
            Size::Var => None,
        }
    }
}

impl Debug for CounterTypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CounterType")
            .field("raw", &format_args!("{:#010x}", self.0))
            .field("size", &self.size())
            .field("type", &self.raw_type())
            .field("sub_type", &format_args!("{:#x}", self.sub_type()))
            .field("timer", &self.time_base())
            .field("modifiers", &self.calculation_modifiers())
            .field("display", &self.display_flags())
            .finish()
    }
}
