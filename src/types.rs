//! Shared types used across the audio interface
//!
//! This module defines domain-specific types that enforce invariants
//! at compile time and provide type safety throughout the codebase.

use core::fmt;

use crate::config::{MAX_CLOCK_DIVIDER, MAX_SAMPLE_WIDTH};

/// Audio channel of the two-channel serial bus
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Channel {
    /// Left channel (channel select low, S/PDIF channel A)
    #[default]
    Left,
    /// Right channel (channel select high, S/PDIF channel B)
    Right,
}

impl Channel {
    /// Both channels in bus order
    pub const ALL: [Self; 2] = [Self::Left, Self::Right];

    /// The other channel
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Register index (Left = 0, Right = 1)
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    /// Level of the channel select line for this channel
    #[must_use]
    pub const fn as_bit(self) -> bool {
        matches!(self, Self::Right)
    }

    /// Channel from a channel select level
    #[must_use]
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Self::Right
        } else {
            Self::Left
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Channel {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Left => defmt::write!(f, "L"),
            Self::Right => defmt::write!(f, "R"),
        }
    }
}

/// A 24-bit audio sample as held by a sample register
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SampleWord(u32);

impl SampleWord {
    /// Mask of the bits a sample register holds
    pub const MASK: u32 = 0x00FF_FFFF;

    /// Silence
    pub const ZERO: Self = Self(0);

    /// Create from a raw register value, discarding bits above 23
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw & Self::MASK)
    }

    /// Create from a signed 24-bit sample (two's complement)
    #[must_use]
    pub const fn from_i24(sample: i32) -> Self {
        Self::new(sample as u32)
    }

    /// Create from a signed 16-bit sample, left-justified in 24 bits
    #[must_use]
    pub const fn from_i16(sample: i16) -> Self {
        Self::new((sample as i32 as u32) << 8)
    }

    /// Raw 24-bit register value
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Value of bit `n` (0 = LSB); bits past 23 read as zero
    #[must_use]
    pub const fn bit(self, n: u8) -> bool {
        n < 24 && (self.0 >> n) & 1 == 1
    }
}

impl fmt::Debug for SampleWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SampleWord({:#08x})", self.0)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for SampleWord {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=u32:#x}", self.0);
    }
}

/// Clock configuration validation errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Divider above [`MAX_CLOCK_DIVIDER`]
    DividerOutOfRange(u8),
    /// Sample width above [`MAX_SAMPLE_WIDTH`]
    WidthOutOfRange(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DividerOutOfRange(d) => {
                write!(f, "clock divider {d} exceeds maximum {MAX_CLOCK_DIVIDER}")
            }
            Self::WidthOutOfRange(w) => {
                write!(f, "sample width {w} exceeds maximum {MAX_SAMPLE_WIDTH}")
            }
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ConfigError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::DividerOutOfRange(d) => defmt::write!(f, "divider {} out of range", d),
            Self::WidthOutOfRange(w) => defmt::write!(f, "width {} out of range", w),
        }
    }
}

/// Serial bus clock configuration
///
/// `divider` sets the number of system ticks per bit clock half period
/// (`divider + 1`); `sample_width` is the index of the last bit of a word, so
/// a word carries `sample_width + 1` bits. Either field at zero disables the
/// bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ClockConfiguration {
    divider: u8,
    sample_width: u8,
}

impl ClockConfiguration {
    /// Configuration that keeps the transmitter idle
    pub const DISABLED: Self = Self {
        divider: 0,
        sample_width: 0,
    };

    /// Create a validated configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when either field exceeds what the bus counters hold.
    pub const fn new(divider: u8, sample_width: u8) -> Result<Self, ConfigError> {
        if divider > MAX_CLOCK_DIVIDER {
            Err(ConfigError::DividerOutOfRange(divider))
        } else if sample_width > MAX_SAMPLE_WIDTH {
            Err(ConfigError::WidthOutOfRange(sample_width))
        } else {
            Ok(Self::from_parts(divider, sample_width))
        }
    }

    /// Build without validation; callers guarantee the ranges
    pub(crate) const fn from_parts(divider: u8, sample_width: u8) -> Self {
        Self {
            divider,
            sample_width,
        }
    }

    /// Derive the configuration producing `sample_rate_hz` frames of
    /// `bits`-bit words from `system_hz`, if an exact divider exists
    #[must_use]
    pub fn from_rates(system_hz: u32, sample_rate_hz: u32, bits: u8) -> Option<Self> {
        if sample_rate_hz == 0 || bits < 2 {
            return None;
        }
        let sample_width = bits - 1;

        // One frame = two words, one bit = two half periods
        let half_periods = u32::from(bits) * 4;
        let frame_ticks = sample_rate_hz.checked_mul(half_periods)?;
        if system_hz % frame_ticks != 0 {
            return None;
        }
        let ticks_per_half = system_hz / frame_ticks;
        if ticks_per_half < 2 {
            return None;
        }
        let divider = u8::try_from(ticks_per_half - 1).ok()?;
        Self::new(divider, sample_width).ok()
    }

    /// Bit clock divider
    #[must_use]
    pub const fn divider(self) -> u8 {
        self.divider
    }

    /// Index of the last bit of a word
    #[must_use]
    pub const fn sample_width(self) -> u8 {
        self.sample_width
    }

    /// Whether the transmitter may run with this configuration
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        self.divider != 0 && self.sample_width != 0
    }

    /// Bits shifted per channel word
    #[must_use]
    pub const fn bits_per_word(self) -> u32 {
        self.sample_width as u32 + 1
    }

    /// System ticks per full bit clock period
    #[must_use]
    pub const fn bit_clock_period(self) -> u32 {
        2 * (self.divider as u32 + 1)
    }

    /// Bit clock frequency produced from `system_hz`
    #[must_use]
    pub const fn bit_clock_hz(self, system_hz: u32) -> u32 {
        system_hz / self.bit_clock_period()
    }

    /// Frame (sample) rate produced from `system_hz`
    #[must_use]
    pub const fn sample_rate_hz(self, system_hz: u32) -> u32 {
        self.bit_clock_hz(system_hz) / (2 * self.bits_per_word())
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ClockConfiguration {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Clock(div={}, width={})", self.divider, self.sample_width);
    }
}

/// Power domain state as carried by the power domain control (UAC3)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PowerDomainState {
    /// Fully operational
    #[default]
    D0,
    /// Low power, fast resume
    D1,
    /// Lowest power
    D2,
}

impl PowerDomainState {
    /// Decode the control byte
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::D0),
            1 => Some(Self::D1),
            2 => Some(Self::D2),
            _ => None,
        }
    }

    /// Control byte for this state
    #[must_use]
    pub const fn raw(self) -> u8 {
        match self {
            Self::D0 => 0,
            Self::D1 => 1,
            Self::D2 => 2,
        }
    }

    /// Whether audio should be streamed in this state
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::D0)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for PowerDomainState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::D0 => defmt::write!(f, "D0"),
            Self::D1 => defmt::write!(f, "D1"),
            Self::D2 => defmt::write!(f, "D2"),
        }
    }
}
