//! I2S Transmitter
//!
//! Derives the bit clock from the system clock, multiplexes the left and
//! right sample registers and shifts the selected word out MSB first.
//!
//! # Timing
//!
//! The transmitter advances once per system tick. The bit clock toggles every
//! `divider + 1` ticks; data changes on the falling edge. The channel select
//! line leads the data by one bit, so it switches while the last bit of the
//! previous word is on the bus:
//!
//! ```text
//! BCLK  ‾‾\__/‾‾\__/‾‾\__/‾‾\__/‾‾\__/
//! LRCLK ______________/‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾
//! DATA   L1  |  L0  |  R3  |  R2  | ...
//! ```
//!
//! A word is captured from its sample register when it starts. When its final
//! bit starts the transmitter requests a refill of that channel, leaving the
//! producer a bit plus a full word period before the register is read again.

use crate::types::{Channel, ClockConfiguration, SampleWord};

/// Sample registers loaded by the producer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleRegisters {
    words: [SampleWord; 2],
}

impl SampleRegisters {
    /// Create with initial left and right words
    #[must_use]
    pub const fn new(left: SampleWord, right: SampleWord) -> Self {
        Self {
            words: [left, right],
        }
    }

    /// Word currently held for `channel`
    #[must_use]
    pub const fn get(&self, channel: Channel) -> SampleWord {
        self.words[channel.index()]
    }

    /// Overwrite the word for `channel`
    pub fn load(&mut self, channel: Channel, word: SampleWord) {
        self.words[channel.index()] = word;
    }
}

/// Levels of the three bus lines
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusLines {
    /// Bit clock
    pub bit_clock: bool,
    /// Channel select (high = right)
    pub channel_select: bool,
    /// Serial data
    pub data: bool,
}

#[cfg(feature = "embedded")]
impl defmt::Format for BusLines {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "BCLK={} LR={} D={}",
            self.bit_clock as u8,
            self.channel_select as u8,
            self.data as u8
        );
    }
}

/// Transmitter state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum BusState {
    /// Waiting for an enabled configuration
    #[default]
    Idle,
    /// Shifting words out
    Run,
}

/// I2S transmitter state snapshot
///
/// [`advance`](Self::advance) is the pure transition; [`tick`](Self::tick)
/// applies it in place. Bus outputs are derived from the snapshot only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct I2sTransmitter {
    state: BusState,
    /// Configuration captured when the bus started
    config: ClockConfiguration,
    /// Ticks since the last bit clock toggle
    clk_counter: u8,
    bit_clock: bool,
    /// Position within the word; `sample_width` marks the final bit
    bit_position: u8,
    last_bit: u8,
    current: Channel,
    pending: Channel,
    /// Word being shifted out
    shift_word: SampleWord,
    /// Channel whose register may be refilled, raised for one tick
    request: Option<Channel>,
}

impl I2sTransmitter {
    /// Create an idle transmitter
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: BusState::Idle,
            config: ClockConfiguration::DISABLED,
            clk_counter: 0,
            bit_clock: true,
            bit_position: 0,
            last_bit: 0,
            current: Channel::Left,
            pending: Channel::Right,
            shift_word: SampleWord::ZERO,
            request: None,
        }
    }

    /// Compute the next snapshot from the configuration and sample registers
    #[must_use]
    pub fn advance(&self, config: ClockConfiguration, samples: &SampleRegisters) -> Self {
        let mut next = Self {
            request: None,
            ..*self
        };

        match self.state {
            BusState::Idle => {
                next.current = Channel::Left;
                next.pending = Channel::Right;

                if config.is_enabled() {
                    let width = config.sample_width();
                    next.state = BusState::Run;
                    next.config = config;
                    next.clk_counter = config.divider();
                    next.bit_position = width;
                    next.last_bit = width - 1;
                    // The bus opens on the final bit of the left word
                    next.shift_word = samples.get(Channel::Left);
                    next.request = Some(Channel::Left);
                }
            }

            BusState::Run => {
                if !config.is_enabled() {
                    return Self::new();
                }

                if self.clk_counter == self.config.divider() {
                    next.clk_counter = 0;
                    next.bit_clock = !self.bit_clock;

                    // Falling edge moves to the next bit
                    if self.bit_clock {
                        if self.bit_position == self.config.sample_width() {
                            next.bit_position = 0;
                            next.shift_word = samples.get(self.pending);
                        } else {
                            if self.bit_position == self.last_bit {
                                next.pending = self.pending.opposite();
                                next.request = Some(self.current);
                            }
                            next.bit_position = self.bit_position + 1;
                        }
                        next.current = self.pending;
                    }
                } else {
                    next.clk_counter = self.clk_counter + 1;
                }
            }
        }

        next
    }

    /// Advance one tick and return the resulting bus levels
    pub fn tick(&mut self, config: ClockConfiguration, samples: &SampleRegisters) -> BusLines {
        let next = self.advance(config, samples);

        #[cfg(feature = "embedded")]
        if next.state != self.state {
            match next.state {
                BusState::Run => defmt::debug!("i2s: start {}", next.config),
                BusState::Idle => defmt::debug!("i2s: stop"),
            }
        }

        *self = next;
        self.lines()
    }

    /// Bus levels for the current snapshot
    #[must_use]
    pub fn lines(&self) -> BusLines {
        let data = match self.state {
            BusState::Idle => false,
            BusState::Run => self
                .shift_word
                .bit(self.config.sample_width() - self.bit_position),
        };

        BusLines {
            bit_clock: self.bit_clock,
            channel_select: self.pending.as_bit(),
            data,
        }
    }

    /// Channel whose sample register should be refilled, if any
    #[must_use]
    pub const fn need_sample(&self) -> Option<Channel> {
        self.request
    }

    /// Whether words are being shifted out
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, BusState::Run)
    }

    /// Channel whose word is on the data line
    #[must_use]
    pub const fn current_channel(&self) -> Channel {
        self.current
    }

    /// Channel shown on the channel select line
    #[must_use]
    pub const fn pending_channel(&self) -> Channel {
        self.pending
    }

    /// Configuration captured at start
    #[must_use]
    pub const fn config(&self) -> ClockConfiguration {
        self.config
    }

    /// Return to idle
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for I2sTransmitter {
    fn default() -> Self {
        Self::new()
    }
}
