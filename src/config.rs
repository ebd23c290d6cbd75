//! System configuration and hardware constants
//!
//! This module defines compile-time constants for the audio interface.
//! USB Audio Class codes, clock limits, bus pin mappings and S/PDIF block
//! geometry are centralized here.

use crate::types::ClockConfiguration;

/// Clock of the USB/audio domain the state machines are ticked from (60 MHz ULPI clock)
pub const SYSTEM_CLOCK_HZ: u32 = 60_000_000;

/// Largest supported bit clock divider.
///
/// The counter compares against the divider on both halves of the bit clock,
/// so a divider of 5 divides the system clock by 12.
pub const MAX_CLOCK_DIVIDER: u8 = 5;

/// Largest supported sample width setting (a word carries `width + 1` bits)
pub const MAX_SAMPLE_WIDTH: u8 = 23;

/// Bits held by one sample register
pub const SAMPLE_WORD_BITS: u32 = 24;

/// Default bus configuration: 60 MHz / 12 = 5 MHz bit clock, 24-bit words
pub const DEFAULT_CLOCK: ClockConfiguration = ClockConfiguration::from_parts(MAX_CLOCK_DIVIDER, MAX_SAMPLE_WIDTH);

/// Largest control payload carried by the stream adapters, in bytes
pub const CONTROL_PAYLOAD_BYTES: usize = 2;

/// USB VID (use test VID for development)
pub const USB_VID: u16 = 0x1209;

/// USB PID (get from pid.codes for production)
pub const USB_PID: u16 = 0x0002;

/// Control endpoint max packet size
pub const USB_CONTROL_PACKET_SIZE: u8 = 64;

/// Interface number of the audio control interface, addressed in the high byte of `wIndex`
pub const AUDIO_CONTROL_INTERFACE: u8 = 11;

/// Audio class specific request codes (UAC3)
pub mod requests {
    //! `bRequest` values for class specific audio requests

    /// Undefined request
    pub const REQUEST_CODE_UNDEFINED: u8 = 0x00;

    /// Current setting attribute
    pub const CUR: u8 = 0x01;

    /// Range attribute
    pub const RANGE: u8 = 0x02;

    /// Memory attribute
    pub const MEM: u8 = 0x03;

    /// Interrupt enable
    pub const INTEN: u8 = 0x04;
}

/// Audio control interface control selectors (UAC3)
pub mod selectors {
    //! Control selectors carried in the high byte of `wValue`

    /// Undefined control
    pub const AC_CONTROL_UNDEFINED: u8 = 0x00;

    /// Active interface control
    pub const AC_ACTIVE_INTERFACE_CONTROL: u8 = 0x01;

    /// Power domain control
    pub const AC_POWER_DOMAIN_CONTROL: u8 = 0x02;
}

/// S/PDIF block geometry
pub mod spdif {
    //! IEC 60958 block layout

    /// Frames per block
    pub const BLOCK_FRAMES: usize = 192;

    /// Channel status bytes per block (one bit per frame)
    pub const CHANNEL_STATUS_BYTES: usize = BLOCK_FRAMES / 8;

    /// Bits covered by the subframe parity bit
    pub const PARITY_WINDOW_BITS: u32 = 27;
}

/// Pin assignments for GPIO
pub mod pins {
    //! GPIO pin assignments matching the schematic

    /// Status LED
    pub const LED_STATUS: &str = "PA5";

    /// I2S bit clock
    pub const I2S_BCLK: &str = "PB13";

    /// I2S word select (channel select)
    pub const I2S_LRCLK: &str = "PB12";

    /// I2S serial data
    pub const I2S_SDATA: &str = "PB15";

    /// USB D+ (handled by USB peripheral)
    pub const USB_DP: &str = "PA12";

    /// USB D- (handled by USB peripheral)
    pub const USB_DM: &str = "PA11";
}
