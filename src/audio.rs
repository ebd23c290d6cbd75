//! Audio Output
//!
//! Serial audio paths driven from the sample registers:
//! - I2S transmitter (bit clock, channel select, serial data)
//! - S/PDIF block handler interface (payload words and channel status)

pub mod i2s;
pub mod spdif;
