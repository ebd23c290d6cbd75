//! I2S Bus Pins
//!
//! Drives [`BusLines`] snapshots onto three push-pull outputs.

use embedded_hal::digital::{OutputPin, PinState};

use crate::audio::i2s::BusLines;

/// Bit clock, channel select and data outputs
pub struct I2sPins<C, W, D> {
    bit_clock: C,
    channel_select: W,
    data: D,
    /// Levels last written; `None` until the first drive
    driven: Option<BusLines>,
}

impl<C, W, D, E> I2sPins<C, W, D>
where
    C: OutputPin<Error = E>,
    W: OutputPin<Error = E>,
    D: OutputPin<Error = E>,
{
    /// Take ownership of the three bus pins
    #[must_use]
    pub const fn new(bit_clock: C, channel_select: W, data: D) -> Self {
        Self {
            bit_clock,
            channel_select,
            data,
            driven: None,
        }
    }

    /// Write a snapshot, touching only lines that changed
    ///
    /// Channel select and data settle before the bit clock moves.
    ///
    /// # Errors
    ///
    /// Propagates the first pin error.
    pub fn drive(&mut self, lines: BusLines) -> Result<(), E> {
        let prev = self.driven;
        let changed = |level: fn(&BusLines) -> bool| prev.map_or(true, |p| level(&p) != level(&lines));

        if changed(|l| l.channel_select) {
            self.channel_select.set_state(PinState::from(lines.channel_select))?;
        }
        if changed(|l| l.data) {
            self.data.set_state(PinState::from(lines.data))?;
        }
        if changed(|l| l.bit_clock) {
            self.bit_clock.set_state(PinState::from(lines.bit_clock))?;
        }

        self.driven = Some(lines);
        Ok(())
    }

    /// Drive all lines low and forget the cached levels
    ///
    /// # Errors
    ///
    /// Propagates the first pin error.
    pub fn park(&mut self) -> Result<(), E> {
        self.channel_select.set_low()?;
        self.data.set_low()?;
        self.bit_clock.set_low()?;
        self.driven = None;
        Ok(())
    }
}
