//! Host-side test harness
//!
//! Plays the USB transaction layer against a request handler and decodes
//! the I2S bus from transmitter snapshots.

#![allow(dead_code)]

use audio_interface::audio::i2s::{BusLines, I2sTransmitter, SampleRegisters};
use audio_interface::types::{Channel, ClockConfiguration, SampleWord};
use audio_interface::usb::request::{
    HandlerInputs, HandlerOutputs, RequestHandler, TransactionSignals, TransferOutcome,
};
use audio_interface::usb::setup::SetupPacket;
use audio_interface::usb::stream::{InStreamWord, OutStreamWord};

/// Ticks to wait for an IN data stage to finish
const DATA_STAGE_TIMEOUT: usize = 16;

// =============================================================================
// Transaction layer
// =============================================================================

/// Everything the handler drove during one control transfer
#[derive(Debug, Default)]
pub struct TransferReport {
    /// Any tick stalled
    pub stalled: bool,
    /// Any tick acknowledged
    pub acked: bool,
    /// A zero length packet was requested
    pub zlp: bool,
    /// IN data stage words, in order
    pub words: Vec<InStreamWord>,
    /// Outcomes reported, in order
    pub outcomes: Vec<TransferOutcome>,
}

impl TransferReport {
    /// Payload bytes of the IN data stage
    pub fn data(&self) -> Vec<u8> {
        self.words.iter().map(|w| w.payload).collect()
    }

    fn record(&mut self, out: &HandlerOutputs) {
        self.stalled |= out.handshakes.stall;
        self.acked |= out.handshakes.ack;
        self.zlp |= out.send_zlp;
        if out.tx.valid {
            self.words.push(out.tx);
        }
        if let Some(outcome) = out.outcome {
            self.outcomes.push(outcome);
        }
    }
}

/// Drives control transfers through a handler tick by tick
pub struct ControlHost<H> {
    /// Handler under test
    pub handler: H,
    /// Ticks issued so far
    pub ticks: usize,
}

impl<H: RequestHandler> ControlHost<H> {
    pub fn new(handler: H) -> Self {
        Self { handler, ticks: 0 }
    }

    /// Issue one tick
    pub fn tick(
        &mut self,
        setup: SetupPacket,
        signals: TransactionSignals,
        rx: OutStreamWord,
        tx_ready: bool,
    ) -> HandlerOutputs {
        self.ticks += 1;
        self.handler.tick(&HandlerInputs {
            setup,
            signals,
            rx,
            tx_ready,
        })
    }

    /// Issue one tick with only the given pulses
    pub fn pulse(&mut self, setup: SetupPacket, signals: TransactionSignals) -> HandlerOutputs {
        self.tick(setup, signals, OutStreamWord::IDLE, false)
    }

    /// Issue `n` quiet ticks
    pub fn idle(&mut self, setup: SetupPacket, n: usize) {
        for _ in 0..n {
            self.pulse(setup, TransactionSignals::default());
        }
    }

    /// SETUP stage only
    pub fn setup(&mut self, setup: SetupPacket) -> HandlerOutputs {
        self.pulse(setup, setup_received())
    }

    /// Control read: SETUP, IN data stage, OUT status stage
    pub fn get(&mut self, setup: SetupPacket) -> TransferReport {
        let mut report = TransferReport::default();

        report.record(&self.setup(setup));
        self.idle(setup, 2);

        report.record(&self.pulse(
            setup,
            TransactionSignals {
                data_requested: true,
                ..Default::default()
            },
        ));

        for _ in 0..DATA_STAGE_TIMEOUT {
            let out = self.tick(setup, TransactionSignals::default(), OutStreamWord::IDLE, true);
            report.record(&out);
            if out.tx.valid && out.tx.last {
                break;
            }
        }

        // Host acknowledges the data packet
        report.record(&self.pulse(
            setup,
            TransactionSignals {
                inbound_ack: true,
                ..Default::default()
            },
        ));
        self.idle(setup, 1);

        report.record(&self.pulse(
            setup,
            TransactionSignals {
                status_requested: true,
                ..Default::default()
            },
        ));

        report
    }

    /// Control write: SETUP, OUT data stage carrying `data`, IN status stage
    pub fn set(&mut self, setup: SetupPacket, data: &[u8]) -> TransferReport {
        let mut report = TransferReport::default();

        report.record(&self.setup(setup));
        report.record(&self.pulse(setup, TransactionSignals::default()));

        for (i, &byte) in data.iter().enumerate() {
            let rx = OutStreamWord::byte(byte, i + 1 == data.len());
            report.record(&self.tick(setup, TransactionSignals::default(), rx, false));
        }

        report.record(&self.pulse(
            setup,
            TransactionSignals {
                rx_ready_for_response: true,
                ..Default::default()
            },
        ));
        self.idle(setup, 1);

        report.record(&self.pulse(
            setup,
            TransactionSignals {
                status_requested: true,
                ..Default::default()
            },
        ));
        report.record(&self.pulse(
            setup,
            TransactionSignals {
                inbound_ack: true,
                ..Default::default()
            },
        ));

        report
    }
}

pub fn setup_received() -> TransactionSignals {
    TransactionSignals {
        setup_received: true,
        ..Default::default()
    }
}

// =============================================================================
// I2S bus
// =============================================================================

/// Ticks a transmitter and records the bus
pub struct BusHarness {
    pub transmitter: I2sTransmitter,
    pub samples: SampleRegisters,
    /// Bus levels after each tick
    pub lines: Vec<BusLines>,
    /// (tick, channel) of every refill request
    pub requests: Vec<(usize, Channel)>,
}

impl BusHarness {
    pub fn new(samples: SampleRegisters) -> Self {
        Self {
            transmitter: I2sTransmitter::new(),
            samples,
            lines: Vec::new(),
            requests: Vec::new(),
        }
    }

    /// Advance one tick; refill requests are answered from `producer`
    pub fn tick<F>(&mut self, config: ClockConfiguration, producer: &mut F) -> BusLines
    where
        F: FnMut(Channel) -> SampleWord,
    {
        let lines = self.transmitter.tick(config, &self.samples);
        if let Some(channel) = self.transmitter.need_sample() {
            self.requests.push((self.lines.len(), channel));
            self.samples.load(channel, producer(channel));
        }
        self.lines.push(lines);
        lines
    }

    /// Advance `n` ticks
    pub fn run<F>(&mut self, config: ClockConfiguration, n: usize, producer: &mut F)
    where
        F: FnMut(Channel) -> SampleWord,
    {
        for _ in 0..n {
            self.tick(config, producer);
        }
    }

    /// Ticks at which the bit clock rose
    pub fn rising_edges(&self) -> Vec<usize> {
        self.lines
            .windows(2)
            .enumerate()
            .filter(|(_, w)| !w[0].bit_clock && w[1].bit_clock)
            .map(|(i, _)| i + 1)
            .collect()
    }

    /// (channel select, data) sampled on each rising edge
    pub fn sampled_bits(&self) -> Vec<(bool, bool)> {
        self.rising_edges()
            .into_iter()
            .map(|i| (self.lines[i].channel_select, self.lines[i].data))
            .collect()
    }

    /// Complete words on the bus, MSB first
    ///
    /// A word ends on the bit during which channel select changes.
    pub fn decode_words(&self) -> Vec<(Channel, u32)> {
        let bits = self.sampled_bits();
        let mut words = Vec::new();
        let mut start = 0;

        for k in 1..bits.len() {
            if bits[k].0 != bits[k - 1].0 {
                let channel = Channel::from_bit(bits[start].0);
                let value = bits[start..=k]
                    .iter()
                    .fold(0u32, |acc, &(_, bit)| (acc << 1) | u32::from(bit));
                words.push((channel, value));
                start = k + 1;
            }
        }

        words
    }
}

/// Producer that hands out consecutive values per channel
pub fn counting_producer(left_base: u32, right_base: u32) -> impl FnMut(Channel) -> SampleWord {
    let mut next = [left_base, right_base];
    move |channel| {
        let value = next[channel.index()];
        next[channel.index()] += 1;
        SampleWord::new(value)
    }
}
