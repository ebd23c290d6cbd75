//! S/PDIF Block Interface
//!
//! Payload words and channel status scheduling for the S/PDIF block
//! handler. The block handler itself (preambles and biphase-mark coding)
//! sits behind [`BlockSink`]; this module produces what it consumes.
//!
//! # Payload layout
//!
//! ```text
//!  27   26   25   24   23 ........ 0
//! ┌────┬────┬────┬────┬─────────────┐
//! │ P  │ C  │ U  │ V  │ audio (24)  │
//! └────┴────┴────┴────┴─────────────┘
//! ```
//!
//! P is even parity over bits 0..=26.

use crate::config::spdif::{BLOCK_FRAMES, CHANNEL_STATUS_BYTES, PARITY_WINDOW_BITS};
use crate::types::{Channel, SampleWord};

const VALIDITY_BIT: u32 = 24;
const USER_BIT: u32 = 25;
const CHANNEL_STATUS_BIT: u32 = 26;
const PARITY_BIT: u32 = 27;

/// Even parity over the low [`PARITY_WINDOW_BITS`] bits, placed at bit 27
#[must_use]
pub const fn parity(payload: u32) -> u32 {
    let window = payload & ((1 << PARITY_WINDOW_BITS) - 1);
    (window.count_ones() & 1) << PARITY_BIT
}

/// One subframe worth of data for the block handler
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubframeWord {
    /// Audio sample
    pub audio: SampleWord,
    /// Validity flag (set = sample not suitable for conversion)
    pub validity: bool,
    /// User data bit
    pub user: bool,
    /// Channel status bit for this frame
    pub channel_status: bool,
}

impl SubframeWord {
    /// Create a word carrying `audio` and the frame's channel status bit
    #[must_use]
    pub const fn new(audio: SampleWord, channel_status: bool) -> Self {
        Self {
            audio,
            validity: false,
            user: false,
            channel_status,
        }
    }

    /// Encode to the 28-bit payload including parity
    #[must_use]
    pub const fn encode(self) -> u32 {
        let payload = self.audio.raw()
            | (self.validity as u32) << VALIDITY_BIT
            | (self.user as u32) << USER_BIT
            | (self.channel_status as u32) << CHANNEL_STATUS_BIT;
        payload | parity(payload)
    }

    /// Decode a payload, returning `None` on a parity error
    #[must_use]
    pub const fn decode(payload: u32) -> Option<Self> {
        if parity(payload) != payload & (1 << PARITY_BIT) {
            return None;
        }
        Some(Self {
            audio: SampleWord::new(payload),
            validity: payload & (1 << VALIDITY_BIT) != 0,
            user: payload & (1 << USER_BIT) != 0,
            channel_status: payload & (1 << CHANNEL_STATUS_BIT) != 0,
        })
    }
}

/// Channel status block, one bit per frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelStatus([u8; CHANNEL_STATUS_BYTES]);

impl ChannelStatus {
    /// Create from the raw status bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; CHANNEL_STATUS_BYTES]) -> Self {
        Self(bytes)
    }

    /// Consumer PCM status: stereo, 48 kHz, high accuracy clock, 16-bit
    /// samples resampled from 44.1 kHz
    #[must_use]
    pub const fn consumer_pcm_48k() -> Self {
        let mut bytes = [0; CHANNEL_STATUS_BYTES];
        // Source 1, channel 1
        bytes[2] = 0b0001_0001;
        // 48 kHz, level II clock accuracy
        bytes[3] = 0b0001_0010;
        // 16-bit word length, original rate 44.1 kHz
        bytes[4] = 0b1111_0010;
        Self(bytes)
    }

    /// Raw status bytes
    #[must_use]
    pub const fn bytes(&self) -> &[u8; CHANNEL_STATUS_BYTES] {
        &self.0
    }

    /// Status bit carried by `frame` (LSB of byte 0 first); frames past the block read zero
    #[must_use]
    pub const fn bit(&self, frame: usize) -> bool {
        if frame >= BLOCK_FRAMES {
            return false;
        }
        (self.0[frame >> 3] >> (frame & 7)) & 1 == 1
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ChannelStatus {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "ChannelStatus({=[u8]:x})", &self.0[..5]);
    }
}

/// Consumer of block-framed payload words
pub trait BlockSink {
    /// A new block starts with the next payload
    fn block_beginning(&mut self);

    /// Payload for `channel` of the current frame
    fn data(&mut self, channel: Channel, payload: u32);

    /// The block's final frame has been delivered
    fn block_complete(&mut self);

    /// Discard the payloads delivered since the last `block_beginning`
    fn drop_block(&mut self);
}

/// Feeds whole blocks of frames into a [`BlockSink`]
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockDriver {
    status: ChannelStatus,
    blocks_sent: u32,
}

impl BlockDriver {
    /// Create a driver that embeds `status` in every block
    #[must_use]
    pub const fn new(status: ChannelStatus) -> Self {
        Self {
            status,
            blocks_sent: 0,
        }
    }

    /// Channel status embedded in each block
    #[must_use]
    pub const fn status(&self) -> &ChannelStatus {
        &self.status
    }

    /// Blocks delivered so far
    #[must_use]
    pub const fn blocks_sent(&self) -> u32 {
        self.blocks_sent
    }

    /// Deliver one block, pulling frame `n`'s (A, B) samples from `frame`
    pub fn send_block<S, F>(&mut self, sink: &mut S, mut frame: F)
    where
        S: BlockSink,
        F: FnMut(usize) -> (SampleWord, SampleWord),
    {
        self.try_send_block(sink, |n| Some(frame(n)));
    }

    /// Send one block, dropping it if `frame` runs out before the last frame
    ///
    /// Returns `true` when the whole block reached the sink. A dropped block
    /// is not counted.
    pub fn try_send_block<S, F>(&mut self, sink: &mut S, mut frame: F) -> bool
    where
        S: BlockSink,
        F: FnMut(usize) -> Option<(SampleWord, SampleWord)>,
    {
        sink.block_beginning();
        for n in 0..BLOCK_FRAMES {
            let Some((a, b)) = frame(n) else {
                sink.drop_block();
                #[cfg(feature = "embedded")]
                defmt::debug!("spdif: block dropped at frame {}", n);
                return false;
            };
            let status = self.status.bit(n);
            sink.data(Channel::Left, SubframeWord::new(a, status).encode());
            sink.data(Channel::Right, SubframeWord::new(b, status).encode());
        }
        sink.block_complete();

        self.blocks_sent = self.blocks_sent.wrapping_add(1);

        #[cfg(feature = "embedded")]
        defmt::trace!("spdif: block {} sent", self.blocks_sent);
        true
    }
}
