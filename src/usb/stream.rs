//! Control Payload Stream Adapters
//!
//! Fixed-length serializer/deserializer bridging a register value and the
//! byte stream of a control transfer data stage. Both advance once per tick
//! and report completion with a one-tick `done` pulse.

use heapless::Vec;

/// Byte presented on the IN (device to host) stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InStreamWord {
    /// Payload byte is valid this tick
    pub valid: bool,
    /// Payload byte
    pub payload: u8,
    /// First byte of the packet
    pub first: bool,
    /// Last byte of the packet
    pub last: bool,
}

impl InStreamWord {
    /// Nothing presented
    pub const IDLE: Self = Self {
        valid: false,
        payload: 0,
        first: false,
        last: false,
    };
}

/// Byte received on the OUT (host to device) stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OutStreamWord {
    /// Payload byte is valid this tick
    pub valid: bool,
    /// Payload byte
    pub payload: u8,
    /// Last byte of the packet
    pub last: bool,
}

impl OutStreamWord {
    /// Nothing received
    pub const IDLE: Self = Self {
        valid: false,
        payload: 0,
        last: false,
    };

    /// A valid byte
    #[must_use]
    pub const fn byte(payload: u8, last: bool) -> Self {
        Self {
            valid: true,
            payload,
            last,
        }
    }
}

/// Serializer state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum SerializerState {
    #[default]
    Idle,
    Streaming {
        position: u8,
    },
    Done,
}

/// Serializer inputs for one tick
#[derive(Clone, Copy, Debug)]
pub struct SerializerInputs<'a, const N: usize> {
    /// Begin streaming (honoured while idle)
    pub start: bool,
    /// Register value to stream, byte 0 first
    pub data: &'a [u8; N],
    /// Bytes the host may receive
    pub max_length: u8,
    /// Downstream accepts the presented byte
    pub ready: bool,
}

/// Streams up to `N` bytes of a register value onto the IN stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamSerializer<const N: usize> {
    state: SerializerState,
}

impl<const N: usize> StreamSerializer<N> {
    /// Create an idle serializer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SerializerState::Idle,
        }
    }

    fn effective_length(max_length: u8) -> usize {
        usize::from(max_length).min(N)
    }

    /// Byte presented for the current snapshot
    #[must_use]
    pub fn output(&self, data: &[u8; N], max_length: u8) -> InStreamWord {
        match self.state {
            SerializerState::Streaming { position } => {
                let position = usize::from(position);
                InStreamWord {
                    valid: true,
                    payload: data.get(position).copied().unwrap_or(0),
                    first: position == 0,
                    last: position + 1 >= Self::effective_length(max_length),
                }
            }
            SerializerState::Idle | SerializerState::Done => InStreamWord::IDLE,
        }
    }

    /// Pulsed for one tick once the last byte was accepted
    #[must_use]
    pub const fn done(&self) -> bool {
        matches!(self.state, SerializerState::Done)
    }

    /// Whether a transfer is in progress
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self.state, SerializerState::Streaming { .. })
    }

    /// Compute the next snapshot
    #[must_use]
    pub fn advance(&self, inputs: &SerializerInputs<'_, N>) -> Self {
        let state = match self.state {
            SerializerState::Idle if inputs.start => {
                if Self::effective_length(inputs.max_length) == 0 {
                    SerializerState::Done
                } else {
                    SerializerState::Streaming { position: 0 }
                }
            }
            SerializerState::Idle => SerializerState::Idle,
            SerializerState::Streaming { position } => {
                let word = self.output(inputs.data, inputs.max_length);
                if !inputs.ready {
                    SerializerState::Streaming { position }
                } else if word.last {
                    SerializerState::Done
                } else {
                    SerializerState::Streaming {
                        position: position + 1,
                    }
                }
            }
            SerializerState::Done => SerializerState::Idle,
        };
        Self { state }
    }
}

/// Deserializer state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum DeserializerState {
    #[default]
    Idle,
    Receiving,
    Done,
}

/// Deserializer inputs for one tick
#[derive(Clone, Copy, Debug, Default)]
pub struct DeserializerInputs {
    /// Arm the capture (honoured while idle)
    pub start: bool,
    /// Bytes to capture
    pub max_length: u8,
    /// Inbound stream
    pub stream: OutStreamWord,
}

/// Captures up to `N` bytes from the OUT stream into a register value
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamDeserializer<const N: usize> {
    state: DeserializerState,
    max_length: u8,
    captured: Vec<u8, N>,
}

impl<const N: usize> StreamDeserializer<N> {
    /// Create an idle deserializer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: DeserializerState::Idle,
            max_length: 0,
            captured: Vec::new(),
        }
    }

    /// Pulsed for one tick once the expected bytes were captured
    #[must_use]
    pub const fn done(&self) -> bool {
        matches!(self.state, DeserializerState::Done)
    }

    /// Whether a capture is in progress
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self.state, DeserializerState::Receiving)
    }

    /// Bytes captured by the last transfer
    #[must_use]
    pub fn captured(&self) -> &[u8] {
        &self.captured
    }

    /// Captured bytes assembled little endian
    #[must_use]
    pub fn value(&self) -> u16 {
        self.captured
            .iter()
            .take(2)
            .rev()
            .fold(0u16, |acc, &b| (acc << 8) | u16::from(b))
    }

    /// Compute the next snapshot
    #[must_use]
    pub fn advance(&self, inputs: &DeserializerInputs) -> Self {
        let mut next = self.clone();

        match self.state {
            DeserializerState::Idle => {
                if inputs.start {
                    let max_length = inputs.max_length.min(u8::try_from(N).unwrap_or(u8::MAX));
                    next.max_length = max_length;
                    next.captured.clear();
                    next.state = if max_length == 0 {
                        DeserializerState::Done
                    } else {
                        DeserializerState::Receiving
                    };
                }
            }
            DeserializerState::Receiving => {
                if inputs.stream.valid {
                    // Capacity is N and max_length never exceeds it
                    let _ = next.captured.push(inputs.stream.payload);
                    if inputs.stream.last || next.captured.len() >= usize::from(self.max_length) {
                        next.state = DeserializerState::Done;
                    }
                }
            }
            DeserializerState::Done => next.state = DeserializerState::Idle,
        }

        next
    }
}
