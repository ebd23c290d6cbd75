//! Audio Class Request Handler
//!
//! Sequences class specific `CUR` control transfers addressed to the audio
//! control interface, reading and writing settings through the control
//! registry and the payload stream adapters.
//!
//! # State machine
//!
//! ```text
//!            SETUP, CUR            status ACK / inbound ACK / STALL
//!   ┌──────┐ ───────────► ┌───────────────┐ ──────────────► ┌──────┐
//!   │ Idle │              │ HandleCurrent │                  │ Idle │
//!   └──────┘ ───────────► ┌───────────────┐ ──────────────► └──────┘
//!            SETUP, other │   Unhandled   │  STALL at first
//!                         └───────────────┘  data/status stage
//! ```
//!
//! Every transfer ends in either a successful handshake or a STALL, after
//! which the handler is idle again.

use core::fmt;

use crate::config::{requests, CONTROL_PAYLOAD_BYTES};
use crate::usb::controls::{ControlRegistry, DeviceSettings, ResolvedControl};
use crate::usb::setup::SetupPacket;
use crate::usb::stream::{
    DeserializerInputs, InStreamWord, OutStreamWord, SerializerInputs, StreamDeserializer,
    StreamSerializer,
};

/// Protocol level request failures; each ends the transfer with a STALL
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestError {
    /// Request code other than `CUR`
    UnsupportedRequest,
    /// Host declared a length different from the control's length
    LengthMismatch {
        /// Length of the addressed control
        expected: u8,
        /// `wLength` of the request
        requested: u16,
    },
    /// Addressed control does not exist and the host expects data
    UnknownSelector,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedRequest => write!(f, "unsupported request"),
            Self::LengthMismatch {
                expected,
                requested,
            } => write!(f, "length mismatch: control has {expected}, host requested {requested}"),
            Self::UnknownSelector => write!(f, "unknown control selector"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for RequestError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::UnsupportedRequest => defmt::write!(f, "unsupported request"),
            Self::LengthMismatch {
                expected,
                requested,
            } => defmt::write!(f, "length mismatch ({} != {})", requested, expected),
            Self::UnknownSelector => defmt::write!(f, "unknown selector"),
        }
    }
}

/// Check a request's declared length against the resolved control
///
/// # Errors
///
/// [`RequestError::UnknownSelector`] when the control does not exist and the
/// host expects data, [`RequestError::LengthMismatch`] when the lengths differ.
pub fn check_length(control: &ResolvedControl, setup: &SetupPacket) -> Result<(), RequestError> {
    let expected = control.length();
    if u16::from(expected) == setup.length {
        Ok(())
    } else if control.is_known() {
        Err(RequestError::LengthMismatch {
            expected,
            requested: setup.length,
        })
    } else {
        Err(RequestError::UnknownSelector)
    }
}

/// Classify a request for the audio control interface
///
/// # Errors
///
/// [`RequestError::UnsupportedRequest`] for request codes other than `CUR`,
/// otherwise the errors of [`check_length`].
pub fn classify(
    registry: &ControlRegistry,
    setup: &SetupPacket,
) -> Result<ResolvedControl, RequestError> {
    if setup.request != requests::CUR {
        return Err(RequestError::UnsupportedRequest);
    }
    let control = registry.resolve(setup);
    check_length(&control, setup)?;
    Ok(control)
}

/// Pulses from the transaction layer for one tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransactionSignals {
    /// A new SETUP packet arrived
    pub setup_received: bool,
    /// Host is ready for the IN data stage
    pub data_requested: bool,
    /// Host started the status stage
    pub status_requested: bool,
    /// OUT data packet complete, host awaits a handshake
    pub rx_ready_for_response: bool,
    /// Host acknowledged our last IN packet
    pub inbound_ack: bool,
}

/// Everything the handler samples in one tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HandlerInputs {
    /// SETUP packet of the current transfer
    pub setup: SetupPacket,
    /// Transaction layer pulses
    pub signals: TransactionSignals,
    /// Inbound data stage stream
    pub rx: OutStreamWord,
    /// Outbound stream accepts the presented byte
    pub tx_ready: bool,
}

/// Handshakes driven towards the host
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Handshakes {
    /// ACK the current stage
    pub ack: bool,
    /// STALL the current stage
    pub stall: bool,
}

/// How a transfer ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Status stage completed
    Completed,
    /// Transfer stalled
    Stalled(RequestError),
}

#[cfg(feature = "embedded")]
impl defmt::Format for TransferOutcome {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Completed => defmt::write!(f, "completed"),
            Self::Stalled(err) => defmt::write!(f, "stalled: {}", err),
        }
    }
}

/// Outputs of one tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HandlerOutputs {
    /// Handshakes to send
    pub handshakes: Handshakes,
    /// Send a zero length packet (status stage of a SET)
    pub send_zlp: bool,
    /// Outbound data stage stream
    pub tx: InStreamWord,
    /// Set on the tick a transfer resolves
    pub outcome: Option<TransferOutcome>,
}

impl HandlerOutputs {
    fn stall(&mut self, error: RequestError) {
        self.handshakes.stall = true;
        self.outcome = Some(TransferOutcome::Stalled(error));
    }
}

/// A class request handler advanced once per tick
pub trait RequestHandler {
    /// Whether this handler services `setup`
    fn handles(&self, setup: &SetupPacket) -> bool;

    /// Advance one tick
    fn tick(&mut self, inputs: &HandlerInputs) -> HandlerOutputs;
}

/// Observable handler state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RequestState {
    /// No transfer in progress
    #[default]
    Idle,
    /// Servicing a `CUR` transfer
    HandleCurrent,
    /// Waiting for the chance to stall an unsupported request
    Unhandled,
}

#[cfg(feature = "embedded")]
impl defmt::Format for RequestState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Idle => defmt::write!(f, "IDLE"),
            Self::HandleCurrent => defmt::write!(f, "HANDLE_CURRENT"),
            Self::Unhandled => defmt::write!(f, "UNHANDLED"),
        }
    }
}

/// Context of the `CUR` transfer in progress
#[derive(Clone, Copy, Debug)]
struct PendingTransfer {
    control: ResolvedControl,
    /// Receive adapter already started for this transfer
    rx_triggered: bool,
}

#[derive(Clone, Copy, Debug, Default)]
enum HandlerState {
    #[default]
    Idle,
    HandleCurrent(PendingTransfer),
    Unhandled,
}

/// Handler for class specific `CUR` requests on the audio control interface
#[derive(Clone, Debug)]
pub struct AudioRequestHandler {
    state: HandlerState,
    registry: ControlRegistry,
    settings: DeviceSettings,
    transmitter: StreamSerializer<CONTROL_PAYLOAD_BYTES>,
    receiver: StreamDeserializer<CONTROL_PAYLOAD_BYTES>,
}

impl AudioRequestHandler {
    /// Create a handler exposing the default controls
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(ControlRegistry::default())
    }

    /// Create a handler exposing the controls of `registry`
    #[must_use]
    pub fn with_registry(registry: ControlRegistry) -> Self {
        Self {
            state: HandlerState::Idle,
            registry,
            settings: DeviceSettings::default(),
            transmitter: StreamSerializer::new(),
            receiver: StreamDeserializer::new(),
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> RequestState {
        match self.state {
            HandlerState::Idle => RequestState::Idle,
            HandlerState::HandleCurrent(_) => RequestState::HandleCurrent,
            HandlerState::Unhandled => RequestState::Unhandled,
        }
    }

    /// Persisted settings
    #[must_use]
    pub const fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    /// Raw power domain byte
    #[must_use]
    pub const fn power_domain(&self) -> u8 {
        self.settings.power_domain
    }

    /// Registry the handler resolves controls from
    #[must_use]
    pub const fn registry(&self) -> &ControlRegistry {
        &self.registry
    }

    /// Device reset: drop any transfer and clear the settings
    pub fn reset(&mut self) {
        *self = Self::with_registry(self.registry);
    }

    /// Compute the next snapshot and this tick's outputs
    #[must_use]
    pub fn transition(&self, inputs: &HandlerInputs) -> (Self, HandlerOutputs) {
        let mut next = self.clone();
        let mut out = HandlerOutputs::default();
        let setup = &inputs.setup;
        let signals = &inputs.signals;

        let tx_data;
        let mut tx = SerializerInputs {
            start: false,
            data: &[0; CONTROL_PAYLOAD_BYTES],
            max_length: 0,
            ready: false,
        };
        let mut rx = DeserializerInputs::default();

        if self.handles(setup) {
            match self.state {
                HandlerState::Idle => {
                    if signals.setup_received {
                        next.state = if setup.request == requests::CUR {
                            HandlerState::HandleCurrent(PendingTransfer {
                                control: self.registry.resolve(setup),
                                rx_triggered: false,
                            })
                        } else {
                            HandlerState::Unhandled
                        };
                    }
                }

                HandlerState::HandleCurrent(pending) if setup.is_in_request() => {
                    // GET: present the setting on the outbound stream
                    tx_data = pending.control.read_bytes(&self.settings);
                    tx.data = &tx_data;
                    tx.max_length = pending.control.length();
                    tx.ready = inputs.tx_ready;
                    out.tx = self.transmitter.output(tx.data, tx.max_length);

                    if signals.data_requested {
                        match check_length(&pending.control, setup) {
                            Ok(()) => tx.start = true,
                            Err(err) => {
                                out.stall(err);
                                next.state = HandlerState::Idle;
                            }
                        }
                    }

                    if signals.status_requested {
                        out.handshakes.ack = true;
                        out.outcome = Some(TransferOutcome::Completed);
                        next.state = HandlerState::Idle;
                    }
                }

                HandlerState::HandleCurrent(pending) => {
                    // SET: capture the data stage, then commit
                    rx.max_length = pending.control.length();
                    rx.stream = inputs.rx;

                    if !pending.rx_triggered {
                        match check_length(&pending.control, setup) {
                            Ok(()) => {
                                rx.start = true;
                                next.state = HandlerState::HandleCurrent(PendingTransfer {
                                    rx_triggered: true,
                                    ..pending
                                });
                            }
                            Err(err) => {
                                out.stall(err);
                                next.state = HandlerState::Idle;
                            }
                        }
                    } else if self.receiver.done() {
                        let value = self.receiver.value();
                        if pending.control.write(&mut next.settings, value) {
                            #[cfg(feature = "embedded")]
                            defmt::debug!("uac: commit {}", next.settings);
                        }
                    }

                    if signals.rx_ready_for_response {
                        out.handshakes.ack = true;
                    }
                    if signals.status_requested {
                        out.send_zlp = true;
                    }
                    if signals.inbound_ack {
                        out.outcome = Some(TransferOutcome::Completed);
                        next.state = HandlerState::Idle;
                    }
                }

                HandlerState::Unhandled => {
                    if signals.data_requested || signals.status_requested {
                        out.stall(RequestError::UnsupportedRequest);
                        next.state = HandlerState::Idle;
                    }
                }
            }
        }

        if matches!(next.state, HandlerState::Idle) {
            // Adapters belong to the transfer; an aborted stage must not leak
            next.transmitter = StreamSerializer::new();
            next.receiver = StreamDeserializer::new();
        } else {
            next.transmitter = self.transmitter.advance(&tx);
            next.receiver = self.receiver.advance(&rx);
        }

        (next, out)
    }
}

impl RequestHandler for AudioRequestHandler {
    fn handles(&self, setup: &SetupPacket) -> bool {
        setup.is_class_interface()
    }

    fn tick(&mut self, inputs: &HandlerInputs) -> HandlerOutputs {
        let (next, out) = self.transition(inputs);

        #[cfg(feature = "embedded")]
        if let Some(outcome) = out.outcome {
            match outcome {
                TransferOutcome::Completed => defmt::trace!("uac: {} {}", inputs.setup, outcome),
                TransferOutcome::Stalled(_) => defmt::warn!("uac: {} {}", inputs.setup, outcome),
            }
        }

        *self = next;
        out
    }
}

impl Default for AudioRequestHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler that stalls every request matching its condition
#[derive(Clone, Copy, Debug)]
pub struct StallOnlyHandler {
    condition: fn(&SetupPacket) -> bool,
    pending: bool,
}

impl StallOnlyHandler {
    /// Stall requests for which `condition` holds
    #[must_use]
    pub const fn new(condition: fn(&SetupPacket) -> bool) -> Self {
        Self {
            condition,
            pending: false,
        }
    }

    /// Whether a stall is waiting for the next data/status stage
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }
}

impl RequestHandler for StallOnlyHandler {
    fn handles(&self, setup: &SetupPacket) -> bool {
        (self.condition)(setup)
    }

    fn tick(&mut self, inputs: &HandlerInputs) -> HandlerOutputs {
        let mut out = HandlerOutputs::default();
        let signals = &inputs.signals;

        if self.handles(&inputs.setup) {
            if signals.setup_received {
                self.pending = true;
            } else if self.pending && (signals.data_requested || signals.status_requested) {
                out.stall(RequestError::UnsupportedRequest);
                self.pending = false;
            }
        }

        out
    }
}
