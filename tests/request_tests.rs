//! Request Handler Tests
//!
//! Control transfers played against the audio class request handler by the
//! host harness.
//! Run with: cargo test --no-default-features --features std --test request_tests

mod common;

use audio_interface::config::requests::{CUR, RANGE};
use audio_interface::config::selectors::{AC_ACTIVE_INTERFACE_CONTROL, AC_POWER_DOMAIN_CONTROL};
use audio_interface::config::AUDIO_CONTROL_INTERFACE;
use audio_interface::types::PowerDomainState;
use audio_interface::usb::controls::{
    ControlAddress, ControlEntry, ControlRegistry, DeviceSettings, POWER_DOMAIN_ADDRESS,
    POWER_DOMAIN_CONTROL,
};
use audio_interface::usb::request::{
    AudioRequestHandler, HandlerInputs, RequestError, RequestHandler, RequestState,
    StallOnlyHandler, TransactionSignals, TransferOutcome,
};
use audio_interface::usb::setup::{Direction, SetupPacket};
use audio_interface::usb::stream::OutStreamWord;
use common::{setup_received, ControlHost};

fn power_domain(direction: Direction, length: u16) -> SetupPacket {
    SetupPacket::class_interface(
        direction,
        CUR,
        POWER_DOMAIN_ADDRESS.value(),
        POWER_DOMAIN_ADDRESS.index(),
        length,
    )
}

fn other_selector(direction: Direction, length: u16) -> SetupPacket {
    SetupPacket::class_interface(
        direction,
        CUR,
        u16::from_le_bytes([0, AC_ACTIVE_INTERFACE_CONTROL]),
        POWER_DOMAIN_ADDRESS.index(),
        length,
    )
}

fn host() -> ControlHost<AudioRequestHandler> {
    ControlHost::new(AudioRequestHandler::new())
}

// =============================================================================
// Power domain scenarios
// =============================================================================

#[test]
fn test_set_power_domain_commits_and_acks() {
    let mut host = host();
    let report = host.set(power_domain(Direction::Out, 1), &[0x01]);

    assert!(report.acked);
    assert!(report.zlp);
    assert!(!report.stalled);
    assert_eq!(report.outcomes, vec![TransferOutcome::Completed]);
    assert_eq!(host.handler.state(), RequestState::Idle);
    assert_eq!(host.handler.power_domain(), 0x01);
    assert_eq!(
        host.handler.settings().power_state(),
        Some(PowerDomainState::D1)
    );
}

#[test]
fn test_get_after_set_returns_value() {
    let mut host = host();
    host.set(power_domain(Direction::Out, 1), &[0x01]);
    let report = host.get(power_domain(Direction::In, 1));

    assert_eq!(report.data(), vec![0x01]);
    assert!(report.words[0].first && report.words[0].last);
    assert!(report.acked);
    assert!(!report.stalled);
    assert_eq!(host.handler.state(), RequestState::Idle);
}

#[test]
fn test_get_is_idempotent() {
    let mut host = host();
    host.set(power_domain(Direction::Out, 1), &[0x02]);

    let first = host.get(power_domain(Direction::In, 1));
    let second = host.get(power_domain(Direction::In, 1));
    assert_eq!(first.data(), vec![0x02]);
    assert_eq!(first.data(), second.data());
    assert_eq!(host.handler.power_domain(), 0x02);
}

#[test]
fn test_round_trip_every_byte_value() {
    let mut host = host();
    for value in [0x00, 0x01, 0x02, 0x7F, 0x80, 0xFF] {
        host.set(power_domain(Direction::Out, 1), &[value]);
        assert_eq!(host.get(power_domain(Direction::In, 1)).data(), vec![value]);
    }
}

#[test]
fn test_get_default_is_zero() {
    let mut host = host();
    assert_eq!(host.get(power_domain(Direction::In, 1)).data(), vec![0x00]);
}

// =============================================================================
// Length boundaries
// =============================================================================

#[test]
fn test_power_domain_wrong_length_stalls_without_mutation() {
    for length in [0, 2, 3, 64, 0xFFFF] {
        let mut host = host();
        host.set(power_domain(Direction::Out, 1), &[0x01]);

        let set = host.set(power_domain(Direction::Out, length), &[0x02, 0x02]);
        assert!(set.stalled, "SET length {length}");
        assert!(!set.acked, "SET length {length}");
        assert_eq!(
            set.outcomes,
            vec![TransferOutcome::Stalled(RequestError::LengthMismatch {
                expected: 1,
                requested: length
            })]
        );

        let get = host.get(power_domain(Direction::In, length));
        assert!(get.stalled, "GET length {length}");
        assert!(get.words.is_empty(), "GET length {length}");

        assert_eq!(host.handler.power_domain(), 0x01, "length {length}");
        assert_eq!(host.handler.state(), RequestState::Idle);
    }
}

#[test]
fn test_other_selector_zero_length_completes() {
    let mut host = host();
    host.set(power_domain(Direction::Out, 1), &[0x02]);

    let set = host.set(other_selector(Direction::Out, 0), &[]);
    assert!(set.acked && set.zlp && !set.stalled);

    let get = host.get(other_selector(Direction::In, 0));
    assert!(get.acked && !get.stalled);
    assert!(get.words.is_empty());

    assert_eq!(host.handler.power_domain(), 0x02);
}

#[test]
fn test_other_selector_nonzero_length_stalls() {
    for length in [1, 2, 8] {
        let mut host = host();
        let set = host.set(other_selector(Direction::Out, length), &[0x01]);
        assert!(set.stalled, "SET length {length}");
        assert_eq!(
            set.outcomes,
            vec![TransferOutcome::Stalled(RequestError::UnknownSelector)]
        );

        let get = host.get(other_selector(Direction::In, length));
        assert!(get.stalled, "GET length {length}");
        assert_eq!(host.handler.power_domain(), 0);
    }
}

#[test]
fn test_wrong_interface_is_unknown() {
    let mut host = host();
    let setup = SetupPacket::class_interface(
        Direction::Out,
        CUR,
        POWER_DOMAIN_ADDRESS.value(),
        u16::from_le_bytes([0, AUDIO_CONTROL_INTERFACE + 1]),
        1,
    );
    assert!(host.set(setup, &[0x01]).stalled);
    assert_eq!(host.handler.power_domain(), 0);
}

// =============================================================================
// Unhandled requests
// =============================================================================

#[test]
fn test_non_cur_request_stalls_at_data_stage() {
    let mut host = host();
    let mut setup = power_domain(Direction::In, 1);
    setup.request = RANGE;

    host.setup(setup);
    assert_eq!(host.handler.state(), RequestState::Unhandled);

    // Nothing happens until the host opens a stage
    host.idle(setup, 5);
    assert_eq!(host.handler.state(), RequestState::Unhandled);

    let out = host.pulse(
        setup,
        TransactionSignals {
            data_requested: true,
            ..Default::default()
        },
    );
    assert!(out.handshakes.stall);
    assert_eq!(
        out.outcome,
        Some(TransferOutcome::Stalled(RequestError::UnsupportedRequest))
    );
    assert_eq!(host.handler.state(), RequestState::Idle);
}

#[test]
fn test_non_cur_request_stalls_at_status_stage() {
    let mut host = host();
    host.set(power_domain(Direction::Out, 1), &[0x02]);

    let mut setup = power_domain(Direction::Out, 1);
    setup.request = RANGE;
    let report = host.set(setup, &[0x01]);

    assert!(report.stalled);
    assert!(!report.acked);
    assert_eq!(host.handler.state(), RequestState::Idle);
    assert_eq!(host.handler.power_domain(), 0x02);
}

#[test]
fn test_non_class_requests_are_ignored() {
    let mut host = host();
    // GET_DESCRIPTOR (device)
    let setup = SetupPacket::parse(&[0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x12, 0x00]);

    let report = host.get(setup);
    assert!(!report.stalled && !report.acked);
    assert!(report.words.is_empty());
    assert!(report.outcomes.is_empty());
    assert_eq!(host.handler.state(), RequestState::Idle);
}

// =============================================================================
// Sequencing
// =============================================================================

#[test]
fn test_setup_while_busy_is_ignored() {
    let mut host = host();
    host.setup(power_domain(Direction::In, 1));
    assert_eq!(host.handler.state(), RequestState::HandleCurrent);

    let mut other = power_domain(Direction::In, 1);
    other.request = RANGE;
    host.setup(other);
    assert_eq!(host.handler.state(), RequestState::HandleCurrent);
}

#[test]
fn test_commit_waits_for_complete_data_stage() {
    let mut host = host();
    let setup = power_domain(Direction::Out, 1);

    host.setup(setup);
    host.idle(setup, 4);
    assert_eq!(host.handler.power_domain(), 0);

    // Status stage without data never commits
    host.pulse(
        setup,
        TransactionSignals {
            status_requested: true,
            ..Default::default()
        },
    );
    host.pulse(
        setup,
        TransactionSignals {
            inbound_ack: true,
            ..Default::default()
        },
    );
    assert_eq!(host.handler.state(), RequestState::Idle);
    assert_eq!(host.handler.power_domain(), 0);
}

#[test]
fn test_transition_is_pure() {
    let handler = AudioRequestHandler::new();
    let inputs = HandlerInputs {
        setup: power_domain(Direction::In, 1),
        signals: setup_received(),
        ..Default::default()
    };

    let (next, _) = handler.transition(&inputs);
    assert_eq!(handler.state(), RequestState::Idle);
    assert_eq!(next.state(), RequestState::HandleCurrent);
}

#[test]
fn test_reset_clears_settings() {
    let mut host = host();
    host.set(power_domain(Direction::Out, 1), &[0x02]);
    host.setup(power_domain(Direction::In, 1));

    host.handler.reset();
    assert_eq!(host.handler.state(), RequestState::Idle);
    assert_eq!(*host.handler.settings(), DeviceSettings::default());
}

// =============================================================================
// Registry extension
// =============================================================================

const WIDE_ADDRESS: ControlAddress = ControlAddress {
    interface: AUDIO_CONTROL_INTERFACE,
    index_low: 0,
    selector: 0x10,
    value_low: 0,
};

static WIDE_CONTROLS: [ControlEntry; 2] = [
    POWER_DOMAIN_CONTROL,
    ControlEntry {
        address: WIDE_ADDRESS,
        length: 2,
        get: |settings| u16::from_le_bytes([settings.power_domain, 0xAB]),
        set: |settings, value| settings.power_domain = value.to_le_bytes()[0],
    },
];

fn wide(direction: Direction) -> SetupPacket {
    SetupPacket::class_interface(direction, CUR, WIDE_ADDRESS.value(), WIDE_ADDRESS.index(), 2)
}

#[test]
fn test_two_byte_control_streams_both_bytes() {
    let mut host = ControlHost::new(AudioRequestHandler::with_registry(ControlRegistry::new(
        &WIDE_CONTROLS,
    )));
    host.set(power_domain(Direction::Out, 1), &[0x01]);

    let report = host.get(wide(Direction::In));
    assert_eq!(report.data(), vec![0x01, 0xAB]);
    assert!(report.words[0].first && !report.words[0].last);
    assert!(!report.words[1].first && report.words[1].last);
}

#[test]
fn test_two_byte_control_commits_little_endian() {
    let mut host = ControlHost::new(AudioRequestHandler::with_registry(ControlRegistry::new(
        &WIDE_CONTROLS,
    )));

    let report = host.set(wide(Direction::Out), &[0x02, 0x99]);
    assert!(report.acked && !report.stalled);
    assert_eq!(host.handler.power_domain(), 0x02);
    assert_eq!(
        host.get(power_domain(Direction::In, 1)).data(),
        vec![PowerDomainState::D2.raw()]
    );
}

// =============================================================================
// Stall-only handler
// =============================================================================

#[test]
fn test_stall_only_handler_matches_condition() {
    let mut host = ControlHost::new(StallOnlyHandler::new(|setup| {
        setup.is_class_interface() && setup.value_high() == AC_POWER_DOMAIN_CONTROL
    }));

    let report = host.get(power_domain(Direction::In, 1));
    assert!(report.stalled);
    assert!(!host.handler.is_pending());

    let report = host.get(other_selector(Direction::In, 1));
    assert!(!report.stalled);
    assert!(!host.handler.handles(&other_selector(Direction::In, 1)));
}

// =============================================================================
// Aborted transfers
// =============================================================================

fn status_stage() -> TransactionSignals {
    TransactionSignals {
        status_requested: true,
        ..Default::default()
    }
}

fn data_stage() -> TransactionSignals {
    TransactionSignals {
        data_requested: true,
        ..Default::default()
    }
}

fn wide_host() -> ControlHost<AudioRequestHandler> {
    ControlHost::new(AudioRequestHandler::with_registry(ControlRegistry::new(
        &WIDE_CONTROLS,
    )))
}

#[test]
fn test_get_abandoned_before_first_byte_leaves_no_data() {
    let mut host = host();
    let setup = power_domain(Direction::In, 1);

    // Data stage starts but the host never takes the byte
    host.setup(setup);
    host.pulse(setup, data_stage());
    host.pulse(setup, status_stage());
    assert_eq!(host.handler.state(), RequestState::Idle);

    let report = host.get(other_selector(Direction::In, 0));
    assert!(report.words.is_empty());
    assert!(report.acked && !report.stalled);
}

#[test]
fn test_get_abandoned_mid_stream_restarts_next_get() {
    let mut host = wide_host();
    host.set(power_domain(Direction::Out, 1), &[0x07]);

    let setup = wide(Direction::In);
    host.setup(setup);
    host.pulse(setup, data_stage());
    let first = host.tick(setup, TransactionSignals::default(), OutStreamWord::IDLE, true);
    assert_eq!(first.tx.payload, 0x07);
    host.pulse(setup, status_stage());

    let report = host.get(power_domain(Direction::In, 1));
    assert_eq!(report.data(), vec![0x07]);
    assert!(report.words[0].first && report.words[0].last);
}

#[test]
fn test_set_abandoned_mid_stream_is_not_committed() {
    let mut host = wide_host();
    let setup = wide(Direction::Out);

    // Only the first of two bytes arrives before the host moves on
    host.setup(setup);
    host.idle(setup, 1);
    host.tick(
        setup,
        TransactionSignals::default(),
        OutStreamWord::byte(0x33, false),
        false,
    );
    host.pulse(setup, status_stage());
    host.pulse(
        setup,
        TransactionSignals {
            inbound_ack: true,
            ..Default::default()
        },
    );
    assert_eq!(host.handler.state(), RequestState::Idle);
    assert_eq!(host.handler.power_domain(), 0);

    let report = host.set(power_domain(Direction::Out, 1), &[0x05]);
    assert!(report.acked && !report.stalled);
    assert_eq!(host.handler.power_domain(), 0x05);
}

#[test]
fn test_stalled_transfer_leaves_adapters_idle() {
    let mut host = host();
    let setup = power_domain(Direction::In, 2);

    host.setup(setup);
    assert!(host.pulse(setup, data_stage()).handshakes.stall);

    host.set(power_domain(Direction::Out, 1), &[0x02]);
    assert_eq!(host.get(power_domain(Direction::In, 1)).data(), vec![0x02]);
}
