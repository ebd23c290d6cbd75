//! Audio Interface Firmware Library
//!
//! Core logic of an STM32G474-based USB audio interface. The device exposes
//! audio class controls (the power domain) to the host through class
//! specific `CUR` requests and streams stereo samples onto an I2S bus. An
//! S/PDIF block interface prepares payload words for a biphase-mark encoder.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      FIRMWARE (main.rs)                      │
//! │  USB device task  │  I2S bus task  │  Heartbeat              │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      CONTROL PLANE (usb)                     │
//! │  SETUP model │ Stream adapters │ Control registry │ Handler  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                       AUDIO PLANE (audio)                    │
//! │  I2S transmitter  │  S/PDIF block interface                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    HAL / RTOS (embedded only)                │
//! │  embedded-hal pins  │  embassy-usb  │  embassy executor      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Tick-level state machines**: Each block is a snapshot plus a pure
//!   transition; outputs depend on the snapshot and same-tick inputs only
//! - **Immutable-by-default**: Transitions return new snapshots
//! - **Declarative controls**: Audio controls are registry entries
//! - **Functional core, imperative shell**: Pure logic separated from I/O
//! - **No allocation**: Bounded buffers via `heapless`

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_stm32;
#[cfg(feature = "embedded")]
pub use embassy_time;
#[cfg(feature = "embedded")]
pub use embassy_usb;

/// Hardware Abstraction Layer
///
/// Binds bus models to `embedded-hal` pins.
#[cfg(feature = "embedded")]
pub mod hal;

/// Audio Output
///
/// I2S transmitter and S/PDIF block interface.
pub mod audio;

/// USB Subsystem
///
/// SETUP model, control registry and class request handling.
pub mod usb;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::types::*;

    pub use crate::audio::i2s::{BusLines, I2sTransmitter, SampleRegisters};
    pub use crate::usb::controls::{ControlRegistry, DeviceSettings};
    pub use crate::usb::request::{AudioRequestHandler, RequestHandler};
    pub use crate::usb::setup::SetupPacket;

    // Common traits
    #[cfg(feature = "embedded")]
    pub use embedded_hal::digital::OutputPin;

    // Embassy
    #[cfg(feature = "embedded")]
    pub use embassy_time::{Duration, Instant, Ticker, Timer};

    // Logging
    #[cfg(feature = "embedded")]
    pub use defmt::{debug, error, info, trace, warn};
}
