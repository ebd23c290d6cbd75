//! USB Subsystem
//!
//! Control plane of the audio interface:
//! - SETUP packet model
//! - Payload stream adapters for the data stage
//! - Declarative registry of audio controls
//! - Class request handler state machine
//! - embassy-usb bridge (embedded only)

pub mod controls;
pub mod request;
pub mod setup;
pub mod stream;

#[cfg(feature = "embedded")]
pub mod class;
