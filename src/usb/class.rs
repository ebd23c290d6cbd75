//! embassy-usb Audio Control Bridge
//!
//! Answers class specific `CUR` requests arriving through the embassy-usb
//! control pipe, using the same registry and classification as the
//! tick-level handler. Committed settings are published on a signal for the
//! audio tasks.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_usb::control::{InResponse, OutResponse, Request};
use embassy_usb::Handler;

use crate::config::CONTROL_PAYLOAD_BYTES;
use crate::usb::controls::{ControlRegistry, DeviceSettings};
use crate::usb::request::{classify, RequestError};
use crate::usb::setup::SetupPacket;

/// Settings signal shared between the USB and audio tasks
pub type SettingsSignal = Signal<CriticalSectionRawMutex, DeviceSettings>;

/// Latest committed settings, consumed by the audio bus task
pub static SETTINGS: SettingsSignal = Signal::new();

/// Audio control interface handler registered with the USB builder
pub struct AudioControlHandler<'a> {
    registry: ControlRegistry,
    settings: DeviceSettings,
    published: &'a SettingsSignal,
}

impl<'a> AudioControlHandler<'a> {
    /// Create a handler exposing the default controls
    #[must_use]
    pub fn new(published: &'a SettingsSignal) -> Self {
        Self {
            registry: ControlRegistry::default(),
            settings: DeviceSettings::default(),
            published,
        }
    }

    fn reject(setup: &SetupPacket, err: RequestError) {
        defmt::warn!("uac: stall {}: {}", setup, err);
    }
}

impl Handler for AudioControlHandler<'_> {
    fn reset(&mut self) {
        self.settings = DeviceSettings::default();
        self.published.signal(self.settings);
        defmt::debug!("uac: reset");
    }

    fn control_out(&mut self, req: Request, data: &[u8]) -> Option<OutResponse> {
        let setup = SetupPacket::from(req);
        if !setup.is_class_interface() {
            return None;
        }

        let control = match classify(&self.registry, &setup) {
            Ok(control) => control,
            Err(err) => {
                Self::reject(&setup, err);
                return Some(OutResponse::Rejected);
            }
        };

        let length = usize::from(control.length());
        if data.len() != length {
            Self::reject(
                &setup,
                RequestError::LengthMismatch {
                    expected: control.length(),
                    requested: u16::try_from(data.len()).unwrap_or(u16::MAX),
                },
            );
            return Some(OutResponse::Rejected);
        }

        let mut bytes = [0u8; CONTROL_PAYLOAD_BYTES];
        let Some(dst) = bytes.get_mut(..length) else {
            return Some(OutResponse::Rejected);
        };
        dst.copy_from_slice(data);
        if control.write(&mut self.settings, u16::from_le_bytes(bytes)) {
            defmt::info!("uac: commit {}", self.settings);
            self.published.signal(self.settings);
        }

        Some(OutResponse::Accepted)
    }

    fn control_in<'b>(&'b mut self, req: Request, buf: &'b mut [u8]) -> Option<InResponse<'b>> {
        let setup = SetupPacket::from(req);
        if !setup.is_class_interface() {
            return None;
        }

        let control = match classify(&self.registry, &setup) {
            Ok(control) => control,
            Err(err) => {
                Self::reject(&setup, err);
                return Some(InResponse::Rejected);
            }
        };

        let value = control.read_bytes(&self.settings);
        let length = usize::from(control.length());
        let (Some(src), Some(out)) = (value.get(..length), buf.get_mut(..length)) else {
            return Some(InResponse::Rejected);
        };
        out.copy_from_slice(src);

        Some(InResponse::Accepted(out))
    }
}
