//! Audio Control Registry
//!
//! Declarative table of the controls reachable through class specific
//! requests. Each entry matches the addressing bytes of `wIndex`/`wValue`
//! and names the setting's length, getter and setter. Adding a control is
//! a table addition.

use crate::config::{selectors, AUDIO_CONTROL_INTERFACE, CONTROL_PAYLOAD_BYTES};
use crate::types::PowerDomainState;
use crate::usb::setup::SetupPacket;

/// Settings persisted across control transfers (cleared on device reset)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceSettings {
    /// Raw power domain control byte
    pub power_domain: u8,
}

impl DeviceSettings {
    /// Power domain state, if the stored byte is a defined state
    #[must_use]
    pub const fn power_state(&self) -> Option<PowerDomainState> {
        PowerDomainState::from_raw(self.power_domain)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for DeviceSettings {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Settings(power_domain={=u8:#x})", self.power_domain);
    }
}

/// Addressing bytes of a control
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlAddress {
    /// High byte of `wIndex`
    pub interface: u8,
    /// Low byte of `wIndex`
    pub index_low: u8,
    /// High byte of `wValue`
    pub selector: u8,
    /// Low byte of `wValue`
    pub value_low: u8,
}

impl ControlAddress {
    /// Address carried by a SETUP packet
    #[must_use]
    pub const fn of(setup: &SetupPacket) -> Self {
        Self {
            interface: setup.index_high(),
            index_low: setup.index_low(),
            selector: setup.value_high(),
            value_low: setup.value_low(),
        }
    }

    /// `wIndex` addressing this control
    #[must_use]
    pub const fn index(&self) -> u16 {
        u16::from_le_bytes([self.index_low, self.interface])
    }

    /// `wValue` addressing this control
    #[must_use]
    pub const fn value(&self) -> u16 {
        u16::from_le_bytes([self.value_low, self.selector])
    }
}

/// A control reachable through `CUR` requests
#[derive(Clone, Copy, Debug)]
pub struct ControlEntry {
    /// Addressing bytes
    pub address: ControlAddress,
    /// Setting length in bytes (at most [`CONTROL_PAYLOAD_BYTES`])
    pub length: u8,
    /// Read the current value
    pub get: fn(&DeviceSettings) -> u16,
    /// Commit a received value
    pub set: fn(&mut DeviceSettings, u16),
}

fn get_power_domain(settings: &DeviceSettings) -> u16 {
    u16::from(settings.power_domain)
}

fn set_power_domain(settings: &mut DeviceSettings, value: u16) {
    settings.power_domain = value.to_le_bytes()[0];
}

/// Address of the power domain control
pub const POWER_DOMAIN_ADDRESS: ControlAddress = ControlAddress {
    interface: AUDIO_CONTROL_INTERFACE,
    index_low: 0,
    selector: selectors::AC_POWER_DOMAIN_CONTROL,
    value_low: 0,
};

/// Power domain control: one byte, read and written as-is
pub const POWER_DOMAIN_CONTROL: ControlEntry = ControlEntry {
    address: POWER_DOMAIN_ADDRESS,
    length: 1,
    get: get_power_domain,
    set: set_power_domain,
};

/// Controls exposed by the device
pub static DEFAULT_CONTROLS: [ControlEntry; 1] = [POWER_DOMAIN_CONTROL];

/// Resolved target of a `CUR` request
#[derive(Clone, Copy, Debug)]
pub struct ResolvedControl {
    entry: Option<&'static ControlEntry>,
}

impl ResolvedControl {
    /// Resolution for an address with no entry
    pub const UNKNOWN: Self = Self { entry: None };

    /// Whether the address matched an entry
    #[must_use]
    pub const fn is_known(&self) -> bool {
        self.entry.is_some()
    }

    /// Length of the setting; unknown controls have length 0
    #[must_use]
    pub const fn length(&self) -> u8 {
        match self.entry {
            Some(entry) => entry.length,
            None => 0,
        }
    }

    /// Current value; unknown controls read 0
    #[must_use]
    pub fn read(&self, settings: &DeviceSettings) -> u16 {
        self.entry.map_or(0, |entry| (entry.get)(settings))
    }

    /// Value as the bytes handed to the serializer
    #[must_use]
    pub fn read_bytes(&self, settings: &DeviceSettings) -> [u8; CONTROL_PAYLOAD_BYTES] {
        self.read(settings).to_le_bytes()
    }

    /// Commit a value; unknown controls discard it
    ///
    /// Returns whether a setting was written.
    pub fn write(&self, settings: &mut DeviceSettings, value: u16) -> bool {
        match self.entry {
            Some(entry) => {
                (entry.set)(settings, value);
                true
            }
            None => false,
        }
    }
}

/// Lookup table from addressing bytes to controls
#[derive(Clone, Copy, Debug)]
pub struct ControlRegistry {
    entries: &'static [ControlEntry],
}

impl ControlRegistry {
    /// Registry over `entries`
    #[must_use]
    pub const fn new(entries: &'static [ControlEntry]) -> Self {
        Self { entries }
    }

    /// Registered entries
    #[must_use]
    pub const fn entries(&self) -> &'static [ControlEntry] {
        self.entries
    }

    /// Resolve the control a SETUP packet addresses
    #[must_use]
    pub fn resolve(&self, setup: &SetupPacket) -> ResolvedControl {
        let address = ControlAddress::of(setup);
        ResolvedControl {
            entry: self.entries.iter().find(|entry| entry.address == address),
        }
    }
}

impl Default for ControlRegistry {
    fn default() -> Self {
        Self::new(&DEFAULT_CONTROLS)
    }
}
