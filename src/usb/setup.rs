//! SETUP Packet Model
//!
//! Decoded form of the 8-byte SETUP packet that opens a control transfer.

use core::fmt;

/// Data stage direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Direction {
    /// Host to device (SET)
    #[default]
    Out,
    /// Device to host (GET)
    In,
}

/// Request type field of `bmRequestType`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RequestType {
    /// Standard request
    #[default]
    Standard,
    /// Class specific request
    Class,
    /// Vendor specific request
    Vendor,
    /// Reserved encoding
    Reserved,
}

impl RequestType {
    const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Standard,
            1 => Self::Class,
            2 => Self::Vendor,
            _ => Self::Reserved,
        }
    }
}

/// Recipient field of `bmRequestType`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Recipient {
    /// Device
    #[default]
    Device,
    /// Interface (or entity within an interface)
    Interface,
    /// Endpoint
    Endpoint,
    /// Other
    Other,
    /// Reserved encoding
    Reserved,
}

impl Recipient {
    const fn from_bits(bits: u8) -> Self {
        match bits & 0b1_1111 {
            0 => Self::Device,
            1 => Self::Interface,
            2 => Self::Endpoint,
            3 => Self::Other,
            _ => Self::Reserved,
        }
    }
}

/// A SETUP transaction as handed over by the transaction layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SetupPacket {
    /// Data stage direction
    pub direction: Direction,
    /// Request type
    pub request_type: RequestType,
    /// Request recipient
    pub recipient: Recipient,
    /// `bRequest`
    pub request: u8,
    /// `wValue`
    pub value: u16,
    /// `wIndex`
    pub index: u16,
    /// `wLength`, bytes expected in the data stage
    pub length: u16,
}

impl SetupPacket {
    /// Decode the raw SETUP bytes (fields little endian)
    #[must_use]
    pub const fn parse(raw: &[u8; 8]) -> Self {
        let bm_request_type = raw[0];
        Self {
            direction: if bm_request_type & 0x80 != 0 {
                Direction::In
            } else {
                Direction::Out
            },
            request_type: RequestType::from_bits(bm_request_type >> 5),
            recipient: Recipient::from_bits(bm_request_type),
            request: raw[1],
            value: u16::from_le_bytes([raw[2], raw[3]]),
            index: u16::from_le_bytes([raw[4], raw[5]]),
            length: u16::from_le_bytes([raw[6], raw[7]]),
        }
    }

    /// Build a class request addressed to an interface
    #[must_use]
    pub const fn class_interface(
        direction: Direction,
        request: u8,
        value: u16,
        index: u16,
        length: u16,
    ) -> Self {
        Self {
            direction,
            request_type: RequestType::Class,
            recipient: Recipient::Interface,
            request,
            value,
            index,
            length,
        }
    }

    /// Whether the data stage flows to the host
    #[must_use]
    pub const fn is_in_request(&self) -> bool {
        matches!(self.direction, Direction::In)
    }

    /// Whether this is a class request addressed to an interface
    #[must_use]
    pub const fn is_class_interface(&self) -> bool {
        matches!(self.request_type, RequestType::Class)
            && matches!(self.recipient, Recipient::Interface)
    }

    /// Low byte of `wValue`
    #[must_use]
    pub const fn value_low(&self) -> u8 {
        self.value.to_le_bytes()[0]
    }

    /// High byte of `wValue` (the control selector for audio class requests)
    #[must_use]
    pub const fn value_high(&self) -> u8 {
        self.value.to_le_bytes()[1]
    }

    /// Low byte of `wIndex`
    #[must_use]
    pub const fn index_low(&self) -> u8 {
        self.index.to_le_bytes()[0]
    }

    /// High byte of `wIndex`
    #[must_use]
    pub const fn index_high(&self) -> u8 {
        self.index.to_le_bytes()[1]
    }

    /// Encode back to the raw SETUP bytes
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; 8] {
        let direction = match self.direction {
            Direction::Out => 0,
            Direction::In => 0x80,
        };
        let request_type = match self.request_type {
            RequestType::Standard => 0,
            RequestType::Class => 1,
            RequestType::Vendor => 2,
            RequestType::Reserved => 3,
        };
        let recipient = match self.recipient {
            Recipient::Device => 0,
            Recipient::Interface => 1,
            Recipient::Endpoint => 2,
            Recipient::Other => 3,
            Recipient::Reserved => 0x1F,
        };
        let value = self.value.to_le_bytes();
        let index = self.index.to_le_bytes();
        let length = self.length.to_le_bytes();
        [
            direction | request_type << 5 | recipient,
            self.request,
            value[0],
            value[1],
            index[0],
            index[1],
            length[0],
            length[1],
        ]
    }
}

impl fmt::Display for SetupPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {:?}/{:?} req={:#04x} value={:#06x} index={:#06x} len={}",
            self.direction,
            self.request_type,
            self.recipient,
            self.request,
            self.value,
            self.index,
            self.length
        )
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for SetupPacket {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Setup(in={} req={=u8:#x} value={=u16:#x} index={=u16:#x} len={})",
            self.is_in_request(),
            self.request,
            self.value,
            self.index,
            self.length
        );
    }
}

#[cfg(feature = "embedded")]
impl From<embassy_usb::control::Request> for SetupPacket {
    fn from(req: embassy_usb::control::Request) -> Self {
        use embassy_usb::control::{Recipient as UsbRecipient, RequestType as UsbRequestType};
        use embassy_usb::driver::Direction as UsbDirection;

        Self {
            direction: match req.direction {
                UsbDirection::In => Direction::In,
                UsbDirection::Out => Direction::Out,
            },
            request_type: match req.request_type {
                UsbRequestType::Standard => RequestType::Standard,
                UsbRequestType::Class => RequestType::Class,
                UsbRequestType::Vendor => RequestType::Vendor,
                UsbRequestType::Reserved => RequestType::Reserved,
            },
            recipient: match req.recipient {
                UsbRecipient::Device => Recipient::Device,
                UsbRecipient::Interface => Recipient::Interface,
                UsbRecipient::Endpoint => Recipient::Endpoint,
                UsbRecipient::Other => Recipient::Other,
                UsbRecipient::Reserved => Recipient::Reserved,
            },
            request: req.request,
            value: req.value,
            index: req.index,
            length: req.length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_class_interface_get() {
        // GET CUR, power domain selector, entity 11
        let setup = SetupPacket::parse(&[0xA1, 0x01, 0x00, 0x02, 0x00, 0x0B, 0x01, 0x00]);
        assert!(setup.is_in_request());
        assert!(setup.is_class_interface());
        assert_eq!(setup.request, 0x01);
        assert_eq!(setup.value_high(), 0x02);
        assert_eq!(setup.index_high(), 11);
        assert_eq!(setup.length, 1);
    }

    #[test]
    fn parse_standard_device() {
        let setup = SetupPacket::parse(&[0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x12, 0x00]);
        assert_eq!(setup.request_type, RequestType::Standard);
        assert_eq!(setup.recipient, Recipient::Device);
        assert!(!setup.is_class_interface());
    }
}
