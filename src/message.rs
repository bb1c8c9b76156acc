//! Control-message type discrimination.
//!
//! The dispatcher only ever looks at the leading type nibble of a control
//! message; everything past it is owned by the per-type handlers.

use core::fmt;

/// Type value for a Map-Request.
const TYPE_MAP_REQUEST: u8 = 1;
/// Type value for a Map-Reply.
const TYPE_MAP_REPLY: u8 = 2;
/// Type value for a Map-Register.
const TYPE_MAP_REGISTER: u8 = 3;
/// Type value for a Map-Notify.
const TYPE_MAP_NOTIFY: u8 = 4;
/// Type value for a Map-Referral.
const TYPE_MAP_REFERRAL: u8 = 6;
/// Type value for the NAT traversal Info-Request and Info-Reply.
const TYPE_INFO_NAT: u8 = 7;
/// Type value for an Encapsulated Control Message.
const TYPE_ENCAP_CONTROL: u8 = 8;

/// The kind of a LISP control message, read from the high nibble of its
/// first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    MapRequest,
    MapReply,
    MapRegister,
    MapNotify,
    MapReferral,
    /// Info-Request or Info-Reply; the NAT handler tells them apart.
    InfoNat,
    /// Encapsulated Control Message wrapping a Map-Request.
    EncapControl,
}

impl MessageType {
    /// Read the message type from a raw control message payload.
    ///
    /// Returns `None` for an empty payload or an unrecognized type value,
    /// which the dispatcher logs and drops without treating it as an error.
    pub fn from_payload(payload: &[u8]) -> Option<MessageType> {
        match payload.first()? >> 4 {
            TYPE_MAP_REQUEST => Some(MessageType::MapRequest),
            TYPE_MAP_REPLY => Some(MessageType::MapReply),
            TYPE_MAP_REGISTER => Some(MessageType::MapRegister),
            TYPE_MAP_NOTIFY => Some(MessageType::MapNotify),
            TYPE_MAP_REFERRAL => Some(MessageType::MapReferral),
            TYPE_INFO_NAT => Some(MessageType::InfoNat),
            TYPE_ENCAP_CONTROL => Some(MessageType::EncapControl),
            _ => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MessageType::MapRequest => "Map-Request",
            MessageType::MapReply => "Map-Reply",
            MessageType::MapRegister => "Map-Register",
            MessageType::MapNotify => "Map-Notify",
            MessageType::MapReferral => "Map-Referral",
            MessageType::InfoNat => "Info-Request/Info-Reply",
            MessageType::EncapControl => "Encapsulated-Control-Message",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::MessageType;

    #[test]
    fn type_nibble_decoding() {
        // Only the high nibble counts, the low nibble holds message flags.
        assert_eq!(
            MessageType::from_payload(&[0x1f, 0xff]),
            Some(MessageType::MapRequest)
        );
        assert_eq!(
            MessageType::from_payload(&[0x20]),
            Some(MessageType::MapReply)
        );
        assert_eq!(
            MessageType::from_payload(&[0x30]),
            Some(MessageType::MapRegister)
        );
        assert_eq!(
            MessageType::from_payload(&[0x40]),
            Some(MessageType::MapNotify)
        );
        assert_eq!(
            MessageType::from_payload(&[0x60]),
            Some(MessageType::MapReferral)
        );
        assert_eq!(
            MessageType::from_payload(&[0x70]),
            Some(MessageType::InfoNat)
        );
        assert_eq!(
            MessageType::from_payload(&[0x81]),
            Some(MessageType::EncapControl)
        );
    }

    #[test]
    fn unknown_and_empty_payloads() {
        assert_eq!(MessageType::from_payload(&[]), None);
        assert_eq!(MessageType::from_payload(&[0x00]), None);
        assert_eq!(MessageType::from_payload(&[0x50]), None);
        assert_eq!(MessageType::from_payload(&[0xf0]), None);
    }
}
